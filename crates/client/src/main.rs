//! `username-search`: terminal front-end for the username search API.
//!
//! ```bash
//! username-search search octocat --found --sort response-time
//! username-search search octocat --csv > octocat.csv
//! username-search web octocat
//! username-search ask "Which of these accounts look active?"
//! username-search health
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use futures_util::StreamExt;
use std::io::Write;
use std::process::ExitCode;

use client::api::DEFAULT_BASE_URL;
use client::session::run_search;
use client::{ApiClient, ClientError};
use shared_types::{
    apply_view, export_csv, group_by_category, result_stats, unique_categories, ChatMessage,
    FilterOptions, SearchPhase, SearchResult, SearchState, SortBy, SortOptions, SortOrder,
    StatusFilter,
};

#[derive(Parser)]
#[command(name = "username-search", version, about = "Find where a username is registered")]
struct Cli {
    /// Base URL of the API server.
    #[arg(long, global = true, env = "USERNAME_SEARCH_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check which platforms have an account with this username.
    Search {
        username: String,

        /// Only show platforms where the account exists.
        #[arg(long)]
        found: bool,

        /// Only show one category (exact match).
        #[arg(long)]
        category: Option<String>,

        /// Case-insensitive substring of the platform name.
        #[arg(long)]
        query: Option<String>,

        #[arg(long, value_enum, default_value_t = SortArg::Default)]
        sort: SortArg,

        /// Reverse the sort.
        #[arg(long)]
        desc: bool,

        /// Include NSFW platforms.
        #[arg(long)]
        nsfw: bool,

        /// Print CSV instead of a table.
        #[arg(long)]
        csv: bool,

        /// Group the table by category.
        #[arg(long, conflicts_with = "csv")]
        group: bool,
    },

    /// Search the web for pages mentioning the username.
    Web { username: String },

    /// Ask the assistant a question.
    Ask { question: String },

    /// Show server health.
    Health,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Default,
    ResponseTime,
    Alphabetical,
}

impl From<SortArg> for SortBy {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Default => SortBy::Default,
            SortArg::ResponseTime => SortBy::ResponseTime,
            SortArg::Alphabetical => SortBy::Alphabetical,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, ClientError> {
    let client = ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Search {
            username,
            found,
            category,
            query,
            sort,
            desc,
            nsfw,
            csv,
            group,
        } => {
            let state = run_search(&client, &username, print_progress).await?;
            eprintln!();

            let filter = FilterOptions {
                status: if found {
                    StatusFilter::Found
                } else {
                    StatusFilter::All
                },
                category,
                show_nsfw: nsfw,
                search_query: query.unwrap_or_default(),
            };
            let sort = SortOptions {
                sort_by: sort.into(),
                order: if desc { SortOrder::Desc } else { SortOrder::Asc },
            };
            let view = apply_view(&state.results, &filter, &sort);

            if csv {
                print!("{}", export_csv(&view));
            } else if group {
                for (name, results) in group_by_category(&view) {
                    println!("== {name} ({}) ==", results.len());
                    print_table(&results);
                }
            } else {
                print_table(&view);
            }
            print_summary(&state, &view, filter.category.as_deref());

            Ok(if state.phase == SearchPhase::Failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Web { username } => {
            let response = client.web_search(&username).await?;
            if let Some(total) = response.search_information.formatted_total_results.as_deref() {
                println!("About {total} results for {}", response.query);
            }
            for item in &response.items {
                println!("{}\n  {}\n  {}\n", item.title, item.link, item.snippet);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Ask { question } => {
            let mut deltas = Box::pin(client.chat(vec![ChatMessage::user(question)]).await?);
            let mut stdout = std::io::stdout();
            while let Some(delta) = deltas.next().await {
                let _ = write!(stdout, "{}", delta?);
                let _ = stdout.flush();
            }
            println!();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Health => {
            let report = client.health().await?;
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(_) => println!("{report:?}"),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_progress(state: &SearchState) {
    match (state.progress_percent(), state.total) {
        (Some(pct), Some(total)) => eprint!("\rChecked {}/{total} ({pct}%)", state.checked()),
        _ => eprint!("\rChecked {}", state.checked()),
    }
}

fn print_table(results: &[SearchResult]) {
    let width = results.iter().map(|r| r.source.len()).max().unwrap_or(0);
    for r in results {
        let mark = if r.is_found() { "+" } else { "-" };
        println!(
            "{mark} {:<width$}  {:>6}ms  {}",
            r.source,
            r.response_time(),
            r.url
        );
    }
}

fn print_summary(state: &SearchState, view: &[SearchResult], category: Option<&str>) {
    let stats = result_stats(&state.results);
    println!(
        "\n{} found, {} not found, {} NSFW of {} checked (avg {:.0}ms); showing {}",
        stats.found,
        stats.not_found,
        stats.nsfw,
        stats.total,
        stats.avg_response_time,
        view.len()
    );

    if let Some(category) = category {
        let known = unique_categories(&state.results);
        if !known.iter().any(|c| c == category) {
            println!("No category \"{category}\". Known: {}", known.join(", "));
        }
    }
    if let Some(error) = &state.error {
        println!("Search stopped early: {error}");
    }
}
