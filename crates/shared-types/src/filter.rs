//! Filtering, sorting, and statistics over a search run's results.
//!
//! Everything here is pure: inputs are borrowed, never mutated, and the
//! output is a fresh collection.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::result::SearchResult;

/// Bucket name for results without a category.
pub const OTHER_CATEGORY: &str = "Other";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFilter {
    #[default]
    All,
    Found,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub status: StatusFilter,
    /// Exact category match; `None` keeps every category.
    pub category: Option<String>,
    #[serde(rename = "showNSFW")]
    pub show_nsfw: bool,
    pub search_query: String,
}

impl Default for FilterOptions {
    /// The identity filter.
    fn default() -> Self {
        Self {
            status: StatusFilter::All,
            category: None,
            show_nsfw: true,
            search_query: String::new(),
        }
    }
}

impl FilterOptions {
    fn matches(&self, result: &SearchResult, query: &str) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Found => result.is_found(),
            StatusFilter::NotFound => !result.is_found(),
        };
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |category| result.category == category);
        let nsfw_ok = self.show_nsfw || !result.is_nsfw;
        let query_ok = query.is_empty() || result.source.to_lowercase().contains(query);

        status_ok && category_ok && nsfw_ok && query_ok
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    #[default]
    Default,
    ResponseTime,
    Alphabetical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOptions {
    pub sort_by: SortBy,
    pub order: SortOrder,
}

/// Aggregate numbers shown above the result list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultStats {
    pub total: usize,
    pub found: usize,
    pub not_found: usize,
    pub nsfw: usize,
    pub avg_response_time: f64,
    pub category_counts: BTreeMap<String, usize>,
}

/// Keep the results that satisfy every active predicate, in input order.
pub fn filter_results(results: &[SearchResult], options: &FilterOptions) -> Vec<SearchResult> {
    let query = options.search_query.to_lowercase();
    results
        .iter()
        .filter(|r| options.matches(r, &query))
        .cloned()
        .collect()
}

/// Case-insensitive comparison; on a case-only tie lowercase sorts first,
/// which is what the browser collator does by default.
fn compare_source(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

fn compare(a: &SearchResult, b: &SearchResult, options: &SortOptions) -> Ordering {
    let desc = options.order == SortOrder::Desc;
    match options.sort_by {
        SortBy::Default => {
            // Found always precedes not-found; order only flips the tiebreak.
            if a.is_found() != b.is_found() {
                return if a.is_found() {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
            }
            let by_time = a.response_time().cmp(&b.response_time());
            if desc {
                by_time.reverse()
            } else {
                by_time
            }
        }
        SortBy::ResponseTime => {
            let ord = a.response_time().cmp(&b.response_time());
            if desc {
                ord.reverse()
            } else {
                ord
            }
        }
        SortBy::Alphabetical => {
            let ord = compare_source(&a.source, &b.source);
            if desc {
                ord.reverse()
            } else {
                ord
            }
        }
    }
}

/// Return a sorted copy of `results`. The sort is stable.
pub fn sort_results(results: &[SearchResult], options: &SortOptions) -> Vec<SearchResult> {
    let mut sorted = results.to_vec();
    sorted.sort_by(|a, b| compare(a, b, options));
    sorted
}

/// Filter, then sort.
pub fn apply_view(
    results: &[SearchResult],
    filter: &FilterOptions,
    sort: &SortOptions,
) -> Vec<SearchResult> {
    sort_results(&filter_results(results, filter), sort)
}

/// Distinct non-empty categories in alphabetical order.
pub fn unique_categories(results: &[SearchResult]) -> Vec<String> {
    results
        .iter()
        .filter(|r| !r.category.is_empty())
        .map(|r| r.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn result_stats(results: &[SearchResult]) -> ResultStats {
    let total = results.len();
    let found = results.iter().filter(|r| r.is_found()).count();
    let nsfw = results.iter().filter(|r| r.is_nsfw).count();
    let avg_response_time = if total == 0 {
        0.0
    } else {
        results.iter().map(|r| r.response_time() as f64).sum::<f64>() / total as f64
    };

    let mut category_counts = BTreeMap::new();
    for r in results {
        *category_counts.entry(r.category.clone()).or_insert(0) += 1;
    }

    ResultStats {
        total,
        found,
        not_found: total - found,
        nsfw,
        avg_response_time,
        category_counts,
    }
}

/// Partition by category; uncategorized results land in [`OTHER_CATEGORY`].
pub fn group_by_category(results: &[SearchResult]) -> BTreeMap<String, Vec<SearchResult>> {
    let mut groups: BTreeMap<String, Vec<SearchResult>> = BTreeMap::new();
    for r in results {
        let key = if r.category.is_empty() {
            OTHER_CATEGORY.to_string()
        } else {
            r.category.clone()
        };
        groups.entry(key).or_default().push(r.clone());
    }
    groups
}
