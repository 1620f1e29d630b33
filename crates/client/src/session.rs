use futures_util::{Stream, StreamExt};
use shared_types::{SearchEvent, SearchPhase, SearchState, StreamRecord};

use crate::api::ApiClient;
use crate::error::{ClientError, RelayError};

/// Fold a search stream into `state`, calling `on_update` after every
/// record that changed it.
///
/// A relay error or an in-band error record fails the search. A stream
/// that ends cleanly without a completion marker is marked completed.
pub async fn fold_records<S, F>(mut state: SearchState, records: S, mut on_update: F) -> SearchState
where
    S: Stream<Item = Result<StreamRecord, RelayError>>,
    F: FnMut(&SearchState),
{
    let mut records = std::pin::pin!(records);

    while let Some(item) = records.next().await {
        let event = match item {
            Ok(StreamRecord::Unknown(value)) => {
                tracing::debug!(%value, "Ignoring unrecognized search record");
                continue;
            }
            Ok(record) => SearchEvent::from_record(record),
            Err(e) => Some(SearchEvent::Failed {
                message: e.to_string(),
            }),
        };
        let Some(event) = event else { continue };

        state = state.apply(event);
        on_update(&state);
        if state.phase == SearchPhase::Failed {
            return state;
        }
    }

    if state.is_searching() {
        state = state.apply(SearchEvent::Completed);
        on_update(&state);
    }
    state
}

/// Run one username search end to end.
///
/// Errors before the stream opens (validation, rate limiting, missing
/// configuration) are returned as `Err`; failures after that are recorded
/// in the returned state.
pub async fn run_search<F>(
    client: &ApiClient,
    username: &str,
    on_update: F,
) -> Result<SearchState, ClientError>
where
    F: FnMut(&SearchState),
{
    let records = client.search_username(username).await?;
    let state = SearchState::new().apply(SearchEvent::Started {
        username: username.to_string(),
    });
    let state = fold_records(state, records, on_update).await;

    tracing::info!(
        username,
        phase = ?state.phase,
        results = state.checked(),
        "Search finished"
    );
    Ok(state)
}
