//! Client-side state for one username search, driven by a reducer.
//!
//! The stream consumer turns each decoded record into a [`SearchEvent`] and
//! folds it into [`SearchState`] with [`SearchState::apply`]. Rendering reads
//! the state; nothing else mutates it.

use serde::{Deserialize, Serialize};

use crate::result::{SearchMetadata, SearchResult, StreamRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchPhase {
    #[default]
    Idle,
    Searching,
    Completed,
    Failed,
}

/// Closed set of transitions the search view understands.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    /// A new search begins; previous results are discarded.
    Started { username: String },
    ResultReceived(Box<SearchResult>),
    ProgressUpdated(SearchMetadata),
    Failed { message: String },
    Completed,
    Reset,
}

impl SearchEvent {
    /// Map a decoded stream record to the event it implies, if any.
    pub fn from_record(record: StreamRecord) -> Option<Self> {
        match record {
            StreamRecord::Result(result) => Some(SearchEvent::ResultReceived(result)),
            StreamRecord::Metadata(meta) => Some(SearchEvent::ProgressUpdated(meta)),
            StreamRecord::Error(err) => Some(SearchEvent::Failed { message: err.error }),
            StreamRecord::Unknown(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub phase: SearchPhase,
    pub username: String,
    pub results: Vec<SearchResult>,
    /// Expected number of results, once the stream has announced it.
    pub total: Option<u64>,
    pub error: Option<String>,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_searching(&self) -> bool {
        self.phase == SearchPhase::Searching
    }

    /// Results received so far.
    pub fn checked(&self) -> usize {
        self.results.len()
    }

    /// Completion percentage in `0..=100`, when a total is known.
    pub fn progress_percent(&self) -> Option<u8> {
        let total = self.total?;
        if self.phase == SearchPhase::Completed {
            return Some(100);
        }
        if total == 0 {
            return Some(0);
        }
        let pct = (self.checked() as u64 * 100 / total).min(100);
        Some(pct as u8)
    }

    /// Apply one event and return the next state.
    pub fn apply(mut self, event: SearchEvent) -> Self {
        match event {
            SearchEvent::Started { username } => {
                return SearchState {
                    phase: SearchPhase::Searching,
                    username,
                    ..SearchState::default()
                };
            }
            SearchEvent::ResultReceived(result) => {
                if self.phase == SearchPhase::Searching {
                    self.results.push(*result);
                }
            }
            SearchEvent::ProgressUpdated(meta) => {
                if let Some(total) = meta.total {
                    self.total = Some(total);
                }
                if meta.completed == Some(true) && self.phase == SearchPhase::Searching {
                    self.phase = SearchPhase::Completed;
                }
            }
            SearchEvent::Failed { message } => {
                self.phase = SearchPhase::Failed;
                self.error = Some(message);
            }
            SearchEvent::Completed => {
                if self.phase == SearchPhase::Searching {
                    self.phase = SearchPhase::Completed;
                }
            }
            SearchEvent::Reset => return SearchState::default(),
        }
        self
    }
}
