pub mod error;
pub mod feature_flags;
pub mod validation;

// Wire types
pub mod chat;
pub mod health;
pub mod result;
pub mod search;
pub mod web_search;

// Client core: stream framing, result view, session state
pub mod export;
pub mod filter;
pub mod store;
pub mod stream;

pub use error::*;
pub use feature_flags::*;
pub use validation::*;

pub use chat::*;
pub use health::*;
pub use result::*;
pub use search::*;
pub use web_search::*;

pub use export::*;
pub use filter::*;
pub use store::*;
pub use stream::*;
