//! Search dispatch
//!
//! Every search method runs the same policy: ask the engine when it is
//! available and its data is loaded, otherwise (or on any engine error) run
//! the CLI and tag the answer with the path that produced it.

mod dispatcher;
mod types;

pub use dispatcher::SearchDispatcher;
pub use types::{MethodUsed, SearchMethod, SearchResult};
