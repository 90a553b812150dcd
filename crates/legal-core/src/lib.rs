pub mod clauses;
pub mod completion;
pub mod config;
pub mod extract;
pub mod pipeline;
pub mod prompts;
pub mod reconcile;
pub mod types;

pub use types::*;
