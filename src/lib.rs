pub mod assistant;
pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod prompt;
pub mod secrets;
pub mod sources;

pub use assistant::Assistant;
pub use error::{Error, Result};
