pub mod client;
pub mod models;
pub mod normalizer;
pub mod prompt;
pub mod request;

pub use client::{AnalysisError, CompletionClient};
pub use request::AnalysisRequest;
