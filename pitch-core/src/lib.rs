pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod store;

pub use completion::{ChatCompletionClient, CompletionBackend, CompletionConfig, CompletionError};
pub use config::PitchConfig;
pub use error::PitchError;
pub use models::{GeneratedArtifact, IdeaRequest, PitchArtifact};
pub use pipeline::{generate, GenerateError};
pub use store::{HistoryStore, PgHistoryStore, StoreError};
