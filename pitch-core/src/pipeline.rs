//! Idea → prompt → completion → parse → persist.

use chrono::Utc;
use serde_json::error::Category;
use thiserror::Error;

use crate::completion::{CompletionBackend, CompletionError};
use crate::models::{GeneratedArtifact, IdeaRequest, PitchArtifact};
use crate::prompt::render_prompt;
use crate::store::{HistoryStore, StoreError};

/// Why a generation request failed. Each variant maps to one response shape
/// at the HTTP boundary.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Missing 'idea' field")]
    MissingIdea,

    #[error("Completion request failed: {0}")]
    Upstream(#[from] CompletionError),

    #[error("Completion content {}: {}", parse_failure(.0), .0)]
    Parse(#[from] serde_json::Error),

    #[error("Failed to store generated artifact: {0}")]
    Storage(#[from] StoreError),
}

impl GenerateError {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerateError::MissingIdea => "input",
            GenerateError::Upstream(_) => "upstream",
            GenerateError::Parse(_) => "parse",
            GenerateError::Storage(_) => "storage",
        }
    }

    /// True when a parse failure came from valid JSON with the wrong shape.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, GenerateError::Parse(e) if e.classify() == Category::Data)
    }
}

/// Describe a reply that could not be turned into an artifact. Well-formed
/// JSON of the wrong shape is reported separately from broken JSON.
fn parse_failure(err: &serde_json::Error) -> &'static str {
    match err.classify() {
        Category::Data => "does not match the artifact schema",
        _ => "is not valid JSON",
    }
}

/// Parse the model's reply into the four-field artifact.
pub fn parse_artifact(content: &str) -> Result<PitchArtifact, serde_json::Error> {
    serde_json::from_str(content)
}

/// Run one generation. An absent or empty idea fails before any network or
/// store access. On success exactly one record has been written.
pub async fn generate(
    request: IdeaRequest,
    completion: &dyn CompletionBackend,
    store: &dyn HistoryStore,
) -> Result<GeneratedArtifact, GenerateError> {
    let idea = match request.idea {
        Some(idea) if !idea.is_empty() => idea,
        _ => return Err(GenerateError::MissingIdea),
    };

    let prompt = render_prompt(&idea);
    let content = completion.complete(&prompt).await?;
    let artifact = parse_artifact(&content)?;

    let record = GeneratedArtifact::new(artifact, idea, Utc::now());
    store.insert_one(&record).await?;

    Ok(record)
}
