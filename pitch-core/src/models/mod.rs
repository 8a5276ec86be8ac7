pub mod artifact;

pub use artifact::{GeneratedArtifact, IdeaRequest, PitchArtifact};
