pub mod artifact;
pub mod level;

pub use artifact::{Artifact, ArtifactMetadata, ScoreRow};
pub use level::Level;
