// Error kinds surfaced by the engine.
//
// Only structural failures are errors. Semantic gaps (tags missing from the
// ontology, grammar types missing from the morphology, constraint patterns
// that do not compile) degrade with a log line and a diagnostic counter
// instead; see `aggregate.rs` and `constraints.rs`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LangError {
    #[error("Config not found: {}", .path.display())]
    ConfigNotFound { path: PathBuf },
    #[error("Config parse error: {0}")]
    ConfigParse(String),
    #[error("Invalid tag input: {0}")]
    InvalidInput(String),
    /// The tag set contributed zero syllable shapes. Retrying cannot help.
    #[error("The tags {tags:?} provided zero syllable shapes; check 'add_shapes' in the ontology")]
    NoBlueprint { tags: Vec<String> },
    /// A blueprint existed but no candidate survived the active constraints.
    #[error(
        "Failed to generate a valid word after {attempts} attempts for tags {tags:?}; \
         constraints may be too strict or phoneme pools too small"
    )]
    Exhausted { tags: Vec<String>, attempts: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LangError>;

impl From<serde_json::Error> for LangError {
    fn from(e: serde_json::Error) -> Self {
        Self::ConfigParse(e.to_string())
    }
}
