// Glossa word generation engine.
//
// Synthesizes words for a constructed language from semantic tags. A JSON
// configuration describes the language's phoneme classes, phonotactic
// constraints, spelling rules, and an ontology that maps tags (parts of
// speech, conceptual anchors such as "fire" or "water") to weighted sound and
// shape contributions. Tagging, corpus work and editors live outside this
// crate; they produce the configuration and the tag inputs consumed here.
//
// Architecture:
// - `config.rs`: `LanguageConfig`, which loads the four config sections, lifts out
//   the morphology table
// - `constraints.rs`: compiles rule specs to regexes, tolerant of bad entries;
//   reject-on-match checking
// - `aggregate.rs`: `TagInput`, and the tag -> pools/shapes/rules/spelling
//   blend (`Blend`), plus the missing-tag counters
// - `shape.rs`: optional-segment expansion, weighted shape choice, slot filling
// - `orthography.rs`: ordered literal spelling rewrites
// - `engine.rs`: `Engine`, with the retry loop, suffix synthesis, session state
// - `error.rs`: `LangError`
// - `main.rs`: the `generate` command-line tool
//
// Determinism constraint: given the same config, seed and sequence of calls,
// an `Engine` produces the same words. All randomness goes through
// `glossa_prng::WordRng`, and every map the samplers iterate is a `BTreeMap`.

pub mod aggregate;
pub mod config;
pub mod constraints;
pub mod engine;
pub mod error;
pub mod orthography;
pub mod shape;

// Re-export key types at crate root for convenience.
pub use aggregate::{Blend, MissingTags, TagInput};
pub use config::{LanguageConfig, MorphologyEntry, OntologyEntry, OrthographyRule};
pub use engine::{DEFAULT_ATTEMPTS, DEFAULT_SUFFIX_ATTEMPTS, Engine, FALLBACK_SUFFIX};
pub use error::{LangError, Result};
