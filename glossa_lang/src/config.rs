// Language configuration: phoneme classes, constraints, orthography, ontology.
//
// A language is described by one JSON document with four top-level sections:
//
// - `definitions`: phoneme class name -> ordered phoneme list (e.g. "C", "V",
//   "Liquids"). The reserved key `morphology` holds grammar-feature records
//   and is lifted out into `LanguageConfig::morphology` at load time, so it
//   never appears among the phoneme classes.
// - `constraints`: rule name -> pattern spec(s). Kept as raw JSON here and
//   compiled by `constraints.rs`, which tolerates bad entries.
// - `orthography`: group name -> ordered `{from, to}` literal replacements.
// - `ontology`: tag -> `OntologyEntry` (weight plus the sounds, shapes, rules
//   and spelling groups the tag contributes).
//
// Every section defaults to empty. Cross-references (classes named in
// `add_sounds`, rules named in `add_rules`, ...) are not validated here; they
// are resolved lazily during aggregation and simply contribute nothing when
// they dangle.
//
// Loading follows the same pattern as the lexicon loader this crate grew out
// of: JSON string in, typed struct out, with a thin file wrapper on top.

use crate::error::{LangError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Reserved key inside `definitions` that carries the morphology table.
pub const MORPHOLOGY_KEY: &str = "morphology";

/// What a single tag contributes to word generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyEntry {
    /// Multiplier applied to everything this tag contributes.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Phoneme class names or phoneme literals.
    #[serde(default)]
    pub add_sounds: Vec<String>,
    /// Syllable-shape templates such as `"(C)VC"`.
    #[serde(default)]
    pub add_shapes: Vec<String>,
    /// Constraint rule names to activate.
    #[serde(default)]
    pub add_rules: Vec<String>,
    /// Orthography group names to activate.
    #[serde(default)]
    pub add_spelling: Vec<String>,
    #[serde(default)]
    pub note: String,
}

impl Default for OntologyEntry {
    fn default() -> Self {
        OntologyEntry {
            weight: default_weight(),
            add_sounds: Vec::new(),
            add_shapes: Vec::new(),
            add_rules: Vec::new(),
            add_spelling: Vec::new(),
            note: String::new(),
        }
    }
}

/// A grammatical feature's suffix recipe: sound flavor from `anchor`, skeleton
/// from `shape`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphologyEntry {
    #[serde(default)]
    pub anchor: String,
    #[serde(default = "default_suffix_shape")]
    pub shape: String,
    #[serde(default)]
    pub note: String,
}

/// One literal substring replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrthographyRule {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

fn default_weight() -> f64 {
    1.0
}

fn default_suffix_shape() -> String {
    "V".to_string()
}

/// The on-disk layout. `definitions` stays untyped until the morphology key
/// has been pulled out of it.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    definitions: BTreeMap<String, Value>,
    #[serde(default)]
    constraints: BTreeMap<String, Value>,
    #[serde(default)]
    orthography: BTreeMap<String, Vec<OrthographyRule>>,
    #[serde(default)]
    ontology: BTreeMap<String, OntologyEntry>,
}

/// A parsed language configuration.
#[derive(Debug, Clone, Default)]
pub struct LanguageConfig {
    /// Phoneme classes, never containing the morphology key.
    pub definitions: BTreeMap<String, Vec<String>>,
    pub morphology: BTreeMap<String, MorphologyEntry>,
    /// Raw constraint specs; see `constraints::compile_constraints`.
    pub constraints: BTreeMap<String, Value>,
    pub orthography: BTreeMap<String, Vec<OrthographyRule>>,
    pub ontology: BTreeMap<String, OntologyEntry>,
}

impl LanguageConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json)?;
        let mut raw_definitions = file.definitions;

        let morphology = match raw_definitions.remove(MORPHOLOGY_KEY) {
            Some(value) => parse_morphology(value)?,
            None => BTreeMap::new(),
        };

        let mut definitions = BTreeMap::new();
        for (class, value) in raw_definitions {
            let phonemes: Vec<String> = serde_json::from_value(value).map_err(|e| {
                LangError::ConfigParse(format!(
                    "definition '{class}' must be a list of phoneme strings: {e}"
                ))
            })?;
            definitions.insert(class, phonemes);
        }

        Ok(LanguageConfig {
            definitions,
            morphology,
            constraints: file.constraints,
            orthography: file.orthography,
            ontology: file.ontology,
        })
    }

    /// Load a configuration file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LangError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        info!(path = %path.display(), "loading language config");
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// The morphology table must be an object; individual entries that are not
/// records are dropped so that the grammar type falls back to the default
/// suffix at generation time.
fn parse_morphology(value: Value) -> Result<BTreeMap<String, MorphologyEntry>> {
    let Value::Object(map) = value else {
        return Err(LangError::ConfigParse(format!(
            "'definitions.{MORPHOLOGY_KEY}' must be an object"
        )));
    };

    let mut morphology = BTreeMap::new();
    for (grammar_type, entry) in map {
        match serde_json::from_value::<MorphologyEntry>(entry) {
            Ok(parsed) => {
                morphology.insert(grammar_type, parsed);
            }
            Err(e) => warn!(%grammar_type, error = %e, "skipping malformed morphology entry"),
        }
    }
    Ok(morphology)
}
