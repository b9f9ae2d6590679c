// The word generation engine.
//
// `Engine` owns a parsed `LanguageConfig`, the constraints compiled from it,
// a phoneme -> class index, and a seeded `WordRng`. It also carries the
// per-session diagnostics: the lexicon of words produced so far, the
// missing-tag counters, and the cache of generated grammatical suffixes.
// Nothing here is global, so one engine per language never cross-contaminates
// another.
//
// A `generate` call runs:
//
//   aggregate -> (choose shape -> expand -> fill -> constraint check
//                 -> orthography -> lexicon check)* -> word
//
// and fails with `NoBlueprint` before drawing any randomness when the tags
// supply no shapes, or with `Exhausted` once the attempt budget is spent
// without a constraint-clean candidate. Uniqueness is best-effort: an unseen
// word is preferred, but if every clean candidate in the budget was already
// in the lexicon the first of them is returned and counted in `repeats()`.
//
// Suffix generation never fails: a missing morphology entry or an exhausted
// budget falls back to `FALLBACK_SUFFIX`.

use crate::aggregate::{Blend, MissingTags, PhonemeIndex, TagInput, aggregate};
use crate::config::{LanguageConfig, MorphologyEntry};
use crate::constraints::CompiledConstraints;
use crate::error::{LangError, Result};
use crate::orthography::apply_orthography;
use crate::shape::{choose_template, expand_shape, fill_shape};
use glossa_prng::WordRng;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Attempt budget for `generate`.
pub const DEFAULT_ATTEMPTS: usize = 100;
/// Attempt budget for `generate_suffix`.
pub const DEFAULT_SUFFIX_ATTEMPTS: usize = 50;
/// Suffix used when a grammar type is unknown or its suffix cannot be built.
pub const FALLBACK_SUFFIX: &str = "a";
/// Extra weight a grammar type's anchor gets in `blend_with_grammar`.
pub const GRAMMAR_BLEND_WEIGHT: f64 = 1.5;

#[derive(Debug)]
pub struct Engine {
    config: LanguageConfig,
    constraints: CompiledConstraints,
    index: PhonemeIndex,
    rng: WordRng,
    lexicon: BTreeSet<String>,
    repeats: u64,
    missing: MissingTags,
    suffixes: BTreeMap<String, String>,
}

impl Engine {
    /// Build an engine for `config`; every random choice derives from `seed`.
    pub fn new(config: LanguageConfig, seed: u64) -> Self {
        let constraints = CompiledConstraints::compile(&config.constraints);
        let index = PhonemeIndex::build(&config.definitions);
        Engine {
            config,
            constraints,
            index,
            rng: WordRng::new(seed),
            lexicon: BTreeSet::new(),
            repeats: 0,
            missing: MissingTags::default(),
            suffixes: BTreeMap::new(),
        }
    }

    pub fn from_json(json: &str, seed: u64) -> Result<Self> {
        Ok(Self::new(LanguageConfig::from_json(json)?, seed))
    }

    pub fn load(path: impl AsRef<Path>, seed: u64) -> Result<Self> {
        Ok(Self::new(LanguageConfig::load(path)?, seed))
    }

    pub fn config(&self) -> &LanguageConfig {
        &self.config
    }

    pub fn morphology(&self) -> &BTreeMap<String, MorphologyEntry> {
        &self.config.morphology
    }

    /// Blend `tags` into pools, shapes, rules and spelling groups, counting
    /// any tags the ontology does not know.
    pub fn aggregate(&mut self, tags: &TagInput) -> Blend {
        aggregate(&self.config, &self.index, tags, &mut self.missing)
    }

    /// Generate a word with the default attempt budget.
    pub fn generate(&mut self, tags: &TagInput) -> Result<String> {
        self.generate_with_attempts(tags, DEFAULT_ATTEMPTS)
    }

    /// Generate from a JSON tag list or tag -> multiplier object.
    pub fn generate_json(&mut self, tags: &Value) -> Result<String> {
        let tags = TagInput::from_json(tags)?;
        self.generate(&tags)
    }

    /// Generate a word, trying at most `attempts` candidates (at least one).
    pub fn generate_with_attempts(&mut self, tags: &TagInput, attempts: usize) -> Result<String> {
        let blend = self.aggregate(tags);
        if !blend.has_blueprint() {
            return Err(LangError::NoBlueprint {
                tags: tags.display_names(),
            });
        }

        let attempts = attempts.max(1);
        let mut repeat: Option<String> = None;

        for attempt in 0..attempts {
            let Some(template) = choose_template(&blend.shapes, &mut self.rng) else {
                continue;
            };
            let shape = expand_shape(template, &mut self.rng);
            let Some(raw) = fill_shape(&shape, &blend.pools, &mut self.rng) else {
                debug!(attempt, %shape, "no candidates for some slot");
                continue;
            };
            if let Some(rule) = self.constraints.first_violation(&raw, &blend.rules) {
                debug!(attempt, word = %raw, %rule, "rejected by constraint");
                continue;
            }

            let word = apply_orthography(&raw, &blend.spelling, &self.config.orthography);
            if self.lexicon.contains(&word) {
                repeat.get_or_insert(word);
                continue;
            }
            self.lexicon.insert(word.clone());
            return Ok(word);
        }

        if let Some(word) = repeat {
            self.repeats += 1;
            debug!(%word, "no unseen word within budget; returning a repeat");
            return Ok(word);
        }

        Err(LangError::Exhausted {
            tags: tags.display_names(),
            attempts,
        })
    }

    /// Generate a suffix for `grammar_type` with the default attempt budget.
    pub fn generate_suffix(&mut self, grammar_type: &str) -> String {
        self.generate_suffix_with_attempts(grammar_type, DEFAULT_SUFFIX_ATTEMPTS)
    }

    /// Fill the grammar type's fixed shape using sounds from its anchor tag
    /// alone. Never fails; see `FALLBACK_SUFFIX`.
    pub fn generate_suffix_with_attempts(
        &mut self,
        grammar_type: &str,
        attempts: usize,
    ) -> String {
        let Some(entry) = self.config.morphology.get(grammar_type) else {
            debug!(%grammar_type, "no morphology entry; using fallback suffix");
            return FALLBACK_SUFFIX.to_string();
        };
        let shape = entry.shape.clone();
        let tags = if entry.anchor.is_empty() {
            TagInput::default()
        } else {
            TagInput::from_names([entry.anchor.as_str()])
        };

        let blend = self.aggregate(&tags);
        for _ in 0..attempts.max(1) {
            let expanded = expand_shape(&shape, &mut self.rng);
            let Some(raw) = fill_shape(&expanded, &blend.pools, &mut self.rng) else {
                continue;
            };
            if self.constraints.violates(&raw, &blend.rules) {
                continue;
            }
            return apply_orthography(&raw, &blend.spelling, &self.config.orthography);
        }

        warn!(%grammar_type, %shape, "suffix generation exhausted; using fallback suffix");
        FALLBACK_SUFFIX.to_string()
    }

    /// The suffix for `grammar_type`, generated on first use and then reused
    /// so every word inflected for the same feature carries the same marker.
    pub fn suffix_for(&mut self, grammar_type: &str) -> String {
        if let Some(suffix) = self.suffixes.get(grammar_type) {
            return suffix.clone();
        }
        let suffix = self.generate_suffix(grammar_type);
        debug!(%grammar_type, %suffix, "generated grammatical suffix");
        self.suffixes.insert(grammar_type.to_string(), suffix.clone());
        suffix
    }

    /// `root` followed by the cached suffix for `grammar_type`.
    pub fn inflect(&mut self, root: &str, grammar_type: &str) -> String {
        let suffix = self.suffix_for(grammar_type);
        format!("{root}{suffix}")
    }

    /// `tags` with the grammar type's anchor boosted by
    /// `GRAMMAR_BLEND_WEIGHT`. Unknown grammar types and empty anchors leave
    /// the input unchanged.
    pub fn blend_with_grammar(&self, tags: &TagInput, grammar_type: &str) -> TagInput {
        let mut blended = tags.clone();
        let anchor = match self.config.morphology.get(grammar_type) {
            Some(entry) if !entry.anchor.is_empty() => entry.anchor.as_str(),
            _ => return blended,
        };
        let current = blended.weight(anchor).unwrap_or(0.0);
        blended.set(anchor.to_string(), current + GRAMMAR_BLEND_WEIGHT);
        blended
    }

    /// Grammar type -> suffix, for every suffix produced by `suffix_for`.
    pub fn suffixes(&self) -> &BTreeMap<String, String> {
        &self.suffixes
    }

    /// Every word `generate` has produced in this session.
    pub fn lexicon(&self) -> &BTreeSet<String> {
        &self.lexicon
    }

    /// How many `generate` calls had to return an already-produced word.
    pub fn repeats(&self) -> u64 {
        self.repeats
    }

    pub fn missing_tags(&self) -> &MissingTags {
        &self.missing
    }

    /// `(tag, count)` for every tag missing from the ontology, most frequent
    /// first.
    pub fn missing_tag_report(&self) -> Vec<(String, u64)> {
        self.missing.report()
    }

    /// Write the full missing-tag report as `tag<TAB>count` lines.
    pub fn write_missing_tags(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut out = std::io::BufWriter::new(file);
        for (tag, count) in self.missing.report() {
            writeln!(out, "{tag}\t{count}")?;
        }
        out.flush()?;
        Ok(())
    }
}
