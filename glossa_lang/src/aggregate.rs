// Tag aggregation: blends weighted tags into phoneme pools, shapes and rules.
//
// Every generation call starts here. Each input tag is looked up in the
// ontology and its contributions are scaled by `entry.weight * multiplier`:
//
// - sounds land in the pool of every phoneme class the phoneme belongs to
//   (a phoneme listed under both "C" and "Liquids" boosts both), or in the
//   catch-all `any` pool when it belongs to none;
// - shape weights add up across tags, so templates favored by several tags
//   at once become more likely;
// - rule names and spelling groups are collected once each, in first-seen
//   order, with the `default` spelling group (when configured) always first.
//
// Part-of-speech tags usually carry only shapes and rules while anchor tags
// carry sounds. When no tag supplied consonants and nothing went to `any`,
// the raw "C" class (and "V", if that pool is empty too) is seeded at weight
// 1.0 so a bare "noun" still produces words.
//
// Tags absent from the ontology are counted in `MissingTags` and otherwise
// ignored. All maps are `BTreeMap`s; weighted sampling downstream relies on
// the sorted iteration order for seed reproducibility.

use crate::config::LanguageConfig;
use crate::error::{LangError, Result};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Catch-all pool for phonemes that belong to no defined class.
pub const ANY_POOL: &str = "any";
/// Primary consonant class, used by the safety net.
pub const CONSONANT_CLASS: &str = "C";
/// Primary vowel class, used by the safety net.
pub const VOWEL_CLASS: &str = "V";
/// Orthography group applied to every word when present.
pub const DEFAULT_SPELLING: &str = "default";

/// Phoneme -> accumulated weight.
pub type Pool = BTreeMap<String, f64>;

/// Weighted tag input for one generation call.
///
/// Keeps the caller's order (duplicates collapse onto their first position)
/// because rule and spelling activation follow first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagInput {
    tags: Vec<(String, f64)>,
}

impl TagInput {
    /// A plain set of tags, each with multiplier 1.0.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_weights(names.into_iter().map(|name| (name, 1.0)))
    }

    /// Explicit tag -> multiplier pairs. A repeated tag keeps its first
    /// position and takes the last multiplier, like a map insert.
    pub fn from_weights<I, S>(weights: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut input = TagInput::default();
        for (tag, weight) in weights {
            input.set(tag.into(), weight);
        }
        input
    }

    /// Accept a JSON array of tag names or a JSON object of numeric
    /// multipliers, in document order. Anything else is `InvalidInput`.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => {
                let mut names = Vec::with_capacity(items.len());
                for item in items {
                    let Some(name) = item.as_str() else {
                        return Err(LangError::InvalidInput(format!(
                            "tag list entries must be strings, got {item}"
                        )));
                    };
                    names.push(name);
                }
                Ok(Self::from_names(names))
            }
            Value::Object(map) => {
                let mut weights = Vec::with_capacity(map.len());
                for (tag, weight) in map {
                    let Some(weight) = weight.as_f64() else {
                        return Err(LangError::InvalidInput(format!(
                            "multiplier for tag '{tag}' must be a number, got {weight}"
                        )));
                    };
                    weights.push((tag.as_str(), weight));
                }
                Ok(Self::from_weights(weights))
            }
            other => Err(LangError::InvalidInput(format!(
                "expected a list of tags or a map of tag weights, got {other}"
            ))),
        }
    }

    /// Parse the command-line form `tag` or `tag:weight`.
    pub fn parse_arg(arg: &str) -> Result<(String, f64)> {
        match arg.rsplit_once(':') {
            Some((tag, weight)) if !tag.is_empty() => {
                let weight: f64 = weight.parse().map_err(|_| {
                    LangError::InvalidInput(format!("bad weight in '{arg}'"))
                })?;
                Ok((tag.to_string(), weight))
            }
            Some(_) => Err(LangError::InvalidInput(format!("empty tag in '{arg}'"))),
            None if arg.is_empty() => Err(LangError::InvalidInput("empty tag".to_string())),
            None => Ok((arg.to_string(), 1.0)),
        }
    }

    /// Set a tag's multiplier, appending it if new.
    pub fn set(&mut self, tag: String, weight: f64) {
        match self.tags.iter_mut().find(|(t, _)| *t == tag) {
            Some(existing) => existing.1 = weight,
            None => self.tags.push((tag, weight)),
        }
    }

    /// The multiplier for `tag`, if present.
    pub fn weight(&self, tag: &str) -> Option<f64> {
        self.tags.iter().find(|(t, _)| t == tag).map(|(_, w)| *w)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.tags.iter().map(|(t, w)| (t.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tag names in input order, for error messages.
    pub fn display_names(&self) -> Vec<String> {
        self.tags.iter().map(|(t, _)| t.clone()).collect()
    }
}

/// Phoneme -> every class it is listed under.
#[derive(Debug, Clone, Default)]
pub struct PhonemeIndex {
    classes: BTreeMap<String, BTreeSet<String>>,
}

impl PhonemeIndex {
    pub fn build(definitions: &BTreeMap<String, Vec<String>>) -> Self {
        let mut classes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (class, phonemes) in definitions {
            for phoneme in phonemes {
                classes
                    .entry(phoneme.clone())
                    .or_default()
                    .insert(class.clone());
            }
        }
        PhonemeIndex { classes }
    }

    /// Classes containing `phoneme`; empty when it is unclassified.
    pub fn classes_of(&self, phoneme: &str) -> impl Iterator<Item = &str> {
        self.classes
            .get(phoneme)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }
}

/// Running count of input tags that had no ontology entry.
#[derive(Debug, Clone, Default)]
pub struct MissingTags {
    counts: BTreeMap<String, u64>,
}

impl MissingTags {
    /// Count one more sighting and return the new total for `tag`.
    pub fn record(&mut self, tag: &str) -> u64 {
        let count = self.counts.entry(tag.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn count(&self, tag: &str) -> u64 {
        self.counts.get(tag).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `(tag, count)` pairs, most frequent first, ties by tag name.
    pub fn report(&self) -> Vec<(String, u64)> {
        let mut report: Vec<(String, u64)> = self
            .counts
            .iter()
            .map(|(tag, count)| (tag.clone(), *count))
            .collect();
        report.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        report
    }
}

/// The blended generation recipe for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blend {
    /// Slot class name (or `any`) -> weighted phonemes.
    pub pools: BTreeMap<String, Pool>,
    /// Shape template -> summed weight.
    pub shapes: BTreeMap<String, f64>,
    /// Active constraint rule names, first-seen order.
    pub rules: Vec<String>,
    /// Active orthography groups, `default` first when configured.
    pub spelling: Vec<String>,
}

impl Blend {
    /// Whether any tag contributed a syllable shape.
    pub fn has_blueprint(&self) -> bool {
        !self.shapes.is_empty()
    }

    fn pool_is_empty(&self, name: &str) -> bool {
        self.pools.get(name).is_none_or(BTreeMap::is_empty)
    }

    fn add_phoneme(&mut self, pool: &str, phoneme: &str, weight: f64) {
        *self
            .pools
            .entry(pool.to_string())
            .or_default()
            .entry(phoneme.to_string())
            .or_insert(0.0) += weight;
    }
}

/// Blend `tags` against the configuration's ontology.
pub fn aggregate(
    config: &LanguageConfig,
    index: &PhonemeIndex,
    tags: &TagInput,
    missing: &mut MissingTags,
) -> Blend {
    let mut blend = Blend::default();
    let mut rules_seen = BTreeSet::new();
    let mut spelling_seen = BTreeSet::new();

    if config.orthography.contains_key(DEFAULT_SPELLING) {
        spelling_seen.insert(DEFAULT_SPELLING.to_string());
        blend.spelling.push(DEFAULT_SPELLING.to_string());
    }

    for (tag, multiplier) in tags.iter() {
        let Some(entry) = config.ontology.get(tag) else {
            let count = missing.record(tag);
            if multiplier > 0.0 {
                warn!(%tag, count, "tag missing from ontology");
            }
            continue;
        };

        let weight = entry.weight * multiplier;
        if weight.is_nan() || weight <= 0.0 {
            continue;
        }

        for sound in &entry.add_sounds {
            let phonemes: &[String] = match config.definitions.get(sound) {
                Some(class) => class,
                None => std::slice::from_ref(sound),
            };
            for phoneme in phonemes {
                let mut classified = false;
                for class in index.classes_of(phoneme) {
                    blend.add_phoneme(class, phoneme, weight);
                    classified = true;
                }
                if !classified {
                    blend.add_phoneme(ANY_POOL, phoneme, weight);
                }
            }
        }

        for shape in &entry.add_shapes {
            *blend.shapes.entry(shape.clone()).or_insert(0.0) += weight;
        }

        for rule in &entry.add_rules {
            if rules_seen.insert(rule.clone()) {
                blend.rules.push(rule.clone());
            }
        }

        for group in &entry.add_spelling {
            if spelling_seen.insert(group.clone()) {
                blend.spelling.push(group.clone());
            }
        }
    }

    // No consonant source at all: fall back to the raw classes. A vowel pool
    // the tags already built is left as they weighted it.
    if blend.pool_is_empty(CONSONANT_CLASS) && blend.pool_is_empty(ANY_POOL) {
        let mut seed = vec![CONSONANT_CLASS];
        if blend.pool_is_empty(VOWEL_CLASS) {
            seed.push(VOWEL_CLASS);
        }
        for class in seed {
            for phoneme in config.definitions.get(class).into_iter().flatten() {
                blend.add_phoneme(class, phoneme, 1.0);
            }
        }
    }

    blend
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "definitions": {
            "C": ["t", "k", "l", "r"],
            "V": ["a", "e", "i"],
            "Liquids": ["l", "r"]
        },
        "orthography": {
            "default": [{"from": "k", "to": "c"}],
            "soft": [{"from": "t", "to": "th"}]
        },
        "ontology": {
            "noun": {"add_shapes": ["CV", "CVC"], "add_rules": ["no_hiatus"]},
            "verb": {"add_shapes": ["CV"], "add_rules": ["no_hiatus", "no_tl"], "add_spelling": ["soft"]},
            "water": {"weight": 2.0, "add_sounds": ["Liquids", "V"]},
            "stone": {"add_sounds": ["t", "q"], "add_spelling": ["soft", "default"]},
            "silent": {"weight": 0.0, "add_shapes": ["V"]}
        }
    }"#;

    fn setup() -> (LanguageConfig, PhonemeIndex) {
        let config = LanguageConfig::from_json(CONFIG).unwrap();
        let index = PhonemeIndex::build(&config.definitions);
        (config, index)
    }

    fn run(input: &TagInput) -> (Blend, MissingTags) {
        let (config, index) = setup();
        let mut missing = MissingTags::default();
        let blend = aggregate(&config, &index, input, &mut missing);
        (blend, missing)
    }

    #[test]
    fn test_class_sound_lands_in_every_parent_class() {
        let (blend, _) = run(&TagInput::from_names(["water"]));
        // "l" is in both C and Liquids.
        assert_eq!(blend.pools["Liquids"]["l"], 2.0);
        assert_eq!(blend.pools["C"]["l"], 2.0);
        assert_eq!(blend.pools["C"]["r"], 2.0);
        assert!(!blend.pools["C"].contains_key("t"));
        assert_eq!(blend.pools["V"]["a"], 2.0);
    }

    #[test]
    fn test_literal_sounds_classified_or_any() {
        let (blend, _) = run(&TagInput::from_names(["stone"]));
        assert_eq!(blend.pools["C"]["t"], 1.0);
        assert_eq!(blend.pools[ANY_POOL]["q"], 1.0);
    }

    #[test]
    fn test_multiplier_scales_weight() {
        let (blend, _) = run(&TagInput::from_weights([("water", 1.5)]));
        assert_eq!(blend.pools["Liquids"]["r"], 3.0);
    }

    #[test]
    fn test_shape_weights_sum_across_tags() {
        let (blend, _) = run(&TagInput::from_weights([("noun", 1.0), ("verb", 2.0)]));
        assert_eq!(blend.shapes["CV"], 3.0);
        assert_eq!(blend.shapes["CVC"], 1.0);
    }

    #[test]
    fn test_rules_deduplicated_in_first_seen_order() {
        let (blend, _) = run(&TagInput::from_names(["verb", "noun"]));
        assert_eq!(blend.rules, vec!["no_hiatus", "no_tl"]);
    }

    #[test]
    fn test_default_spelling_always_first() {
        let (blend, _) = run(&TagInput::from_names(["stone"]));
        assert_eq!(blend.spelling, vec!["default", "soft"]);

        let (blend, _) = run(&TagInput::from_names(["noun"]));
        assert_eq!(blend.spelling, vec!["default"]);
    }

    #[test]
    fn test_missing_tags_counted_and_skipped() {
        let (config, index) = setup();
        let mut missing = MissingTags::default();
        let input = TagInput::from_names(["noun", "dragon"]);
        aggregate(&config, &index, &input, &mut missing);
        let blend = aggregate(&config, &index, &input, &mut missing);
        assert_eq!(missing.count("dragon"), 2);
        assert_eq!(missing.count("noun"), 0);
        assert_eq!(blend.shapes.len(), 2);
    }

    #[test]
    fn test_non_positive_weight_skips_tag() {
        let (blend, _) = run(&TagInput::from_names(["silent"]));
        assert!(!blend.has_blueprint());

        let (blend, _) = run(&TagInput::from_weights([("noun", -1.0)]));
        assert!(!blend.has_blueprint());
        assert!(blend.rules.is_empty());
    }

    #[test]
    fn test_safety_net_seeds_consonants_and_vowels() {
        let (blend, _) = run(&TagInput::from_names(["noun"]));
        assert_eq!(blend.pools["C"].len(), 4);
        assert_eq!(blend.pools["V"].len(), 3);
        assert!(blend.pools["C"].values().all(|&w| w == 1.0));
    }

    #[test]
    fn test_safety_net_seeds_consonants_for_vowel_only_sounds() {
        let (config, index) = setup();
        let mut config = config;
        config.ontology.insert(
            "breath".to_string(),
            crate::config::OntologyEntry {
                weight: 3.0,
                add_sounds: vec!["e".to_string()],
                ..Default::default()
            },
        );
        let mut missing = MissingTags::default();
        let input = TagInput::from_names(["noun", "breath"]);
        let blend = aggregate(&config, &index, &input, &mut missing);
        assert_eq!(blend.pools["C"].len(), 4);
        assert!(blend.pools["C"].values().all(|&w| w == 1.0));
        // The tag's vowel pool is kept as weighted, not topped up.
        assert_eq!(blend.pools["V"].len(), 1);
        assert_eq!(blend.pools["V"]["e"], 3.0);
    }

    #[test]
    fn test_object_input_keeps_key_order_into_spelling() {
        let (config, index) = setup();
        let mut config = config;
        for (tag, group) in [("zeta", "one"), ("alpha", "two")] {
            config.orthography.insert(group.to_string(), Vec::new());
            config.ontology.insert(
                tag.to_string(),
                crate::config::OntologyEntry {
                    add_spelling: vec![group.to_string()],
                    ..Default::default()
                },
            );
        }
        let input =
            TagInput::from_json(&serde_json::json!({"noun": 1.0, "zeta": 1.0, "alpha": 1.0}))
                .unwrap();
        let names: Vec<&str> = input.iter().map(|(tag, _)| tag).collect();
        assert_eq!(names, vec!["noun", "zeta", "alpha"]);

        let mut missing = MissingTags::default();
        let blend = aggregate(&config, &index, &input, &mut missing);
        assert_eq!(blend.spelling, vec!["default", "one", "two"]);
    }

    #[test]
    fn test_safety_net_not_used_when_sounds_present() {
        let (blend, _) = run(&TagInput::from_names(["noun", "water"]));
        // Only the liquids made it into C.
        assert_eq!(blend.pools["C"].len(), 2);
    }

    #[test]
    fn test_tag_input_from_json_list_and_map() {
        let list = TagInput::from_json(&serde_json::json!(["noun", "water", "noun"])).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.weight("water"), Some(1.0));

        let map = TagInput::from_json(&serde_json::json!({"noun": 1, "fire": 4.0})).unwrap();
        assert_eq!(map.weight("fire"), Some(4.0));
        assert_eq!(map.weight("noun"), Some(1.0));
    }

    #[test]
    fn test_tag_input_from_json_rejects_other_shapes() {
        for bad in [
            serde_json::json!("noun"),
            serde_json::json!(3),
            serde_json::json!(null),
            serde_json::json!(["noun", 1]),
            serde_json::json!({"noun": "heavy"}),
        ] {
            let err = TagInput::from_json(&bad).unwrap_err();
            assert!(matches!(err, LangError::InvalidInput(_)), "{bad} gave {err:?}");
        }
    }

    #[test]
    fn test_parse_arg() {
        assert_eq!(TagInput::parse_arg("fire").unwrap(), ("fire".to_string(), 1.0));
        assert_eq!(TagInput::parse_arg("fire:4").unwrap(), ("fire".to_string(), 4.0));
        assert!(TagInput::parse_arg("fire:lots").is_err());
        assert!(TagInput::parse_arg(":2").is_err());
        assert!(TagInput::parse_arg("").is_err());
    }

    #[test]
    fn test_missing_report_sorted_by_count() {
        let mut missing = MissingTags::default();
        for tag in ["b", "a", "c", "c", "a", "c"] {
            missing.record(tag);
        }
        assert_eq!(
            missing.report(),
            vec![
                ("c".to_string(), 3),
                ("a".to_string(), 2),
                ("b".to_string(), 1),
            ]
        );
    }
}
