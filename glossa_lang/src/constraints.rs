// Phonotactic constraints: compile raw rule specs, reject matching candidates.
//
// A rule is a named list of regular expressions. A candidate word violates the
// active rule set if any pattern of any active rule matches anywhere in it
// (reject-on-match). Each rule spec in the config may be:
//
//   "no_hiatus": "[aeiou]{2}"
//   "no_tl": {"pattern": "tl", "flags": "i"}
//   "codas": ["q$", {"regex": "x$"}]
//
// Compilation is forgiving: a pattern that fails to compile (or an entry that
// is not a string or record) is logged and skipped, and a rule left with no
// patterns is dropped entirely. Rules named by the ontology but missing here
// never fire.

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Rule name -> compiled patterns. Rules with no surviving pattern are absent.
#[derive(Debug, Clone, Default)]
pub struct CompiledConstraints {
    rules: BTreeMap<String, Vec<Regex>>,
}

impl CompiledConstraints {
    /// Compile every rule in the raw `constraints` section.
    pub fn compile(raw: &BTreeMap<String, Value>) -> Self {
        let mut rules = BTreeMap::new();
        for (name, spec) in raw {
            let items: &[Value] = match spec {
                Value::Array(items) => items,
                single => std::slice::from_ref(single),
            };
            let patterns: Vec<Regex> = items
                .iter()
                .filter_map(|item| compile_item(name, item))
                .collect();
            if patterns.is_empty() {
                warn!(rule = %name, "constraint has no usable patterns; it will never fire");
                continue;
            }
            rules.insert(name.clone(), patterns);
        }
        CompiledConstraints { rules }
    }

    /// Whether `name` compiled to at least one pattern.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The first active rule that matches `word`, in activation order.
    pub fn first_violation<'a>(&self, word: &str, active: &'a [String]) -> Option<&'a str> {
        active
            .iter()
            .find(|name| {
                self.rules
                    .get(name.as_str())
                    .is_some_and(|patterns| patterns.iter().any(|p| p.is_match(word)))
            })
            .map(String::as_str)
    }

    /// Reject-on-match check against the active rule names.
    pub fn violates(&self, word: &str, active: &[String]) -> bool {
        self.first_violation(word, active).is_some()
    }
}

fn compile_item(rule: &str, item: &Value) -> Option<Regex> {
    let (pattern, case_insensitive) = match item {
        Value::String(pattern) => (pattern.as_str(), false),
        Value::Object(record) => {
            let pattern = record
                .get("pattern")
                .or_else(|| record.get("regex"))
                .and_then(Value::as_str)
                .filter(|p| !p.is_empty());
            let Some(pattern) = pattern else {
                warn!(%rule, "constraint record has no 'pattern'; skipping");
                return None;
            };
            let case_insensitive = record
                .get("flags")
                .and_then(Value::as_str)
                .is_some_and(|flags| flags.to_lowercase().contains('i'));
            (pattern, case_insensitive)
        }
        other => {
            warn!(%rule, entry = %other, "unsupported constraint entry; skipping");
            return None;
        }
    };

    match RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
    {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!(%rule, %pattern, error = %e, "invalid constraint pattern; skipping");
            None
        }
    }
}
