// Orthography: rewrites a phonetic string into its written form.
//
// Groups are applied in activation order; within a group, rules run in list
// order. Each rule is one literal replace-all over the current string, so a
// rule never re-scans its own output but later rules do see it. Rules with an
// empty `from` are ignored. Group names with no configured rules are skipped.

use crate::config::OrthographyRule;
use std::collections::BTreeMap;

/// Apply the active spelling groups to `word`.
pub fn apply_orthography(
    word: &str,
    groups: &[String],
    orthography: &BTreeMap<String, Vec<OrthographyRule>>,
) -> String {
    let mut out = word.to_string();
    for rules in groups.iter().filter_map(|name| orthography.get(name)) {
        for rule in rules {
            if !rule.from.is_empty() && out.contains(rule.from.as_str()) {
                out = out.replace(rule.from.as_str(), &rule.to);
            }
        }
    }
    out
}
