// Shape engine: template expansion, shape selection, and slot filling.
//
// A shape template is a string of slot symbols, one character per slot
// (`C`, `V`, or any single-character class name), with optional segments in
// parentheses: `(C)V(C)` yields `CVC`, `VC`, `CV` or `V`. Each optional
// segment is an independent fair coin flip.
//
// Filling walks the expanded shape one symbol at a time. The candidates for a
// symbol are the union of that symbol's pool and the `any` pool, weighted by
// the sum of both. Candidate maps are `BTreeMap`s, so the order fed to the
// weighted pick is always sorted and a seed reproduces the same word.
//
// All randomness goes through `glossa_prng::WordRng`.

use crate::aggregate::{ANY_POOL, Pool};
use glossa_prng::WordRng;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::BTreeMap;

lazy_static! {
    /// A parenthesized, non-empty optional segment.
    static ref OPTIONAL_SEGMENT: Regex =
        Regex::new(r"\(([^)]+)\)").expect("optional segment pattern is valid");
}

/// Weighted pick with a uniform fallback when no weight is positive.
///
/// Returns `None` only for an empty slice.
pub fn weighted_choice(weights: &[f64], rng: &mut WordRng) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    match rng.weighted_index(weights) {
        Some(i) => Some(i),
        None => Some(rng.range_usize(0, weights.len())),
    }
}

/// Resolve every optional segment of `template` to its content or nothing.
pub fn expand_shape(template: &str, rng: &mut WordRng) -> String {
    OPTIONAL_SEGMENT
        .replace_all(template, |caps: &Captures| {
            if rng.random_bool(0.5) {
                caps[1].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Pick one template by aggregated weight. `None` if there are no templates.
pub fn choose_template<'a>(
    shapes: &'a BTreeMap<String, f64>,
    rng: &mut WordRng,
) -> Option<&'a str> {
    let templates: Vec<&str> = shapes.keys().map(String::as_str).collect();
    let weights: Vec<f64> = shapes.values().map(|&w| w.max(0.0)).collect();
    weighted_choice(&weights, rng).map(|i| templates[i])
}

/// Fill each slot of an expanded shape from the pools.
///
/// Returns `None` when some symbol has no candidates at all; callers treat
/// that as a failed attempt and retry.
pub fn fill_shape(
    shape: &str,
    pools: &BTreeMap<String, Pool>,
    rng: &mut WordRng,
) -> Option<String> {
    let empty = Pool::new();
    let any_pool = pools.get(ANY_POOL).unwrap_or(&empty);
    let mut out = String::new();

    let mut buf = [0u8; 4];
    for symbol in shape.chars() {
        let key: &str = symbol.encode_utf8(&mut buf);
        let slot_pool = pools.get(key).unwrap_or(&empty);

        let mut candidates: BTreeMap<&str, f64> = BTreeMap::new();
        for (phoneme, weight) in slot_pool.iter().chain(any_pool.iter()) {
            *candidates.entry(phoneme.as_str()).or_insert(0.0) += *weight;
        }

        let phonemes: Vec<&str> = candidates.keys().copied().collect();
        let weights: Vec<f64> = candidates.values().copied().collect();
        let chosen = weighted_choice(&weights, rng)?;
        out.push_str(phonemes[chosen]);
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(entries: &[(&str, f64)]) -> Pool {
        entries.iter().map(|(p, w)| (p.to_string(), *w)).collect()
    }

    #[test]
    fn test_expand_without_optionals_is_identity() {
        let mut rng = WordRng::new(1);
        assert_eq!(expand_shape("CVC", &mut rng), "CVC");
        assert_eq!(expand_shape("", &mut rng), "");
    }

    #[test]
    fn test_expand_yields_known_variants() {
        let mut rng = WordRng::new(5);
        for _ in 0..200 {
            let shape = expand_shape("(C)V(C)", &mut rng);
            assert!(
                ["CVC", "VC", "CV", "V"].contains(&shape.as_str()),
                "unexpected expansion {shape}"
            );
        }
    }

    #[test]
    fn test_expand_is_roughly_fair() {
        let mut rng = WordRng::new(77);
        let n = 4000;
        let included = (0..n)
            .filter(|_| expand_shape("(C)V", &mut rng) == "CV")
            .count();
        let share = included as f64 / n as f64;
        assert!((0.45..0.55).contains(&share), "got {:.1}%", share * 100.0);
    }

    #[test]
    fn test_expand_multi_symbol_segment() {
        let mut rng = WordRng::new(3);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..100 {
            seen.insert(expand_shape("V(CC)", &mut rng));
        }
        let expected: std::collections::BTreeSet<String> =
            ["V", "VCC"].iter().map(|s| s.to_string()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_choose_template_empty() {
        let mut rng = WordRng::new(1);
        assert_eq!(choose_template(&BTreeMap::new(), &mut rng), None);
    }

    #[test]
    fn test_choose_template_zero_weights_uniform() {
        let mut rng = WordRng::new(11);
        let shapes: BTreeMap<String, f64> =
            [("CV".to_string(), 0.0), ("VC".to_string(), 0.0)].into_iter().collect();
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..100 {
            seen.insert(choose_template(&shapes, &mut rng).unwrap());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_choose_template_ignores_zero_weight_when_others_positive() {
        let mut rng = WordRng::new(13);
        let shapes: BTreeMap<String, f64> =
            [("CV".to_string(), 0.0), ("VC".to_string(), 2.0)].into_iter().collect();
        for _ in 0..100 {
            assert_eq!(choose_template(&shapes, &mut rng), Some("VC"));
        }
    }

    #[test]
    fn test_fill_shape_draws_from_slot_pools() {
        let mut rng = WordRng::new(21);
        let mut pools = BTreeMap::new();
        pools.insert("C".to_string(), pool(&[("t", 1.0), ("k", 1.0)]));
        pools.insert("V".to_string(), pool(&[("a", 1.0)]));
        for _ in 0..50 {
            let word = fill_shape("CV", &pools, &mut rng).unwrap();
            assert!(word == "ta" || word == "ka", "unexpected word {word}");
        }
    }

    #[test]
    fn test_fill_shape_uses_any_pool() {
        let mut rng = WordRng::new(2);
        let mut pools = BTreeMap::new();
        pools.insert(ANY_POOL.to_string(), pool(&[("q", 1.0)]));
        assert_eq!(fill_shape("CVX", &pools, &mut rng).as_deref(), Some("qqq"));
    }

    #[test]
    fn test_fill_shape_fails_on_empty_slot() {
        let mut rng = WordRng::new(2);
        let mut pools = BTreeMap::new();
        pools.insert("C".to_string(), pool(&[("t", 1.0)]));
        assert_eq!(fill_shape("CV", &pools, &mut rng), None);
    }

    #[test]
    fn test_fill_shape_sums_slot_and_any_weights() {
        let mut rng = WordRng::new(99);
        let mut pools = BTreeMap::new();
        pools.insert("C".to_string(), pool(&[("t", 1.0), ("k", 1.0)]));
        pools.insert(ANY_POOL.to_string(), pool(&[("t", 6.0)]));
        let n = 4000;
        let t_count = (0..n)
            .filter(|_| fill_shape("C", &pools, &mut rng).as_deref() == Some("t"))
            .count();
        // t carries 7 of 8 weight units.
        let share = t_count as f64 / n as f64;
        assert!((0.84..0.91).contains(&share), "got {:.1}%", share * 100.0);
    }

    #[test]
    fn test_fill_shape_deterministic() {
        let mut pools = BTreeMap::new();
        pools.insert("C".to_string(), pool(&[("t", 1.0), ("k", 2.0), ("s", 0.5)]));
        pools.insert("V".to_string(), pool(&[("a", 1.0), ("o", 3.0)]));
        let mut a = WordRng::new(8);
        let mut b = WordRng::new(8);
        for _ in 0..20 {
            assert_eq!(
                fill_shape("CVCV", &pools, &mut a),
                fill_shape("CVCV", &pools, &mut b)
            );
        }
    }
}
