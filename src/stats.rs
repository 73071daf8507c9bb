use crate::model::{ScaleDescriptor, ScaleKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Default rule deciding whether a statistic column is probability-like.
/// Matches names such as "pvalue", "p-val", "q val", "Qvalue". The p/q
/// naming is a data convention, so callers may pass their own pattern to
/// [`classify_statistic`] instead of this one.
pub static PROBABILITY_STAT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[pq][\s-]?val").expect("built-in pattern is valid"));

/// Joint Shannon entropy of the token distribution observed at `positions`
/// in a position-major matrix.
///
/// Counts the distinct token combinations among the first
/// min(`group_size`, available) entries and forms probabilities as
/// count / `group_size`. With a single position this is the per-site
/// entropy used for the navigation chart; a site where every sequence
/// carries the same token yields exactly 0.0.
pub fn joint_entropy(positions: &[usize], matrix: &[Vec<char>], group_size: usize) -> f64 {
    if group_size == 0 || positions.is_empty() {
        return 0.0;
    }
    let available = positions
        .iter()
        .map(|&p| matrix.get(p).map_or(0, |row| row.len()))
        .min()
        .unwrap_or(0);
    let take = available.min(group_size);

    let mut counts: HashMap<String, usize> = HashMap::new();
    for j in 0..take {
        let key: String = positions.iter().map(|&p| matrix[p][j]).collect();
        *counts.entry(key).or_insert(0) += 1;
    }

    let n = group_size as f64;
    let h: f64 = counts
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            -(p * p.log2())
        })
        .sum();
    // clamp away the -0.0 an empty or single-token sum produces
    // (max alone keeps the zero's sign, so add +0.0 to normalize it)
    h.max(0.0) + 0.0
}

/// Round to two decimals for display, as the navigation chart expects.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Classify a statistic column name with the given probability pattern.
pub fn classify_statistic(name: &str, pattern: &Regex) -> ScaleKind {
    if pattern.is_match(name) {
        ScaleKind::Probability
    } else {
        ScaleKind::Linear
    }
}

/// Numeric domain for one statistic. Probability-like statistics are
/// bounded above by 1.0 and anchored at the smallest observed value;
/// everything else spans the observed range.
pub fn scale_descriptor(kind: ScaleKind, values: &[f64]) -> ScaleDescriptor {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let domain = match kind {
        ScaleKind::Probability => {
            if values.is_empty() {
                (0.0, 1.0)
            } else {
                (min, 1.0)
            }
        }
        ScaleKind::Linear => {
            if values.is_empty() {
                (0.0, 0.0)
            } else {
                (min, max)
            }
        }
    };
    ScaleDescriptor { kind, domain }
}
