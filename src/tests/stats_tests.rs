use crate::model::{transpose, ScaleKind};
use crate::stats::{
    classify_statistic, joint_entropy, round2, scale_descriptor, PROBABILITY_STAT_PATTERN,
};

#[test]
fn test_entropy_uniform_site_is_zero() {
    // every sequence carries the same token
    let matrix = vec![vec!['A', 'A', 'A', 'A']];
    assert_eq!(joint_entropy(&[0], &matrix, 4), 0.0);
    // and the value is +0.0, not -0.0
    assert!(joint_entropy(&[0], &matrix, 4).is_sign_positive());
}

#[test]
fn test_entropy_even_split_is_one_bit() {
    let matrix = vec![vec!['A', 'G', 'A', 'G']];
    assert!((joint_entropy(&[0], &matrix, 4) - 1.0).abs() < 1e-12);
}

#[test]
fn test_entropy_three_way_split() {
    // p = 1/3 each over 3 tokens: H = log2(3)
    let matrix = vec![vec!['A', 'C', 'G']];
    let expected = 3f64.log2();
    assert!((joint_entropy(&[0], &matrix, 3) - expected).abs() < 1e-12);
}

#[test]
fn test_entropy_counts_only_group_size_entries() {
    // group size 2: the third entry is beyond min(N, available) and is
    // never counted, so the distribution is A:1, B:1 over N=2
    let matrix = vec![vec!['A', 'B', 'B']];
    assert!((joint_entropy(&[0], &matrix, 2) - 1.0).abs() < 1e-12);
}

#[test]
fn test_entropy_empty_group_and_empty_positions() {
    let matrix: Vec<Vec<char>> = vec![vec!['A', 'C']];
    assert_eq!(joint_entropy(&[0], &matrix, 0), 0.0);
    assert_eq!(joint_entropy(&[], &matrix, 2), 0.0);
}

#[test]
fn test_joint_entropy_over_two_positions() {
    // pairs across positions: AA, AC, AA, AC -> two combos, evenly split
    let matrix = vec![vec!['A', 'A', 'A', 'A'], vec!['A', 'C', 'A', 'C']];
    assert!((joint_entropy(&[0, 1], &matrix, 4) - 1.0).abs() < 1e-12);
}

#[test]
fn test_round2() {
    assert_eq!(round2(1.0), 1.0);
    assert_eq!(round2(0.125), 0.13);
    assert_eq!(round2(1.584962500721156), 1.58);
    assert_eq!(round2(0.0), 0.0);
}

#[test]
fn test_transpose_round_trip() {
    let matrix = vec![
        vec!['A', 'C', 'D'],
        vec!['A', 'C', '-'],
        vec!['G', 'C', 'D'],
    ];
    let transposed = transpose(&matrix);
    assert_eq!(transposed.len(), 3);
    assert_eq!(transposed[0], vec!['A', 'A', 'G']);
    assert_eq!(transpose(&transposed), matrix);
}

#[test]
fn test_transpose_empty() {
    let matrix: Vec<Vec<char>> = Vec::new();
    assert!(transpose(&matrix).is_empty());
}

#[test]
fn test_transpose_single_row() {
    let matrix = vec![vec![1, 2, 3]];
    assert_eq!(transpose(&matrix), vec![vec![1], vec![2], vec![3]]);
}

#[test]
fn test_probability_name_classification() {
    for name in ["pvalue", "q-val", "Pval", "qvalue", "p value", "P-VALUE"] {
        assert_eq!(
            classify_statistic(name, &PROBABILITY_STAT_PATTERN),
            ScaleKind::Probability,
            "'{}' should be probability-like",
            name
        );
    }
    for name in ["sieve_statistic", "vacDist", "placDist", "tstat", "value_p"] {
        assert_eq!(
            classify_statistic(name, &PROBABILITY_STAT_PATTERN),
            ScaleKind::Linear,
            "'{}' should be generic",
            name
        );
    }
}

#[test]
fn test_custom_classification_pattern() {
    let pattern = regex::Regex::new(r"^fdr").unwrap();
    assert_eq!(classify_statistic("fdr_adj", &pattern), ScaleKind::Probability);
    assert_eq!(classify_statistic("pvalue", &pattern), ScaleKind::Linear);
}

#[test]
fn test_scale_domains() {
    let probability = scale_descriptor(ScaleKind::Probability, &[0.5, 0.04, 0.9]);
    assert_eq!(probability.domain, (0.04, 1.0));

    let linear = scale_descriptor(ScaleKind::Linear, &[1.2, 2.5, 0.3]);
    assert_eq!(linear.domain, (0.3, 2.5));

    // degenerate inputs keep usable domains
    assert_eq!(
        scale_descriptor(ScaleKind::Probability, &[]).domain,
        (0.0, 1.0)
    );
    assert_eq!(scale_descriptor(ScaleKind::Linear, &[]).domain, (0.0, 0.0));
}
