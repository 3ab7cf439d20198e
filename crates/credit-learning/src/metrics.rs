//! Ranking metrics for default scoring.
//!
//! All three metrics look only at how scores order the rows, so they are
//! unaffected by calibration. Each needs both classes present in `labels`.

use crate::trainer::ModelScores;
use credit_processing::config::TopK;
use credit_processing::error::{PipelineError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const METRICS: &str = "metrics";

/// Evaluation result for one model; one row of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub model_name: String,
    pub roc_auc: f64,
    pub pr_auc: f64,
    pub topk_capture: f64,
}

/// Class counts after validating that labels and scores line up.
fn class_counts(labels: &[u8], scores: &[f64]) -> Result<(usize, usize)> {
    if labels.len() != scores.len() {
        return Err(PipelineError::numerical(
            METRICS,
            format!("{} labels but {} scores", labels.len(), scores.len()),
        ));
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(PipelineError::numerical(METRICS, "scores contain non-finite values"));
    }
    if labels.iter().any(|&l| l > 1) {
        return Err(PipelineError::numerical(METRICS, "labels must be 0 or 1"));
    }

    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(PipelineError::numerical(
            METRICS,
            format!(
                "labels contain a single class ({} positive, {} negative)",
                positives, negatives
            ),
        ));
    }
    Ok((positives, negatives))
}

/// Row indices ordered by descending score; equal scores keep row order.
fn descending_order(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| match scores[b].total_cmp(&scores[a]) {
        Ordering::Equal => a.cmp(&b),
        other => other,
    });
    order
}

/// Area under the ROC curve.
///
/// Computed as the Mann-Whitney U statistic: the probability that a random
/// positive scores above a random negative, counting ties as one half.
///
/// ```
/// use credit_learning::metrics::roc_auc;
///
/// let labels = [0, 0, 1, 1];
/// assert_eq!(roc_auc(&labels, &[0.1, 0.2, 0.8, 0.9]).unwrap(), 1.0);
/// assert_eq!(roc_auc(&labels, &[0.5; 4]).unwrap(), 0.5);
/// ```
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Result<f64> {
    let (positives, negatives) = class_counts(labels, scores)?;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Ranks are 1-based; a run of tied scores shares the mean of its ranks.
    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        let tied_positives = order[start..end].iter().filter(|&&i| labels[i] == 1).count();
        positive_rank_sum += mean_rank * tied_positives as f64;
        start = end;
    }

    let p = positives as f64;
    let u = positive_rank_sum - p * (p + 1.0) / 2.0;
    Ok(u / (p * negatives as f64))
}

/// Area under the precision-recall curve, as average precision.
///
/// Precision is taken at each distinct score threshold and weighted by the
/// recall gained there; tied scores form a single threshold.
pub fn pr_auc(labels: &[u8], scores: &[f64]) -> Result<f64> {
    let (positives, _) = class_counts(labels, scores)?;
    let order = descending_order(scores);

    let mut true_pos = 0usize;
    let mut seen = 0usize;
    let mut area = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        let group_pos = order[start..end].iter().filter(|&&i| labels[i] == 1).count();
        true_pos += group_pos;
        seen += end - start;
        if group_pos > 0 {
            let precision = true_pos as f64 / seen as f64;
            area += precision * group_pos as f64 / positives as f64;
        }
        start = end;
    }

    Ok(area)
}

/// Share of all positives found among the `k` highest scores.
///
/// `k` is clamped to `[1, labels.len()]`. Ties at the cutoff are broken by
/// row order.
pub fn top_k_capture(labels: &[u8], scores: &[f64], k: usize) -> Result<f64> {
    let (positives, _) = class_counts(labels, scores)?;
    let k = k.clamp(1, labels.len());

    let captured = descending_order(scores)
        .into_iter()
        .take(k)
        .filter(|&i| labels[i] == 1)
        .count();
    Ok(captured as f64 / positives as f64)
}

/// Compute all three metrics for one model's evaluation scores.
pub fn evaluate(scores: &ModelScores, top_k: TopK) -> Result<MetricRecord> {
    let context = || format!("While scoring {}", scores.model_name);
    let k = top_k.resolve(scores.labels.len());

    Ok(MetricRecord {
        model_name: scores.model_name.clone(),
        roc_auc: roc_auc(&scores.labels, &scores.scores).context(context())?,
        pr_auc: pr_auc(&scores.labels, &scores.scores).context(context())?,
        topk_capture: top_k_capture(&scores.labels, &scores.scores, k).context(context())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_roc_auc_extremes() {
        let labels = [0, 0, 1, 1, 0, 1];
        let perfect = [0.1, 0.2, 0.8, 0.9, 0.3, 0.7];
        let reversed: Vec<f64> = perfect.iter().map(|s| 1.0 - s).collect();

        assert_eq!(roc_auc(&labels, &perfect).unwrap(), 1.0);
        assert_eq!(roc_auc(&labels, &reversed).unwrap(), 0.0);
        assert_eq!(roc_auc(&labels, &[0.4; 6]).unwrap(), 0.5);
    }

    #[test]
    fn test_roc_auc_partial_ties() {
        // Pairs: (p=0.8 vs n=0.8) tie, (p=0.8 vs n=0.2) win,
        //        (p=0.5 vs n=0.8) loss, (p=0.5 vs n=0.2) win.
        let labels = [1, 1, 0, 0];
        let scores = [0.8, 0.5, 0.8, 0.2];
        assert!(approx(roc_auc(&labels, &scores).unwrap(), 2.5 / 4.0));
    }

    #[test]
    fn test_pr_auc_perfect_and_known_value() {
        let labels = [1, 0, 1, 0];
        assert_eq!(pr_auc(&labels, &[0.9, 0.1, 0.8, 0.2]).unwrap(), 1.0);

        // Ranking 1, 0, 1, 0: AP = (1/1 + 2/3) / 2
        let ap = pr_auc(&labels, &[0.9, 0.8, 0.7, 0.6]).unwrap();
        assert!(approx(ap, (1.0 + 2.0 / 3.0) / 2.0));
    }

    #[test]
    fn test_pr_auc_all_tied_is_prevalence() {
        let labels = [1, 0, 0, 0];
        assert!(approx(pr_auc(&labels, &[0.3; 4]).unwrap(), 0.25));
    }

    #[test]
    fn test_top_k_capture() {
        let labels = [1, 0, 1, 0, 0, 1];
        let scores = [0.9, 0.8, 0.7, 0.1, 0.2, 0.05];
        assert!(approx(top_k_capture(&labels, &scores, 1).unwrap(), 1.0 / 3.0));
        assert!(approx(top_k_capture(&labels, &scores, 3).unwrap(), 2.0 / 3.0));
        assert_eq!(top_k_capture(&labels, &scores, 100).unwrap(), 1.0);
        assert!(approx(top_k_capture(&labels, &scores, 0).unwrap(), 1.0 / 3.0));
    }

    #[test]
    fn test_single_class_is_numerical_error() {
        let labels = [0, 0, 0];
        let scores = [0.1, 0.2, 0.3];
        for result in [
            roc_auc(&labels, &scores),
            pr_auc(&labels, &scores),
            top_k_capture(&labels, &scores, 1),
        ] {
            assert!(matches!(result, Err(PipelineError::Numerical { .. })));
        }
    }

    #[test]
    fn test_length_mismatch() {
        assert!(roc_auc(&[0, 1], &[0.5]).is_err());
    }

    #[test]
    fn test_evaluate_names_model_and_stays_in_unit_range() {
        let scores = ModelScores {
            model_name: "logistic_regression".to_string(),
            labels: vec![0, 1, 0, 1, 0, 0, 0, 0, 0, 1],
            scores: vec![0.1, 0.7, 0.3, 0.6, 0.2, 0.4, 0.8, 0.1, 0.3, 0.5],
        };
        let record = evaluate(&scores, TopK::Fraction(0.2)).unwrap();

        assert_eq!(record.model_name, "logistic_regression");
        for value in [record.roc_auc, record.pr_auc, record.topk_capture] {
            assert!((0.0..=1.0).contains(&value));
        }
        // Top 2 rows are 0.8 (negative) and 0.7 (positive).
        assert!(approx(record.topk_capture, 1.0 / 3.0));
    }

    #[test]
    fn test_evaluate_error_carries_model_name() {
        let scores = ModelScores {
            model_name: "random_forest".to_string(),
            labels: vec![0, 0],
            scores: vec![0.1, 0.2],
        };
        let err = evaluate(&scores, TopK::Count(1)).unwrap_err();
        assert!(err.to_string().contains("random_forest"));
        assert_eq!(err.error_code(), "NUMERICAL_ERROR");
    }
}
