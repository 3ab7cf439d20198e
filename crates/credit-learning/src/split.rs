//! Seeded train/eval split.

use credit_processing::error::{PipelineError, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

/// Row indices of the two halves of a split, each sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub eval: Vec<usize>,
}

/// Partition `0..labels.len()` into train and eval rows.
///
/// With `stratify` each class is shuffled and cut separately so both halves
/// keep the class ratio. The same labels, fraction and seed always give the
/// same membership. Either half being empty is an error.
pub fn train_eval_split(
    labels: &[u8],
    train_fraction: f64,
    seed: u64,
    stratify: bool,
) -> Result<Split> {
    let n = labels.len();
    if n < 2 {
        return Err(PipelineError::DataQuality(format!(
            "need at least 2 rows to split, got {}",
            n
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let (mut train, mut eval) = if stratify {
        let mut train = Vec::new();
        let mut eval = Vec::new();
        for class in [0u8, 1u8] {
            let mut rows: Vec<usize> = (0..n).filter(|&i| labels[i] == class).collect();
            rows.shuffle(&mut rng);
            let cut = train_size(rows.len(), train_fraction);
            eval.extend_from_slice(&rows[cut..]);
            rows.truncate(cut);
            train.extend(rows);
        }
        (train, eval)
    } else {
        let mut rows: Vec<usize> = (0..n).collect();
        rows.shuffle(&mut rng);
        let cut = train_size(n, train_fraction).clamp(1, n - 1);
        let eval = rows.split_off(cut);
        (rows, eval)
    };

    if train.is_empty() || eval.is_empty() {
        return Err(PipelineError::DataQuality(format!(
            "split of {} rows at {} left one side empty",
            n, train_fraction
        )));
    }

    train.sort_unstable();
    eval.sort_unstable();
    debug!("Split {} rows into {} train / {} eval", n, train.len(), eval.len());
    Ok(Split { train, eval })
}

fn train_size(n: usize, train_fraction: f64) -> usize {
    ((n as f64) * train_fraction).round().min(n as f64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn labels(n: usize, every: usize) -> Vec<u8> {
        (0..n).map(|i| u8::from(i % every == 0)).collect()
    }

    #[test]
    fn test_split_deterministic() {
        let y = labels(200, 10);
        let a = train_eval_split(&y, 0.8, 42, true).unwrap();
        let b = train_eval_split(&y, 0.8, 42, true).unwrap();
        assert_eq!(a, b);

        let c = train_eval_split(&y, 0.8, 43, true).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_split_disjoint_and_covering() {
        let y = labels(101, 7);
        for stratify in [true, false] {
            let split = train_eval_split(&y, 0.75, 1, stratify).unwrap();
            let mut all: Vec<usize> = split.train.iter().chain(&split.eval).copied().collect();
            all.sort_unstable();
            assert_eq!(all, (0..101).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_stratified_keeps_class_ratio() {
        let y = labels(1000, 20); // 50 positives
        let split = train_eval_split(&y, 0.8, 42, true).unwrap();

        let train_pos = split.train.iter().filter(|&&i| y[i] == 1).count();
        let eval_pos = split.eval.iter().filter(|&&i| y[i] == 1).count();
        assert_eq!(train_pos, 40);
        assert_eq!(eval_pos, 10);
        assert_eq!(split.train.len(), 800);
    }

    #[test]
    fn test_unstratified_sizes() {
        let y = labels(10, 2);
        let split = train_eval_split(&y, 0.8, 0, false).unwrap();
        assert_eq!(split.train.len(), 8);
        assert_eq!(split.eval.len(), 2);
    }

    #[test]
    fn test_tiny_input_rejected() {
        let err = train_eval_split(&[1], 0.8, 0, false).unwrap_err();
        assert!(err.is_data_quality_error());
    }
}
