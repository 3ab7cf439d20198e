//! CART decision tree for binary labels.
//!
//! Splits minimise the weighted Gini impurity of the two children. Leaves
//! store the share of positive training rows that reached them, which is
//! the tree's probability estimate.

use super::{Classifier, check_training_data, not_fitted};
use credit_processing::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;

const DECISION_TREE: &str = "decision_tree";

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        positive_rate: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Gini impurity of a binary node with `positives` of `total` rows labelled 1.
///
/// `1 - p² - (1-p)²`; zero for a pure or empty node.
pub fn gini_impurity(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

/// Row-weighted Gini impurity of a candidate split.
pub fn gini_split(left_pos: usize, left_total: usize, right_pos: usize, right_total: usize) -> f64 {
    let total = (left_total + right_total) as f64;
    if total == 0.0 {
        return 0.0;
    }
    (left_total as f64 * gini_impurity(left_pos, left_total)
        + right_total as f64 * gini_impurity(right_pos, right_total))
        / total
}

/// A single CART tree.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    max_depth: usize,
    min_samples_leaf: usize,
    max_features: Option<usize>,
    seed: u64,
    nodes: Vec<Node>,
    n_features: usize,
}

impl DecisionTree {
    pub fn new(max_depth: usize, min_samples_leaf: usize) -> Self {
        Self {
            max_depth,
            min_samples_leaf: min_samples_leaf.max(1),
            max_features: None,
            seed: 0,
            nodes: Vec::new(),
            n_features: 0,
        }
    }

    /// Try only `max_features` randomly chosen features at each split.
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Seed for feature sampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of nodes in the fitted tree.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the fitted tree (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Fit on the given rows of `x`. Rows may repeat (bootstrap samples).
    ///
    /// The caller guarantees that `rows` is non-empty and in range.
    pub(crate) fn fit_rows(&mut self, x: &Array2<f64>, y: &[u8], rows: Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.nodes.clear();
        self.n_features = x.ncols();
        self.grow(x, y, rows, 0, &mut rng);
    }

    fn features_per_split(&self, n_features: usize) -> usize {
        self.max_features
            .unwrap_or(n_features)
            .clamp(1, n_features.max(1))
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn grow(
        &mut self,
        x: &Array2<f64>,
        y: &[u8],
        rows: Vec<usize>,
        depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let total = rows.len();
        let positives = rows.iter().filter(|&&i| y[i] == 1).count();
        let positive_rate = if total == 0 {
            0.0
        } else {
            positives as f64 / total as f64
        };

        let is_pure = positives == 0 || positives == total;
        if depth >= self.max_depth || is_pure || total < 2 * self.min_samples_leaf {
            return self.push(Node::Leaf { positive_rate });
        }

        let n_features = x.ncols();
        let candidates = index::sample(rng, n_features, self.features_per_split(n_features)).into_vec();
        let Some((feature, threshold)) = self.best_split(x, y, &rows, positives, &candidates)
        else {
            return self.push(Node::Leaf { positive_rate });
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&i| x[[i, feature]] <= threshold);

        let idx = self.push(Node::Leaf { positive_rate });
        let left = self.grow(x, y, left_rows, depth + 1, rng);
        let right = self.grow(x, y, right_rows, depth + 1, rng);
        self.nodes[idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        idx
    }

    /// Best `(feature, threshold)` among `candidates`, or `None` when no
    /// split lowers the impurity while keeping `min_samples_leaf` rows on
    /// each side.
    fn best_split(
        &self,
        x: &Array2<f64>,
        y: &[u8],
        rows: &[usize],
        positives: usize,
        candidates: &[usize],
    ) -> Option<(usize, f64)> {
        let total = rows.len();
        let parent = gini_impurity(positives, total);
        let mut best: Option<(usize, f64, f64)> = None;

        let mut sorted = rows.to_vec();
        for &feature in candidates {
            sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

            let mut left_pos = 0;
            for cut in 1..total {
                left_pos += usize::from(y[sorted[cut - 1]] == 1);
                let left_total = cut;
                let right_total = total - cut;
                if left_total < self.min_samples_leaf || right_total < self.min_samples_leaf {
                    continue;
                }

                let lo = x[[sorted[cut - 1], feature]];
                let hi = x[[sorted[cut], feature]];
                if lo >= hi {
                    continue;
                }

                let impurity = gini_split(left_pos, left_total, positives - left_pos, right_total);
                if impurity < parent && best.is_none_or(|(_, _, b)| impurity < b) {
                    let mid = lo + (hi - lo) / 2.0;
                    let threshold = if mid < hi { mid } else { lo };
                    best = Some((feature, threshold, impurity));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { positive_rate } => return positive_rate,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    /// Score rows of `x`; the tree must be fitted and the width must match.
    pub(crate) fn predict_rows(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.nodes.is_empty() {
            return Err(not_fitted(DECISION_TREE));
        }
        if x.ncols() != self.n_features {
            return Err(PipelineError::numerical(
                DECISION_TREE,
                format!("expected {} features, got {}", self.n_features, x.ncols()),
            ));
        }
        Ok(x.rows().into_iter().map(|row| self.predict_row(row)).collect())
    }
}

impl Classifier for DecisionTree {
    fn name(&self) -> &'static str {
        DECISION_TREE
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        check_training_data(DECISION_TREE, x, y)?;
        self.fit_rows(x, y, (0..y.len()).collect());
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.predict_rows(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_gini_impurity() {
        assert_eq!(gini_impurity(0, 10), 0.0);
        assert_eq!(gini_impurity(10, 10), 0.0);
        assert_eq!(gini_impurity(5, 10), 0.5);
        assert_eq!(gini_impurity(0, 0), 0.0);
    }

    #[test]
    fn test_gini_split_perfect() {
        assert_eq!(gini_split(0, 4, 4, 4), 0.0);
        assert_eq!(gini_split(2, 4, 2, 4), 0.5);
    }

    #[test]
    fn test_tree_learns_threshold() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [10.0], [11.0], [12.0], [13.0]];
        let y = [0, 0, 0, 0, 1, 1, 1, 1];
        let mut tree = DecisionTree::new(3, 1);
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.depth(), 1);
        let probas = tree.predict_proba(&array![[0.0], [7.0], [8.0], [20.0]]).unwrap();
        assert_eq!(probas.to_vec(), vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_max_depth_zero_is_single_leaf() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let mut tree = DecisionTree::new(0, 1);
        tree.fit(&x, &[0, 1, 0, 1]).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_proba(&x).unwrap()[0], 0.5);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = [1, 0, 0, 0, 0, 0];
        let mut tree = DecisionTree::new(5, 3);
        tree.fit(&x, &y).unwrap();

        // The only split that isolates the positive row would leave 1 row.
        let probas = tree.predict_proba(&x).unwrap();
        assert!(probas[0] < 1.0);
        assert!(probas.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_constant_feature_gives_leaf() {
        let x = array![[5.0], [5.0], [5.0], [5.0]];
        let mut tree = DecisionTree::new(4, 1);
        tree.fit(&x, &[0, 1, 0, 1]).unwrap();
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_predict_width_mismatch() {
        let x = array![[1.0], [2.0]];
        let mut tree = DecisionTree::new(2, 1);
        tree.fit(&x, &[0, 1]).unwrap();
        assert!(tree.predict_proba(&array![[1.0, 2.0]]).is_err());
    }
}
