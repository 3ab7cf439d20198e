//! Random forest of bagged CART trees.

use super::tree::DecisionTree;
use super::{Classifier, RANDOM_FOREST, check_training_data, not_fitted};
use crate::config::ForestParams;
use credit_processing::error::Result;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Random forest classifier.
///
/// Each tree is grown on a bootstrap sample of the training rows and tries
/// a random subset of features at every split. Tree seeds are drawn from a
/// generator seeded with the run seed, so a fixed seed reproduces the
/// forest exactly.
#[derive(Debug, Clone)]
pub struct RandomForest {
    params: ForestParams,
    seed: u64,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(params: ForestParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            trees: Vec::new(),
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn features_per_split(&self, n_features: usize) -> usize {
        let sqrt = (n_features as f64).sqrt().round() as usize;
        self.params
            .max_features
            .unwrap_or(sqrt)
            .clamp(1, n_features.max(1))
    }
}

/// Draw `n` row indices with replacement.
fn bootstrap_sample(n: usize, rng: &mut StdRng) -> Vec<usize> {
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

impl Classifier for RandomForest {
    fn name(&self) -> &'static str {
        RANDOM_FOREST
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        check_training_data(RANDOM_FOREST, x, y)?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let max_features = self.features_per_split(x.ncols());
        self.trees = (0..self.params.n_trees)
            .map(|_| {
                let tree_seed: u64 = rng.r#gen();
                let rows = bootstrap_sample(y.len(), &mut rng);
                let mut tree = DecisionTree::new(self.params.max_depth, self.params.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_seed(tree_seed);
                tree.fit_rows(x, y, rows);
                tree
            })
            .collect();

        debug!(
            "{} fitted {} trees ({} features per split)",
            RANDOM_FOREST,
            self.trees.len(),
            max_features
        );
        Ok(())
    }

    /// Mean of the per-tree leaf positive rates.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(not_fitted(RANDOM_FOREST));
        }

        let mut total = Array1::<f64>::zeros(x.nrows());
        for tree in &self.trees {
            total += &tree.predict_rows(x)?;
        }
        Ok(total / self.trees.len() as f64)
    }
}
