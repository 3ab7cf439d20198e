//! Fit the baseline models and score the evaluation rows.

use crate::config::TrainerConfig;
use crate::dataset::Dataset;
use crate::models::{Classifier, LogisticRegression, RandomForest};
use crate::split::train_eval_split;
use credit_processing::error::{PipelineError, Result, ResultExt};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Evaluation-row scores of one fitted model, paired with the true labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScores {
    pub model_name: String,
    pub labels: Vec<u8>,
    pub scores: Vec<f64>,
}

/// The baseline models, in report order.
pub fn baseline_models(config: &TrainerConfig) -> Vec<Box<dyn Classifier>> {
    vec![
        Box::new(LogisticRegression::new(config.logistic.clone())),
        Box::new(RandomForest::new(config.forest.clone(), config.random_seed)),
    ]
}

/// Split the feature table, fit every baseline model on the train rows and
/// score the eval rows.
///
/// Models are fitted one after another; the first failure stops the run.
pub fn train_and_score(table: &DataFrame, config: &TrainerConfig) -> Result<Vec<ModelScores>> {
    let dataset = Dataset::from_frame(table)?;
    let split = train_eval_split(
        &dataset.labels,
        config.train_fraction,
        config.random_seed,
        config.stratify,
    )?;
    info!(
        "Training on {} rows, evaluating on {} rows",
        split.train.len(),
        split.eval.len()
    );

    let (x_train, y_train) = dataset.select(&split.train);
    let (x_eval, y_eval) = dataset.select(&split.eval);

    let mut results = Vec::new();
    for mut model in baseline_models(config) {
        let name = model.name();
        let started = Instant::now();

        model
            .fit(&x_train, &y_train)
            .context(format!("While training {}", name))?;
        let scores = model.predict_proba(&x_eval)?.to_vec();
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(PipelineError::numerical(name, "predicted a non-finite score"));
        }

        info!("Trained {} in {:.2?}", name, started.elapsed());
        results.push(ModelScores {
            model_name: name.to_string(),
            labels: y_eval.clone(),
            scores,
        });
    }

    Ok(results)
}
