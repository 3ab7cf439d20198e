//! End-to-end tests: raw CSV in, metric report out.

use credit_learning::{
    LOGISTIC_REGRESSION, RANDOM_FOREST, TrainerConfig, read_report, run_pipeline, run_training,
};
use credit_processing::{ProjectConfig, run_preprocessing};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

// ============================================================================
// Helper Functions
// ============================================================================

/// Synthetic raw table in the source layout: 1,000 rows, 50 defaults,
/// balances in [0, 100000), salaries in [20000, 200000), boolean employment.
fn write_synthetic_raw(path: &Path, positives: usize) {
    let n = 1000;
    let mut rng = StdRng::seed_from_u64(2024);

    let mut balances: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..100_000.0)).collect();
    balances.sort_by(f64::total_cmp);
    // Defaults lean towards the largest balances so the models have signal.
    let mut candidates: Vec<usize> = (n / 2..n).collect();
    candidates.shuffle(&mut rng);
    let defaulted: Vec<usize> = candidates.into_iter().take(positives).collect();

    let mut rows: Vec<usize> = (0..n).collect();
    rows.shuffle(&mut rng);

    let mut csv = String::from("Index,Employed,Bank Balance,Annual Salary,Defaulted?\n");
    for (index, &i) in rows.iter().enumerate() {
        let employed = rng.gen_bool(0.7);
        let salary = rng.gen_range(20_000.0..200_000.0);
        let label = u8::from(defaulted.contains(&i));
        writeln!(
            csv,
            "{},{},{:.2},{:.2},{}",
            index + 1,
            employed,
            balances[i],
            salary,
            label
        )
        .unwrap();
    }

    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, csv).unwrap();
}

fn project(root: &Path) -> ProjectConfig {
    ProjectConfig::builder()
        .raw_data_path(root.join("data/raw"))
        .processed_data_path(root.join("data/processed/credit_default_processed.csv"))
        .report_path(root.join("reports/metrics.csv"))
        .build()
        .unwrap()
}

fn fast_trainer(project: &ProjectConfig) -> TrainerConfig {
    TrainerConfig::builder()
        .project(project)
        .n_trees(30)
        .build()
        .unwrap()
}

// ============================================================================
// Full Pipeline
// ============================================================================

#[test]
fn test_end_to_end_report_has_both_models() {
    let root = tempfile::tempdir().unwrap();
    write_synthetic_raw(&root.path().join("data/raw/customers.csv"), 50);
    let project = project(root.path());

    let run = run_pipeline(&project, &fast_trainer(&project)).unwrap();
    assert_eq!(run.preprocess.rows_after, 1000);
    assert_eq!(run.preprocess.positive_count, 50);

    let report = read_report(&project.paths.report_path).unwrap();
    let names: Vec<&str> = report.iter().map(|r| r.model_name.as_str()).collect();
    assert_eq!(names, vec![LOGISTIC_REGRESSION, RANDOM_FOREST]);
    assert_eq!(report, run.metrics);

    for record in &report {
        for value in [record.roc_auc, record.pr_auc, record.topk_capture] {
            assert!((0.0..=1.0).contains(&value), "{}: {}", record.model_name, value);
        }
    }

    let header = fs::read_to_string(&project.paths.report_path).unwrap();
    assert!(header.starts_with("model_name,roc_auc,pr_auc,topk_capture\n"));
}

#[test]
fn test_end_to_end_is_deterministic() {
    let root = tempfile::tempdir().unwrap();
    write_synthetic_raw(&root.path().join("data/raw/customers.csv"), 50);
    let project = project(root.path());
    let trainer = fast_trainer(&project);

    let first = run_pipeline(&project, &trainer).unwrap().metrics;
    let second = run_pipeline(&project, &trainer).unwrap().metrics;
    assert_eq!(first, second);
}

#[test]
fn test_train_stage_reads_processed_file() {
    let root = tempfile::tempdir().unwrap();
    write_synthetic_raw(&root.path().join("data/raw/customers.csv"), 50);
    let project = project(root.path());
    let trainer = fast_trainer(&project);

    run_preprocessing(&project).unwrap();
    assert!(!project.paths.report_path.exists());

    let from_file = run_training(&project, &trainer).unwrap();
    let in_memory = run_pipeline(&project, &trainer).unwrap().metrics;
    assert_eq!(from_file.len(), 2);
    for (a, b) in from_file.iter().zip(&in_memory) {
        assert_eq!(a.model_name, b.model_name);
        assert!((a.roc_auc - b.roc_auc).abs() < 1e-9);
    }
}

#[test]
fn test_signal_is_learned() {
    let root = tempfile::tempdir().unwrap();
    write_synthetic_raw(&root.path().join("data/raw/customers.csv"), 50);
    let project = project(root.path());

    let run = run_pipeline(&project, &fast_trainer(&project)).unwrap();
    for record in &run.metrics {
        assert!(record.roc_auc > 0.5, "{} roc_auc {}", record.model_name, record.roc_auc);
    }
}

// ============================================================================
// Failure Modes
// ============================================================================

#[test]
fn test_all_non_default_is_data_quality_error() {
    let root = tempfile::tempdir().unwrap();
    write_synthetic_raw(&root.path().join("data/raw/customers.csv"), 0);
    let project = project(root.path());

    let err = run_pipeline(&project, &fast_trainer(&project)).unwrap_err();
    assert!(err.is_data_quality_error());
    assert!(!project.paths.report_path.exists());
}

#[test]
fn test_missing_bank_balance_is_schema_error() {
    let root = tempfile::tempdir().unwrap();
    let raw = root.path().join("data/raw/customers.csv");
    fs::create_dir_all(raw.parent().unwrap()).unwrap();
    fs::write(
        &raw,
        "Index,Employed,Annual Salary,Defaulted?\n1,True,50000,0\n2,False,40000,1\n",
    )
    .unwrap();
    let project = project(root.path());

    let err = run_pipeline(&project, &fast_trainer(&project)).unwrap_err();
    assert!(err.is_schema_error());
    assert!(err.to_string().contains("bank_balance"));
}

#[test]
fn test_train_without_processed_file_is_config_error() {
    let root = tempfile::tempdir().unwrap();
    let project = project(root.path());

    let err = run_training(&project, &fast_trainer(&project)).unwrap_err();
    assert!(err.is_config_error());
}
