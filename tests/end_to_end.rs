//! End-to-end scenarios exercising the public API surface: train, predict,
//! save/load, and the learning-curve dump.

use extraboost::{
    DenseMatrix, LossKind, MonitorDataset, TrainConfig, TrainingMatrix,
};

fn step_dataset(n: usize) -> TrainingMatrix {
    let inter = DenseMatrix::from_rows(n, 1, (0..n).map(|i| i as f64).collect()).unwrap();
    let extra = DenseMatrix::from_rows(n, 1, vec![1.0; n]).unwrap();
    let target: Vec<f64> = (0..n).map(|i| if i < n / 2 { 0.0 } else { 10.0 }).collect();
    TrainingMatrix::new(inter, extra, target).unwrap()
}

#[test]
fn single_stump_separates_a_step_function() {
    let data = step_dataset(20);
    let config = TrainConfig::builder()
        .n_stages(1)
        .max_depth(1)
        .learning_rate(1.0)
        .build()
        .unwrap();

    let handle = extraboost::train(&config, &data, &[]).unwrap();
    let low = handle.ensemble().unwrap().predict_row(&[2.0], &[1.0], None);
    let high = handle.ensemble().unwrap().predict_row(&[17.0], &[1.0], None);
    assert!(high - low > 5.0);
}

#[test]
fn additional_stages_monotonically_improve_training_rmse() {
    let data = step_dataset(30);
    let config = TrainConfig::builder()
        .n_stages(4)
        .max_depth(2)
        .learning_rate(0.6)
        .build()
        .unwrap();

    let handle = extraboost::train(&config, &data, &[]).unwrap();
    let rmses: Vec<f64> = handle
        .history
        .iter()
        .filter(|r| r.dataset == "train")
        .map(|r| r.value)
        .collect();
    for pair in rmses.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-9);
    }
}

#[test]
fn extra_feature_basis_fits_a_linear_trend_within_a_leaf() {
    let n = 20;
    let inter = DenseMatrix::from_rows(n, 1, vec![0.0; n]).unwrap(); // single node, no split possible
    let mut extra_data = Vec::with_capacity(n * 2);
    let mut target = Vec::with_capacity(n);
    for k in 0..n {
        let t = k as f64 / (n - 1) as f64;
        extra_data.push(1.0);
        extra_data.push(t);
        target.push(0.2 + 0.5 * t);
    }
    let extra = DenseMatrix::from_rows(n, 2, extra_data).unwrap();
    let data = TrainingMatrix::new(inter, extra, target).unwrap();

    let config = TrainConfig::builder()
        .n_stages(1)
        .learning_rate(1.0)
        .reg_lambda(1e-6)
        .build()
        .unwrap();

    let handle = extraboost::train(&config, &data, &[]).unwrap();
    let p0 = handle.ensemble().unwrap().predict_row(&[0.0], &[1.0, 0.0], None);
    let p1 = handle.ensemble().unwrap().predict_row(&[0.0], &[1.0, 1.0], None);
    assert!((p0 - 0.2).abs() < 1e-3);
    assert!((p1 - 0.7).abs() < 1e-3);
}

#[test]
fn logloss_base_prediction_matches_the_training_class_balance() {
    let inter = DenseMatrix::from_rows(8, 1, (0..8).map(|i| i as f64).collect()).unwrap();
    let extra = DenseMatrix::from_rows(8, 1, vec![1.0; 8]).unwrap();
    let target = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
    let data = TrainingMatrix::new(inter, extra, target).unwrap();

    let config = TrainConfig::builder()
        .n_stages(1)
        .loss(LossKind::LogLoss)
        .build()
        .unwrap();

    let handle = extraboost::train(&config, &data, &[]).unwrap();
    assert!((handle.ensemble().unwrap().base_prediction).abs() < 1e-9);
}

#[test]
fn monitor_dataset_metrics_are_recorded_every_stage() {
    let data = step_dataset(16);
    let monitor = MonitorDataset::new("holdout", step_dataset(16));
    let config = TrainConfig::builder().n_stages(3).build().unwrap();

    let handle = extraboost::train(&config, &data, std::slice::from_ref(&monitor)).unwrap();
    let holdout_entries = handle.history.iter().filter(|r| r.dataset == "holdout").count();
    assert_eq!(holdout_entries, 3);
}

#[test]
fn tree_limit_truncates_predictions_to_fewer_stages() {
    let data = step_dataset(20);
    let config = TrainConfig::builder()
        .n_stages(5)
        .max_depth(2)
        .learning_rate(0.5)
        .build()
        .unwrap();

    let handle = extraboost::train(&config, &data, &[]).unwrap();
    let full = handle.ensemble().unwrap().predict_row(&[18.0], &[1.0], None);
    let truncated = handle.ensemble().unwrap().predict_row(&[18.0], &[1.0], Some(1));
    assert_ne!(full, truncated);
}

#[test]
fn persisted_model_round_trips_predictions() {
    let data = step_dataset(16);
    let config = TrainConfig::builder().n_stages(2).max_depth(2).build().unwrap();
    let handle = extraboost::train(&config, &data, &[]).unwrap();

    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("extraboost-e2e-{nanos}"));
    std::fs::create_dir_all(&dir).unwrap();
    let model_path = dir.join("model.bin");
    let curves_path = dir.join("curves.json");

    extraboost::save(&handle, &model_path).unwrap();
    extraboost::dump_learning_curves(&handle.history, &curves_path).unwrap();
    let loaded = extraboost::load(&model_path).unwrap();

    for i in 0..16 {
        let row = vec![i as f64];
        let extra_row = vec![1.0];
        let before = extraboost::predict(handle.ensemble().unwrap(), &DenseMatrix::from_rows(1, 1, row.clone()).unwrap(), &DenseMatrix::from_rows(1, 1, extra_row.clone()).unwrap(), None).unwrap();
        let after = extraboost::predict(&loaded, &DenseMatrix::from_rows(1, 1, row).unwrap(), &DenseMatrix::from_rows(1, 1, extra_row).unwrap(), None).unwrap();
        assert!((before[0] - after[0]).abs() < 1e-9);
    }

    assert!(curves_path.exists());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn predicting_with_the_wrong_extra_dimension_is_a_shape_mismatch() {
    let data = step_dataset(10);
    let config = TrainConfig::builder().n_stages(1).build().unwrap();
    let handle = extraboost::train(&config, &data, &[]).unwrap();

    let inter = DenseMatrix::from_rows(2, 1, vec![0.0, 1.0]).unwrap();
    let wrong_extra = DenseMatrix::from_rows(2, 2, vec![1.0, 0.0, 1.0, 1.0]).unwrap();
    let err = extraboost::predict(handle.ensemble().unwrap(), &inter, &wrong_extra, None);
    assert!(err.is_err());
}

#[test]
fn closing_a_handle_detaches_its_ensemble() {
    let data = step_dataset(12);
    let config = TrainConfig::builder().n_stages(1).build().unwrap();
    let mut handle = extraboost::train(&config, &data, &[]).unwrap();

    let ensemble = handle.close().expect("handle was open");
    assert_eq!(ensemble.num_trees(), 1);
    assert!(handle.ensemble().is_err());
    assert!(handle.predict(&data.inter, &data.extra, None).is_err());
}
