use pricecast::application::ml::{
    ClassifierParams, ClassifierRegressor, EnsembleConfig, EnsembleCoordinator, Estimator,
    FeatureMatrixBuilder, FeatureTable, GradientBoostingEstimator, GradientBoostingParams,
    LagWindowBuilder, RandomForestEstimator, RandomForestParams, SequenceParams,
    SequenceRegressor, TargetColumnBuilder,
};
use pricecast::domain::errors::{PredictionError, PredictionResult};
use pricecast::domain::ml::{Dataset, FeatureMatrix};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Predicts `start, start + 1, ...` row by row and counts fit calls.
struct Ramp {
    start: f64,
    fits: Arc<AtomicUsize>,
    width: Option<usize>,
}

impl Ramp {
    fn new(start: f64, fits: Arc<AtomicUsize>) -> Box<dyn Estimator> {
        Box::new(Self {
            start,
            fits,
            width: None,
        })
    }
}

impl Estimator for Ramp {
    fn fit(&mut self, features: &FeatureMatrix, _target: &[f64]) -> PredictionResult<()> {
        self.fits.fetch_add(1, Ordering::SeqCst);
        self.width = Some(features.n_cols());
        Ok(())
    }

    fn predict(&self, features: &FeatureMatrix) -> PredictionResult<Vec<f64>> {
        if self.width.is_none() {
            return Err(PredictionError::not_fitted("ramp"));
        }
        Ok((0..features.n_rows()).map(|i| self.start + i as f64).collect())
    }

    fn name(&self) -> &str {
        "ramp"
    }

    fn is_fitted(&self) -> bool {
        self.width.is_some()
    }
}

struct Failing;

impl Estimator for Failing {
    fn fit(&mut self, _: &FeatureMatrix, _: &[f64]) -> PredictionResult<()> {
        Err(PredictionError::backend("test", "singular matrix"))
    }

    fn predict(&self, _: &FeatureMatrix) -> PredictionResult<Vec<f64>> {
        Err(PredictionError::not_fitted("failing"))
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn is_fitted(&self) -> bool {
        false
    }
}

/// Trains and evaluates normally but pads single-row predictions with an extra value.
struct Padded {
    width: Option<usize>,
}

impl Estimator for Padded {
    fn fit(&mut self, features: &FeatureMatrix, _target: &[f64]) -> PredictionResult<()> {
        self.width = Some(features.n_cols());
        Ok(())
    }

    fn predict(&self, features: &FeatureMatrix) -> PredictionResult<Vec<f64>> {
        if self.width.is_none() {
            return Err(PredictionError::not_fitted("padded"));
        }
        let mut out = vec![0.0; features.n_rows()];
        if features.n_rows() == 1 {
            out.push(0.0);
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "padded"
    }

    fn is_fitted(&self) -> bool {
        self.width.is_some()
    }
}

fn linear_dataset(n: usize, width: usize) -> Dataset {
    let rows = (0..n)
        .map(|i| (0..width).map(|c| (i + c) as f64).collect())
        .collect();
    let target = (0..n).map(|i| 2.0 * i as f64 + 1.0).collect();
    Dataset::new(FeatureMatrix::new(rows).unwrap(), target).unwrap()
}

fn wave(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + 5.0 * (i as f64 * 0.2).sin() + 0.1 * i as f64)
        .collect()
}

#[test]
fn test_ensemble_prediction_is_elementwise_mean() {
    let fits = Arc::new(AtomicUsize::new(0));
    let mut ensemble = EnsembleCoordinator::new(EnsembleConfig::default())
        .with_model("a", Ramp::new(1.0, fits.clone()))
        .unwrap()
        .with_model("b", Ramp::new(3.0, fits.clone()))
        .unwrap();
    ensemble.train_on(&linear_dataset(10, 2)).unwrap();
    assert_eq!(fits.load(Ordering::SeqCst), 2);

    let x = FeatureMatrix::new(vec![vec![0.0, 1.0]; 3]).unwrap();
    let result = ensemble.predict(&x).unwrap();
    for (got, want) in result.prediction.iter().zip([2.0, 3.0, 4.0]) {
        assert!((got - want).abs() < 1e-12);
    }

    for (name, min, max) in [("a", 1.0, 3.0), ("b", 3.0, 5.0)] {
        let interval = result.confidence_interval[name];
        assert!(interval.lower <= interval.upper);
        assert!(interval.lower >= min && interval.upper <= max);
    }
}

#[test]
fn test_empty_matrix_touches_no_estimator() {
    let fits = Arc::new(AtomicUsize::new(0));
    let mut ensemble = EnsembleCoordinator::new(EnsembleConfig::default())
        .with_model("a", Ramp::new(0.0, fits.clone()))
        .unwrap();
    let empty = Dataset::new(FeatureMatrix::default(), Vec::new()).unwrap();

    assert!(matches!(
        ensemble.train_on(&empty),
        Err(PredictionError::DimensionMismatch { .. })
    ));
    assert_eq!(fits.load(Ordering::SeqCst), 0);
    assert!(!ensemble.is_trained());
}

#[test]
fn test_failing_estimator_is_isolated() {
    let fits = Arc::new(AtomicUsize::new(0));
    let mut ensemble = EnsembleCoordinator::new(EnsembleConfig::default())
        .with_model("good", Ramp::new(1.0, fits.clone()))
        .unwrap()
        .with_model("bad", Box::new(Failing))
        .unwrap();

    let report = ensemble.train_on(&linear_dataset(20, 3)).unwrap();
    assert!(!report.is_complete());
    assert!(report.metrics.contains_key("good"));
    match &report.failures["bad"] {
        PredictionError::Model { model, source } => {
            assert_eq!(model, "bad");
            assert!(matches!(**source, PredictionError::Backend { .. }));
        }
        other => panic!("unexpected failure: {other:?}"),
    }
    assert_eq!(ensemble.fitted_models(), vec!["good"]);

    let x = FeatureMatrix::new(vec![vec![0.0; 3]; 2]).unwrap();
    let result = ensemble.predict(&x).unwrap();
    assert_eq!(result.prediction, vec![1.0, 2.0]);
    assert!(!result.confidence_interval.contains_key("bad"));
}

#[test]
fn test_prediction_width_must_match_training() {
    let fits = Arc::new(AtomicUsize::new(0));
    let mut ensemble = EnsembleCoordinator::new(EnsembleConfig::default())
        .with_model("a", Ramp::new(0.0, fits))
        .unwrap();
    ensemble.train_on(&linear_dataset(10, 4)).unwrap();

    let narrow = FeatureMatrix::new(vec![vec![1.0, 2.0]]).unwrap();
    assert!(matches!(
        ensemble.predict(&narrow),
        Err(PredictionError::DimensionMismatch {
            expected: 4,
            actual: 2,
            ..
        })
    ));
}

fn variants(lookback: usize) -> Vec<Box<dyn Estimator>> {
    vec![
        Box::new(RandomForestEstimator::new(RandomForestParams {
            n_trees: 10,
            ..Default::default()
        })),
        Box::new(GradientBoostingEstimator::new(GradientBoostingParams {
            n_rounds: 20,
            ..Default::default()
        })),
        Box::new(ClassifierRegressor::new(ClassifierParams {
            n_trees: 10,
            ..Default::default()
        })),
        Box::new(SequenceRegressor::new(SequenceParams {
            lookback,
            ..Default::default()
        })),
    ]
}

#[test]
fn test_every_variant_rejects_predict_before_fit() {
    let x = FeatureMatrix::new(vec![vec![1.0; 5]]).unwrap();
    for model in variants(5) {
        assert!(!model.is_fitted());
        assert!(
            matches!(model.predict(&x), Err(PredictionError::NotFitted { .. })),
            "{} predicted before fit",
            model.name()
        );
    }
}

#[test]
fn test_every_variant_predicts_one_value_per_row() {
    let data = LagWindowBuilder::new(5).build(&wave(60)).unwrap();
    for mut model in variants(5) {
        model.fit(&data.features, &data.target).unwrap();
        assert!(model.is_fitted());
        let preds = model.predict(&data.features).unwrap();
        assert_eq!(preds.len(), data.target.len(), "{}", model.name());
        assert!(preds.iter().all(|p| p.is_finite()));
    }
}

#[test]
fn test_standard_roster_end_to_end() {
    let lookback = 8;
    let config = EnsembleConfig {
        parallel: false,
        random_forest: RandomForestParams {
            n_trees: 20,
            ..Default::default()
        },
        gradient_boosting: GradientBoostingParams {
            n_rounds: 30,
            ..Default::default()
        },
        classifier: ClassifierParams {
            n_trees: 20,
            ..Default::default()
        },
        sequence: SequenceParams {
            lookback,
            ..Default::default()
        },
        ..Default::default()
    };
    let series = wave(120);
    let builder = LagWindowBuilder::new(lookback);
    let mut ensemble = EnsembleCoordinator::standard(config);

    let report = ensemble.train_all(&builder, series.as_slice()).unwrap();
    assert!(report.is_complete(), "failures: {:?}", report.failures);
    assert_eq!(report.metrics.len(), 4);
    assert_eq!(report.train_rows + report.test_rows, 120 - lookback);

    let latest = builder.latest_window(&series).unwrap();
    let result = ensemble.predict(&latest).unwrap();
    assert_eq!(result.prediction.len(), 1);
    assert!(result.prediction[0] > 80.0 && result.prediction[0] < 130.0);
    assert_eq!(result.confidence_interval.len(), 4);
}

#[test]
fn test_named_columns_feed_the_ensemble() {
    let n = 40;
    let rsi: Vec<f64> = (0..n).map(|i| 30.0 + (i % 10) as f64 * 4.0).collect();
    let volume: Vec<f64> = (0..n).map(|i| 1000.0 + i as f64 * 10.0).collect();
    let price: Vec<f64> = (0..n).map(|i| 50.0 + i as f64 * 0.5).collect();
    let table = FeatureTable::new()
        .with_column("rsi", rsi)
        .unwrap()
        .with_column("volume", volume)
        .unwrap()
        .with_column("price", price)
        .unwrap();

    let fits = Arc::new(AtomicUsize::new(0));
    let mut ensemble = EnsembleCoordinator::new(EnsembleConfig::default())
        .with_model("ramp", Ramp::new(0.0, fits))
        .unwrap()
        .with_model(
            "forest",
            Box::new(RandomForestEstimator::new(RandomForestParams {
                n_trees: 10,
                ..Default::default()
            })),
        )
        .unwrap();
    let report = ensemble
        .train_all(&TargetColumnBuilder::new("price"), &table)
        .unwrap();
    assert_eq!(report.train_rows, 32);
    assert_eq!(report.test_rows, 8);
    assert_eq!(ensemble.scaler().map(|s| s.n_features()), Some(2));
}

#[test]
fn test_unequal_prediction_lengths_are_rejected() {
    let fits = Arc::new(AtomicUsize::new(0));
    let mut ensemble = EnsembleCoordinator::new(EnsembleConfig::default())
        .with_model("a", Ramp::new(0.0, fits))
        .unwrap()
        .with_model("b", Box::new(Padded { width: None }))
        .unwrap();
    let report = ensemble.train_on(&linear_dataset(10, 2)).unwrap();
    assert!(report.is_complete());
    assert_eq!(ensemble.fitted_models(), vec!["a", "b"]);

    let x = FeatureMatrix::new(vec![vec![0.0, 1.0]]).unwrap();
    match ensemble.predict(&x) {
        Err(PredictionError::ShapeError { context, reason }) => {
            assert_eq!(context, "ensemble predictions");
            assert!(reason.contains("'b'"), "reason: {}", reason);
            assert!(reason.contains("returned 2 values, expected 1"));
        }
        other => panic!("expected shape error, got {other:?}"),
    }
}
