//! Loading of the fitted scaler and classifier.
//!
//! Both artifacts are JSON files written at training time:
//!
//! * the scaler holds per-column `mean` and `scale` vectors (the fitted
//!   attributes of a standard scaler, `mean_`/`scale_` are accepted too);
//! * the classifier wraps a serialized `smartcore` estimator as
//!   `{"kind": "logistic_regression" | "random_forest", "model": {...}}`.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::RandomForestClassifier;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::LogisticRegression;

use crate::error::{Result, ServiceError};
use crate::inference::{Classifier, Predictor, Scaler};
use crate::records::FEATURE_COUNT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(alias = "mean_")]
    pub mean: Vec<f64>,
    #[serde(alias = "scale_")]
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn check(&self) -> std::result::Result<(), String> {
        if self.mean.len() != FEATURE_COUNT {
            return Err(format!(
                "scaler has {} columns, expected {}",
                self.mean.len(),
                FEATURE_COUNT
            ));
        }
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            ));
        }
        Ok(())
    }
}

impl Scaler for StandardScaler {
    fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter()
            .map(|row| {
                if row.len() != self.mean.len() {
                    return Err(ServiceError::Shape(format!(
                        "scaler expects {} columns, got {}",
                        self.mean.len(),
                        row.len()
                    )));
                }
                Ok(row
                    .iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(x, (mean, scale))| {
                        let scale = if *scale == 0.0 { 1.0 } else { *scale };
                        (x - mean) / scale
                    })
                    .collect())
            })
            .collect()
    }
}

type Matrix = DenseMatrix<f64>;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "model", rename_all = "snake_case")]
pub enum SmartcoreClassifier {
    LogisticRegression(LogisticRegression<f64, i32, Matrix, Vec<i32>>),
    RandomForest(RandomForestClassifier<f64, i32, Matrix, Vec<i32>>),
}

impl Classifier for SmartcoreClassifier {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        let nrows = rows.len();
        let ncols = rows.first().map(Vec::len).unwrap_or(0);
        let values: Vec<f64> = rows.iter().flatten().copied().collect();
        let x = DenseMatrix::new(nrows, ncols, values, false);

        let classes = match self {
            SmartcoreClassifier::LogisticRegression(model) => model.predict(&x),
            SmartcoreClassifier::RandomForest(model) => model.predict(&x),
        }
        .map_err(|e| ServiceError::Inference(e.to_string()))?;

        Ok(classes.into_iter().map(f64::from).collect())
    }
}

pub struct Artifacts {
    pub scaler: StandardScaler,
    pub classifier: SmartcoreClassifier,
}

impl Artifacts {
    pub fn into_predictor(self) -> Predictor {
        Predictor::new(Box::new(self.scaler), Box::new(self.classifier))
    }
}

/// Reads both artifacts. Any failure here means the process cannot serve.
pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Artifacts> {
    let scaler: StandardScaler = read_json(scaler_path)?;
    scaler.check().map_err(|message| ServiceError::ArtifactFormat {
        path: scaler_path.to_path_buf(),
        message,
    })?;
    info!(
        "loaded scaler from {} ({} columns)",
        scaler_path.display(),
        scaler.mean.len()
    );

    let classifier: SmartcoreClassifier = read_json(model_path)?;
    check_classifier(&classifier).map_err(|message| ServiceError::ArtifactFormat {
        path: model_path.to_path_buf(),
        message,
    })?;
    info!("loaded classifier from {}", model_path.display());

    Ok(Artifacts { scaler, classifier })
}

/// Runs the classifier on one all-zero row of `FEATURE_COUNT` columns.
///
/// smartcore asserts on matrix shapes, so a model fitted on another width
/// panics instead of returning an error; both count as an unusable model.
fn check_classifier(classifier: &SmartcoreClassifier) -> std::result::Result<(), String> {
    let row = [vec![0.0; FEATURE_COUNT]];
    match panic::catch_unwind(AssertUnwindSafe(|| classifier.predict(&row))) {
        Ok(Ok(scores)) if scores.len() == 1 => Ok(()),
        Ok(Ok(scores)) => Err(format!("classifier returned {} scores for 1 row", scores.len())),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!(
            "classifier does not accept {} feature columns",
            FEATURE_COUNT
        )),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|source| ServiceError::ArtifactIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ServiceError::ArtifactFormat {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
