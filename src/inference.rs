//! Scale-then-classify over single rows and CSV batches.

use polars::prelude::*;

use crate::batch;
use crate::error::{Result, ServiceError};
use crate::records::{Label, FEATURE_COUNT};

/// Column dropped from uploaded batches before scaling.
pub const TARGET_COLUMN: &str = "target";

/// Column appended to a predicted batch.
pub const PREDICTION_COLUMN: &str = "Prediction";

/// A fitted numeric transform applied before classification.
pub trait Scaler: Send + Sync {
    fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;
}

/// A fitted model producing one raw score per scaled row.
pub trait Classifier: Send + Sync {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>>;
}

pub struct Predictor {
    scaler: Box<dyn Scaler>,
    classifier: Box<dyn Classifier>,
}

impl Predictor {
    pub fn new(scaler: Box<dyn Scaler>, classifier: Box<dyn Classifier>) -> Self {
        Predictor { scaler, classifier }
    }

    pub fn predict_one(&self, features: &[f64; FEATURE_COUNT]) -> Result<Label> {
        let labels = self.predict_rows(&[features.to_vec()])?;
        labels
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Inference("classifier returned no score".to_string()))
    }

    /// Predicts every row of `df` positionally and appends a `Prediction`
    /// column. A `target` column, if present, is dropped first.
    pub fn predict_batch(&self, mut df: DataFrame) -> Result<DataFrame> {
        if df.get_column_names().contains(&TARGET_COLUMN) {
            df.drop_in_place(TARGET_COLUMN)?;
        }
        if df.width() != FEATURE_COUNT {
            return Err(ServiceError::Shape(format!(
                "expected {} feature columns, found {} ({})",
                FEATURE_COUNT,
                df.width(),
                df.get_column_names().join(", ")
            )));
        }

        let rows = batch::feature_rows(&df)?;
        let labels = self.predict_rows(&rows)?;
        let labels: Vec<&str> = labels.iter().map(|l| l.as_str()).collect();
        df.with_column(Series::new(PREDICTION_COLUMN, labels))?;
        Ok(df)
    }

    fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<Label>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(row) = rows.iter().find(|row| row.len() != FEATURE_COUNT) {
            return Err(ServiceError::Shape(format!(
                "expected {} features per row, found {}",
                FEATURE_COUNT,
                row.len()
            )));
        }

        let scaled = self.scaler.transform(rows)?;
        let scores = self.classifier.predict(&scaled)?;
        if scores.len() != rows.len() {
            return Err(ServiceError::Inference(format!(
                "classifier returned {} scores for {} rows",
                scores.len(),
                rows.len()
            )));
        }
        Ok(scores.into_iter().map(Label::from_score).collect())
    }
}
