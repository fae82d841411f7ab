use std::num::{ParseFloatError, ParseIntError};
use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("cannot read artifact {path:?}: {source}")]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid artifact {path:?}: {message}")]
    ArtifactFormat { path: PathBuf, message: String },
    #[error("missing form field {field:?}")]
    MissingField { field: String },
    #[error("could not convert {field} value {value:?}: {message}")]
    Coercion {
        field: String,
        value: String,
        message: String,
    },
    #[error("email {email:?} cannot be used as a document id")]
    UnsafeIdentifier { email: String },
    #[error("shape mismatch: {0}")]
    Shape(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("could not read CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("could not read upload: {0}")]
    Upload(String),
    #[error("document store returned {status}: {body}")]
    StoreStatus { status: u16, body: String },
    #[error("document store repeated page token {0:?}")]
    StorePaging(String),
    #[error("document store request failed: {0}")]
    StoreTransport(#[from] reqwest::Error),
    #[error("invalid document store url {0:?}")]
    StoreUrl(String),
    #[error("neither manual fields (age, email, name) nor a CSV file were provided")]
    NoInput,
}

impl ServiceError {
    pub fn coercion(field: &str, value: &str, message: impl ToString) -> Self {
        ServiceError::Coercion {
            field: field.to_string(),
            value: value.to_string(),
            message: message.to_string(),
        }
    }
}

/// Tags a number parse failure with the field it came from.
pub trait FieldContext<T> {
    fn field(self, field: &str, value: &str) -> Result<T>;
}

impl<T> FieldContext<T> for std::result::Result<T, ParseFloatError> {
    fn field(self, field: &str, value: &str) -> Result<T> {
        self.map_err(|e| ServiceError::coercion(field, value, e))
    }
}

impl<T> FieldContext<T> for std::result::Result<T, ParseIntError> {
    fn field(self, field: &str, value: &str) -> Result<T> {
        self.map_err(|e| ServiceError::coercion(field, value, e))
    }
}
