use std::collections::HashMap;
use std::fmt;

use serde_json::{json, Map, Value};

use crate::error::{FieldContext, Result, ServiceError};

/// Column order the scaler and classifier were fitted with.
pub const FEATURE_NAMES: [&str; 13] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Typed envelope a stored field is wrapped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Double,
}

impl FieldKind {
    pub fn envelope(self) -> &'static str {
        match self {
            FieldKind::Text => "stringValue",
            FieldKind::Integer => "integerValue",
            FieldKind::Double => "doubleValue",
        }
    }
}

/// Fields of a stored prediction record, in display order.
pub const STORED_FIELDS: [(&str, FieldKind); 16] = [
    ("name", FieldKind::Text),
    ("email", FieldKind::Text),
    ("age", FieldKind::Integer),
    ("sex", FieldKind::Text),
    ("cp", FieldKind::Integer),
    ("trestbps", FieldKind::Integer),
    ("chol", FieldKind::Integer),
    ("fbs", FieldKind::Text),
    ("restecg", FieldKind::Integer),
    ("thalach", FieldKind::Integer),
    ("exang", FieldKind::Text),
    ("oldpeak", FieldKind::Double),
    ("slope", FieldKind::Integer),
    ("ca", FieldKind::Integer),
    ("thal", FieldKind::Integer),
    ("result", FieldKind::Text),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Yes,
    No,
}

impl Label {
    pub fn from_score(score: f64) -> Self {
        if score > 0.5 {
            Label::Yes
        } else {
            Label::No
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Yes => "Yes",
            Label::No => "No",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric code that is stored as the text it was submitted with.
#[derive(Debug, Clone, PartialEq)]
pub struct Coded {
    pub raw: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalFeatures {
    pub age: i64,
    pub sex: Coded,
    pub cp: i64,
    pub trestbps: i64,
    pub chol: i64,
    pub fbs: Coded,
    pub restecg: i64,
    pub thalach: i64,
    pub exang: Coded,
    pub oldpeak: f64,
    pub slope: i64,
    pub ca: i64,
    pub thal: i64,
}

impl ClinicalFeatures {
    /// Feature vector in `FEATURE_NAMES` order.
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.age as f64,
            self.sex.value,
            self.cp as f64,
            self.trestbps as f64,
            self.chol as f64,
            self.fbs.value,
            self.restecg as f64,
            self.thalach as f64,
            self.exang.value,
            self.oldpeak,
            self.slope as f64,
            self.ca as f64,
            self.thal as f64,
        ]
    }
}

/// A manual submission, parsed once and shared by inference and storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    pub name: String,
    pub email: String,
    pub features: ClinicalFeatures,
}

impl PatientRecord {
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self> {
        let name = text(form, "name")?.to_string();
        let email = text(form, "email")?.to_string();
        validate_document_id(&email)?;

        let features = ClinicalFeatures {
            age: integer(form, "age")?,
            sex: coded(form, "sex")?,
            cp: integer(form, "cp")?,
            trestbps: integer(form, "trestbps")?,
            chol: integer(form, "chol")?,
            fbs: coded(form, "fbs")?,
            restecg: integer(form, "restecg")?,
            thalach: integer(form, "thalach")?,
            exang: coded(form, "exang")?,
            oldpeak: double(form, "oldpeak")?,
            slope: integer(form, "slope")?,
            ca: integer(form, "ca")?,
            thal: integer(form, "thal")?,
        };

        Ok(PatientRecord {
            name,
            email,
            features,
        })
    }

    /// Typed-envelope field map for the document store, one entry per
    /// `STORED_FIELDS` row.
    pub fn to_store_fields(&self, result: Label) -> Map<String, Value> {
        STORED_FIELDS
            .iter()
            .filter_map(|(name, kind)| {
                let value = self.stored_value(name, result)?;
                let mut envelope = Map::new();
                envelope.insert(kind.envelope().to_string(), value);
                Some((name.to_string(), Value::Object(envelope)))
            })
            .collect()
    }

    fn stored_value(&self, field: &str, result: Label) -> Option<Value> {
        let f = &self.features;
        let value = match field {
            "name" => json!(self.name),
            "email" => json!(self.email),
            "age" => json!(f.age),
            "sex" => json!(f.sex.raw),
            "cp" => json!(f.cp),
            "trestbps" => json!(f.trestbps),
            "chol" => json!(f.chol),
            "fbs" => json!(f.fbs.raw),
            "restecg" => json!(f.restecg),
            "thalach" => json!(f.thalach),
            "exang" => json!(f.exang.raw),
            "oldpeak" => json!(f.oldpeak),
            "slope" => json!(f.slope),
            "ca" => json!(f.ca),
            "thal" => json!(f.thal),
            "result" => json!(result.as_str()),
            _ => return None,
        };
        Some(value)
    }
}

/// Rejects emails that would not survive as a single URL path segment.
pub fn validate_document_id(email: &str) -> Result<()> {
    let unsafe_char = |c: char| c == '/' || c == '\\' || c.is_whitespace() || c.is_control();
    if email.is_empty() || email == "." || email == ".." || email.chars().any(unsafe_char) {
        return Err(ServiceError::UnsafeIdentifier {
            email: email.to_string(),
        });
    }
    Ok(())
}

fn text<'a>(form: &'a HashMap<String, String>, field: &str) -> Result<&'a str> {
    form.get(field)
        .map(String::as_str)
        .ok_or_else(|| ServiceError::MissingField {
            field: field.to_string(),
        })
}

fn integer(form: &HashMap<String, String>, field: &str) -> Result<i64> {
    let raw = text(form, field)?;
    raw.trim().parse::<i64>().field(field, raw)
}

fn double(form: &HashMap<String, String>, field: &str) -> Result<f64> {
    let raw = text(form, field)?;
    raw.trim().parse::<f64>().field(field, raw)
}

fn coded(form: &HashMap<String, String>, field: &str) -> Result<Coded> {
    let raw = text(form, field)?;
    Ok(Coded {
        raw: raw.to_string(),
        value: double(form, field)?,
    })
}
