//! In-process stand-ins for the document store and the fitted model.

#![allow(dead_code)]

use std::sync::Mutex;

use actix_web::{web, App, HttpResponse, HttpServer};
use heart_risk_service::artifacts::StandardScaler;
use heart_risk_service::error::Result;
use heart_risk_service::inference::{Classifier, Predictor};
use heart_risk_service::records::FEATURE_COUNT;
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Scores 0.8 when the first (age) column is at least 50, else 0.3.
pub struct AgeThreshold;

impl Classifier for AgeThreshold {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        Ok(rows
            .iter()
            .map(|row| if row[0] >= 50.0 { 0.8 } else { 0.3 })
            .collect())
    }
}

pub fn predictor() -> Predictor {
    let scaler = StandardScaler {
        mean: vec![0.0; FEATURE_COUNT],
        scale: vec![1.0; FEATURE_COUNT],
    };
    Predictor::new(Box::new(scaler), Box::new(AgeThreshold))
}

pub const HEADER: &str = "age,sex,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal";

pub fn patient(email: &str, age: &str) -> Vec<(String, String)> {
    [
        ("name", "Ada"),
        ("email", email),
        ("age", age),
        ("sex", "1"),
        ("cp", "3"),
        ("trestbps", "145"),
        ("chol", "233"),
        ("fbs", "1"),
        ("restecg", "0"),
        ("thalach", "150"),
        ("exang", "0"),
        ("oldpeak", "2.3"),
        ("slope", "0"),
        ("ca", "0"),
        ("thal", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Keeps every record logged by the service so tests can assert on it.
struct CapturingLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("heart_risk_service")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.records
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger {
    records: Mutex::new(Vec::new()),
};

/// Installs the capturing logger; later calls are no-ops.
pub fn capture_logs() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

/// Messages logged at `level` that contain `needle`.
pub fn logged(level: Level, needle: &str) -> Vec<String> {
    LOGGER
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(l, message)| *l == level && message.contains(needle))
        .map(|(_, message)| message.clone())
        .collect()
}

/// A document collection answering the same REST calls as the real store.
pub struct FakeStore {
    pub docs: Mutex<Vec<(String, Map<String, Value>)>>,
    pub patch_status: u16,
    pub list_status: u16,
    pub page_size: usize,
    /// When set, every page points at itself as the next one.
    pub repeat_page_token: bool,
}

impl Default for FakeStore {
    fn default() -> Self {
        FakeStore {
            docs: Mutex::new(Vec::new()),
            patch_status: 200,
            list_status: 200,
            page_size: 100,
            repeat_page_token: false,
        }
    }
}

impl FakeStore {
    pub fn insert(&self, id: &str, fields: Value) {
        let fields = fields.as_object().cloned().unwrap_or_default();
        self.docs.lock().unwrap().push((id.to_string(), fields));
    }

    pub fn ids(&self) -> Vec<String> {
        self.docs
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn fields(&self, id: &str) -> Option<Map<String, Value>> {
        self.docs
            .lock()
            .unwrap()
            .iter()
            .find(|(doc, _)| doc == id)
            .map(|(_, fields)| fields.clone())
    }
}

async fn patch_document(
    store: web::Data<FakeStore>,
    id: web::Path<String>,
    body: web::Json<Value>,
) -> HttpResponse {
    if store.patch_status != 200 {
        return HttpResponse::build(
            actix_web::http::StatusCode::from_u16(store.patch_status).unwrap(),
        )
        .body("service unavailable");
    }

    let id = id.into_inner();
    let incoming = body
        .get("fields")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut docs = store.docs.lock().unwrap();
    match docs.iter_mut().find(|(doc, _)| *doc == id) {
        Some((_, fields)) => fields.extend(incoming),
        None => docs.push((id.clone(), incoming)),
    }
    HttpResponse::Ok().json(json!({ "name": id }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    page_token: Option<String>,
}

async fn list_documents(
    store: web::Data<FakeStore>,
    query: web::Query<ListQuery>,
) -> HttpResponse {
    if store.list_status != 200 {
        return HttpResponse::build(
            actix_web::http::StatusCode::from_u16(store.list_status).unwrap(),
        )
        .body("backend down");
    }

    let start: usize = query
        .page_token
        .as_deref()
        .map(|t| t.parse().unwrap())
        .unwrap_or(0);
    let docs = store.docs.lock().unwrap();
    let end = (start + store.page_size).min(docs.len());
    let documents: Vec<Value> = docs[start..end]
        .iter()
        .map(|(id, fields)| json!({ "name": id, "fields": fields }))
        .collect();

    let mut body = json!({ "documents": documents });
    if store.repeat_page_token {
        body["nextPageToken"] = json!(start.to_string());
    } else if end < docs.len() {
        body["nextPageToken"] = json!(end.to_string());
    }
    HttpResponse::Ok().json(body)
}

/// Serves `store` on an ephemeral port and returns its collection URL.
pub fn start(store: FakeStore) -> (String, web::Data<FakeStore>) {
    let data = web::Data::new(store);
    let app_data = data.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_data.clone())
            .route("/docs", web::get().to(list_documents))
            .route("/docs/{id}", web::patch().to(patch_document))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    (format!("http://{addr}/docs"), data)
}
