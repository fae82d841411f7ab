use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::http::header::{self, ContentType};
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::{stream, StreamExt};
use log::{error, info, warn};

use crate::batch;
use crate::error::{Result, ServiceError};
use crate::inference::Predictor;
use crate::records::PatientRecord;
use crate::store::RecordStore;
use crate::views;

/// Everything a request needs, built once at startup and never mutated.
pub struct AppState {
    pub predictor: Predictor,
    pub store: RecordStore,
}

/// Text fields and the optional uploaded file of a `/predict` submission.
#[derive(Debug, Default)]
pub struct Submission {
    pub fields: HashMap<String, String>,
    pub file: Option<Vec<u8>>,
}

impl Submission {
    fn is_manual(&self) -> bool {
        ["age", "email", "name"]
            .iter()
            .all(|k| self.fields.get(*k).map_or(false, |v| !v.is_empty()))
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/predict", web::get().to(predict_form))
        .route("/predict", web::post().to(predict))
        .route("/manual-predictions", web::get().to(manual_predictions));
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(body)
}

async fn index() -> HttpResponse {
    html(views::index())
}

async fn predict_form() -> HttpResponse {
    html(views::predict_form())
}

async fn predict(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    let submission = match read_submission(&req, body).await {
        Ok(submission) => submission,
        Err(e) => return html(views::error_result(&e.to_string())),
    };

    let outcome = if submission.is_manual() {
        predict_manual(&state, &submission.fields).await
    } else if let Some(file) = submission.file {
        predict_csv(&state.predictor, file)
    } else {
        warn!("predict request without manual fields or file");
        return HttpResponse::BadRequest()
            .content_type(ContentType::plaintext())
            .body(ServiceError::NoInput.to_string());
    };

    match outcome {
        Ok(page) => html(page),
        Err(e) => {
            warn!("prediction failed: {e}");
            html(views::error_result(&e.to_string()))
        }
    }
}

async fn predict_manual(state: &AppState, fields: &HashMap<String, String>) -> Result<String> {
    let record = PatientRecord::from_form(fields)?;
    let result = state.predictor.predict_one(&record.features.to_vector())?;
    info!("manual prediction for {}: {result}", record.email);

    if let Err(e) = state.store.upsert(&record, result).await {
        error!("error saving prediction for {}: {e}", record.email);
    }

    Ok(views::single_result(result.as_str()))
}

fn predict_csv(predictor: &Predictor, file: Vec<u8>) -> Result<String> {
    let df = batch::read_csv(file)?;
    let predicted = predictor.predict_batch(df)?;
    info!("batch prediction for {} rows", predicted.height());

    let header = predicted.get_column_names();
    let rows = batch::display_rows(&predicted)?;
    Ok(views::table_result(&header, &rows))
}

async fn manual_predictions(state: web::Data<AppState>) -> HttpResponse {
    match state.store.list_all().await {
        Ok(predictions) => html(views::manual_predictions(&predictions)),
        Err(e) => {
            error!("listing predictions failed: {e}");
            let message = match e {
                ServiceError::StoreStatus { body, .. } => {
                    format!("Error fetching predictions: {body}")
                }
                other => format!("Error: {other}"),
            };
            HttpResponse::InternalServerError()
                .content_type(ContentType::plaintext())
                .body(message)
        }
    }
}

/// Reads a urlencoded or multipart body into a `Submission`.
///
/// A multipart file part only counts when it carries a non-empty filename,
/// the way browsers send an untouched file input.
pub async fn read_submission(req: &HttpRequest, body: web::Bytes) -> Result<Submission> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.starts_with("multipart/form-data"));

    if !is_multipart {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&body)
            .map_err(|e| ServiceError::Upload(e.to_string()))?;
        return Ok(Submission {
            fields: pairs.into_iter().collect(),
            file: None,
        });
    }

    let payload = stream::once(async move { Ok::<_, actix_web::error::PayloadError>(body) });
    let mut multipart = Multipart::new(req.headers(), payload);
    let mut submission = Submission::default();

    while let Some(field) = multipart.next().await {
        let mut field = field.map_err(|e| ServiceError::Upload(e.to_string()))?;
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let filename = disposition.get_filename().map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ServiceError::Upload(e.to_string()))?;
            data.extend_from_slice(&chunk);
        }

        if name == "file" {
            if filename.map_or(false, |f| !f.is_empty()) {
                submission.file = Some(data);
            }
        } else {
            let value =
                String::from_utf8(data).map_err(|e| ServiceError::Upload(e.to_string()))?;
            submission.fields.insert(name, value);
        }
    }

    Ok(submission)
}
