use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Collection the manual predictions are written to.
pub const DEFAULT_COLLECTION_URL: &str = "https://firestore.googleapis.com/v1/projects/heart-disease-smvitm/databases/(default)/documents/manual_predictions";

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about = "Heart disease risk prediction service", long_about = None)]
pub struct ServiceArgs {
    #[clap(long, env = "HEART_HOST", default_value = "127.0.0.1", help = "Address to bind")]
    pub host: String,
    #[clap(short, long, env = "HEART_PORT", default_value_t = 5000, help = "Port to bind")]
    pub port: u16,
    #[clap(long, env = "HEART_MODEL", parse(from_os_str), default_value = "model.json",
    help = "Serialized classifier")]
    pub model: PathBuf,
    #[clap(long, env = "HEART_SCALER", parse(from_os_str), default_value = "scaler.json",
    help = "Serialized feature scaler")]
    pub scaler: PathBuf,
    #[clap(long, env = "HEART_STORE_URL", default_value = DEFAULT_COLLECTION_URL,
    help = "Document collection for manual predictions")]
    pub store_url: String,
    #[clap(long, env = "HEART_STORE_TIMEOUT_SECS",
    help = "Timeout for document store requests (none by default)")]
    pub store_timeout_secs: Option<u64>,
    #[clap(long, env = "HEART_MAX_UPLOAD_BYTES", default_value_t = 16 * 1024 * 1024,
    help = "Largest accepted request body")]
    pub max_upload_bytes: usize,
    #[clap(short, long, parse(from_occurrences), help = "Verbose level")]
    pub verbose: usize,
}

impl ServiceArgs {
    pub fn store_timeout(&self) -> Option<Duration> {
        self.store_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = ServiceArgs::try_parse_from(["heart-risk-service"]).unwrap();
        assert_eq!(args.port, 5000);
        assert_eq!(args.model, PathBuf::from("model.json"));
        assert_eq!(args.store_url, DEFAULT_COLLECTION_URL);
        assert_eq!(args.store_timeout(), None);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn flags_override_defaults() {
        let args = ServiceArgs::try_parse_from([
            "heart-risk-service",
            "--port",
            "8080",
            "--store-timeout-secs",
            "5",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.port, 8080);
        assert_eq!(args.store_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(args.verbose, 2);
    }
}
