use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use env_logger::{Builder, Env};
use log::{debug, error, info, LevelFilter};

use heart_risk_service::artifacts;
use heart_risk_service::config::ServiceArgs;
use heart_risk_service::handlers::{self, AppState};
use heart_risk_service::store::RecordStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = ServiceArgs::parse();

    let log_level = match args.verbose {
        1 => LevelFilter::Debug,
        2 => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    let env = Env::new().filter("HEART_LOG");
    Builder::new()
        .filter(Some("heart_risk_service"), log_level)
        .filter(Some("actix_web"), LevelFilter::Info)
        .parse_env(env)
        .init();

    debug!("Arguments {:#?}", args);

    let artifacts = match artifacts::load(&args.model, &args.scaler) {
        Ok(artifacts) => artifacts,
        Err(e) => {
            error!("cannot start without model artifacts: {e}");
            std::process::exit(1);
        }
    };

    let store = match RecordStore::new(&args.store_url, args.store_timeout()) {
        Ok(store) => store,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let state = web::Data::new(AppState {
        predictor: artifacts.into_predictor(),
        store,
    });
    let max_upload_bytes = args.max_upload_bytes;

    info!("listening on http://{}:{}", args.host, args.port);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(max_upload_bytes))
            .configure(handlers::configure)
    })
    .bind((args.host.as_str(), args.port))?
    .run()
    .await
}
