mod analysis;
mod cases;
mod classifier;
mod config;
mod detail;
mod routes;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};

use analysis::knowledge::KnowledgeBase;
use cases::store::CaseStore;
use classifier::client::ClassifierClient;
use config::AppConfig;
use detail::service::DetailService;
use routes::configure_routes;

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{context}: {err}"))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| startup_error("configuration error", e))?;

    let knowledge =
        KnowledgeBase::load().map_err(|e| startup_error("knowledge base loading failed", e))?;
    log::info!(
        "Loaded knowledge base with {} conditions",
        knowledge.condition_count()
    );

    let classifier = ClassifierClient::new(
        config.classifier_url.clone(),
        config.classifier_api_key.clone(),
        config.classifier_timeout,
        config.max_image_bytes,
    )
    .map_err(|e| startup_error("classifier client setup failed", e))?;

    let detail = DetailService::new(
        config.detail_api_key.clone(),
        config.detail_base_url.clone(),
        config.detail_model.clone(),
        config.classifier_timeout,
    )
    .map_err(|e| startup_error("detail service setup failed", e))?;

    if detail.is_configured() {
        log::info!(
            "Detailed analysis via {} ({})",
            config.detail_base_url,
            config.detail_model
        );
    } else {
        log::warn!("No detail-service API key configured; static analysis sections will be used");
    }

    let case_store = CaseStore::new();
    let knowledge = web::Data::new(knowledge);

    let bind_address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(knowledge.clone())
            .app_data(web::Data::new(classifier.clone()))
            .app_data(web::Data::new(detail.clone()))
            .app_data(web::Data::new(case_store.clone()))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
