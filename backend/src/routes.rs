use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::io::Write;

use shared::DetectionResponse;

use crate::analysis::knowledge::KnowledgeBase;
use crate::analysis::normalizer;
use crate::cases::models::NewCase;
use crate::cases::store::CaseStore;
use crate::classifier::client::{ClassifierClient, ClassifierError};
use crate::detail::service::DetailService;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/analyze").route(web::post().to(handle_analyze)))
        .service(web::resource("/supported-conditions").route(web::get().to(supported_conditions)))
        .service(
            web::resource("/api/cases")
                .route(web::post().to(create_case))
                .route(web::get().to(list_cases)),
        );
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Dermalens API - skin condition screening relay",
        "status": "running"
    }))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "message": "API is running properly"
    }))
}

async fn handle_analyze(
    classifier: web::Data<ClassifierClient>,
    knowledge: web::Data<KnowledgeBase>,
    detail: web::Data<DetailService>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    // Image bytes arrive in the `image` multipart field; the first
    // non-empty field is taken.
    let mut image_data = Vec::new();
    while let Ok(Some(mut field)) = payload.try_next().await {
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            image_data.write_all(&data)?;
        }
        if !image_data.is_empty() {
            break;
        }
    }

    info!("Analysis request received ({} bytes)", image_data.len());

    let raw = match classifier.classify(&image_data).await {
        Ok(raw) => raw,
        Err(e) => return Ok(analyze_error_response(&e)),
    };

    let mut result = normalizer::normalize(&raw, &knowledge);

    // Enrichment only applies when something was detected.
    if let Some(top) = normalizer::top_prediction(&raw.predictions) {
        let analysis = detail
            .generate(&result.condition, top.confidence, &result.advice)
            .await;
        result.detailed_analysis = Some(analysis);
    }
    result.image_hash = Some(image_fingerprint(&image_data));

    info!(
        "Analysis completed: {} ({})",
        result.condition, result.confidence
    );

    Ok(HttpResponse::Ok().json(DetectionResponse {
        success: true,
        result,
        message: "Skin condition analysis completed successfully".to_string(),
    }))
}

fn analyze_error_response(err: &ClassifierError) -> HttpResponse {
    let body = ErrorResponse {
        error: err.user_message(),
    };
    if err.is_validation() {
        info!("Rejected analysis request: {err}");
        HttpResponse::BadRequest().json(body)
    } else {
        error!("Analysis failed: {err}");
        HttpResponse::InternalServerError().json(body)
    }
}

fn image_fingerprint(image_data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_data);
    hex::encode(hasher.finalize())
}

async fn supported_conditions(knowledge: web::Data<KnowledgeBase>) -> HttpResponse {
    let names = knowledge.condition_names();
    HttpResponse::Ok().json(json!({
        "supported_conditions": names,
        "total_count": names.len()
    }))
}

async fn create_case(store: web::Data<CaseStore>, payload: web::Json<NewCase>) -> HttpResponse {
    match store.add_case(payload.into_inner()) {
        Ok(case) => {
            info!("Stored case {} ({})", case.id, case.condition);
            HttpResponse::Created().json(case)
        }
        Err(e) => {
            info!("Rejected case submission: {e}");
            HttpResponse::BadRequest().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    }
}

async fn list_cases(store: web::Data<CaseStore>) -> HttpResponse {
    HttpResponse::Ok().json(store.list_cases())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::models::Case;
    use actix_web::{App, test};
    use std::time::Duration;

    fn test_app_data() -> (
        web::Data<ClassifierClient>,
        web::Data<KnowledgeBase>,
        web::Data<DetailService>,
        web::Data<CaseStore>,
    ) {
        let classifier = ClassifierClient::new(
            "http://127.0.0.1:1/classify".to_string(),
            "test-key".to_string(),
            Duration::from_secs(1),
            1024 * 1024,
        )
        .unwrap();
        let knowledge = KnowledgeBase::load().unwrap();
        let detail = DetailService::new(
            None,
            "http://127.0.0.1:1".to_string(),
            "test-model".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        (
            web::Data::new(classifier),
            web::Data::new(knowledge),
            web::Data::new(detail),
            web::Data::new(CaseStore::new()),
        )
    }

    macro_rules! init_test_service {
        () => {{
            let (classifier, knowledge, detail, store) = test_app_data();
            test::init_service(
                App::new()
                    .app_data(classifier)
                    .app_data(knowledge)
                    .app_data(detail)
                    .app_data(store)
                    .configure(configure_routes),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn health_endpoint_reports_healthy() {
        let app = init_test_service!();
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
    }

    #[actix_web::test]
    async fn analyze_rejects_unreadable_image_bytes() {
        let app = init_test_service!();
        let boundary = "------------------------dermalens";
        let payload = format!(
            "--{boundary}\r\n\
Content-Disposition: form-data; name=\"image\"; filename=\"skin.jpg\"\r\n\
Content-Type: image/jpeg\r\n\r\n\
not-an-image\r\n\
--{boundary}--\r\n"
        );
        let req = test::TestRequest::post()
            .uri("/analyze")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            ))
            .set_payload(payload)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid image"));
    }

    #[actix_web::test]
    async fn analyze_rejects_empty_upload() {
        let app = init_test_service!();
        let boundary = "------------------------dermalens";
        let payload = format!("--{boundary}--\r\n");
        let req = test::TestRequest::post()
            .uri("/analyze")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            ))
            .set_payload(payload)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn cases_round_trip_most_recent_first() {
        let app = init_test_service!();

        for (condition, image_ref) in [
            ("Acne", "file:///tmp/one.jpg"),
            ("Eczema", "file:///tmp/two.jpg"),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/cases")
                .set_json(json!({
                    "condition": condition,
                    "confidence": "91%",
                    "advice": "Keep skin clean.",
                    "urgency": "low",
                    "imageRef": image_ref
                }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
        }

        let req = test::TestRequest::get().uri("/api/cases").to_request();
        let cases: Vec<Case> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].condition, "Eczema");
        assert_eq!(cases[1].condition, "Acne");
        assert_eq!(cases[0].image_ref, "file:///tmp/two.jpg");
    }

    #[actix_web::test]
    async fn case_with_unknown_scheme_is_rejected() {
        let app = init_test_service!();
        let req = test::TestRequest::post()
            .uri("/api/cases")
            .set_json(json!({
                "condition": "Acne",
                "confidence": "91%",
                "advice": "Keep skin clean.",
                "urgency": "low",
                "imageRef": "ftp://nope"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn supported_conditions_lists_the_catalogue() {
        let app = init_test_service!();
        let req = test::TestRequest::get()
            .uri("/supported-conditions")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let names = body["supported_conditions"].as_array().unwrap();
        assert_eq!(names.len(), body["total_count"].as_u64().unwrap() as usize);
        assert!(names.iter().any(|n| n == "Acne"));
    }
}
