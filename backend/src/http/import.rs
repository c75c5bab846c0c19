use crate::api_error::ApiError;
use crate::auth::AuthUser;
use crate::http::AppState;
use actix_web::{web, HttpResponse, Responder};
use tracing::info;

/// POST /api/import/performances
/// Raw CSV body; see `csv_import_service` for the accepted layout.
pub async fn import_performances(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Bytes,
) -> Result<impl Responder, ApiError> {
    info!(user_id = %user.id(), bytes = body.len(), "Received CSV import");
    let summary = state.imports.import_performances(user.id(), &body).await?;
    Ok(HttpResponse::Ok().json(summary))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/import/performances", web::post().to(import_performances));
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::{bearer, call, TEST_MAX_CSV_BYTES};
    use actix_web::{http::StatusCode, test};

    fn csv_request(body: impl Into<Vec<u8>>) -> test::TestRequest {
        let body: Vec<u8> = body.into();
        test::TestRequest::post()
            .uri("/api/import/performances")
            .insert_header(bearer())
            .insert_header(("Content-Type", "text/csv"))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn test_missing_columns_rejected() {
        let resp = call(csv_request("data;clube\n10/01/2025;H2\n")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("tournament, buy_in"));
    }

    #[actix_web::test]
    async fn test_oversized_body_rejected() {
        let mut csv = String::from("date,tournament,buy_in\n");
        while csv.len() <= TEST_MAX_CSV_BYTES {
            csv.push_str("2025-01-10,Daily Turbo,55\n");
        }
        let resp = call(csv_request(csv)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_invalid_utf8_rejected() {
        let resp = call(csv_request(vec![0xff, 0xfe, 0x00])).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
