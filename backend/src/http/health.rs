use crate::api_error::ApiError;
use crate::http::AppState;
use actix_web::{web, HttpResponse};

/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    crate::db::health_check(&state.pool).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "database": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
