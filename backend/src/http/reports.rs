use crate::api_error::ApiError;
use crate::auth::AuthUser;
use crate::http::AppState;
use crate::models::report::{DashboardQuery, DreQuery};
use actix_web::{web, HttpResponse, Responder};
use tracing::info;

/// GET /api/dashboard?from&to&club_id
pub async fn dashboard(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<DashboardQuery>,
) -> Result<impl Responder, ApiError> {
    let stats = state.reports.dashboard(user.id(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// GET /api/reports/dre?from&to
pub async fn dre(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<DreQuery>,
) -> Result<impl Responder, ApiError> {
    info!(user_id = %user.id(), from = ?query.from, to = ?query.to, "Received DRE request");
    let report = state.reports.dre(user.id(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::get().to(dashboard))
        .route("/reports/dre", web::get().to(dre));
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::{bearer, call};
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn test_inverted_range_rejected() {
        let resp = call(
            test::TestRequest::get()
                .uri("/api/reports/dre?from=2025-02-01&to=2025-01-01")
                .insert_header(bearer()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = call(
            test::TestRequest::get()
                .uri("/api/dashboard?from=2025-02-01&to=2025-01-01")
                .insert_header(bearer()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
