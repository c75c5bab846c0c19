use crate::api_error::ApiError;
use crate::auth::AuthUser;
use crate::http::AppState;
use crate::models::performance::{PerformanceListQuery, PerformanceRequest};
use actix_web::{web, HttpResponse, Responder};
use tracing::info;
use uuid::Uuid;

/// POST /api/performances
pub async fn create_performance(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<PerformanceRequest>,
) -> Result<impl Responder, ApiError> {
    info!(
        user_id = %user.id(),
        tournament_id = %req.tournament_id,
        played_on = %req.played_on,
        "Received record result request"
    );
    let performance = state.performances.create(user.id(), req.into_inner()).await?;
    Ok(HttpResponse::Created().json(performance))
}

/// GET /api/performances?tournament_id&club_id&from&to&itm_only&page&per_page
pub async fn list_performances(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PerformanceListQuery>,
) -> Result<impl Responder, ApiError> {
    let page = state.performances.list(user.id(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_performance(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let performance = state.performances.get(user.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(performance))
}

pub async fn update_performance(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<PerformanceRequest>,
) -> Result<impl Responder, ApiError> {
    let performance = state
        .performances
        .update(user.id(), path.into_inner(), req.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(performance))
}

pub async fn delete_performance(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    state.performances.delete(user.id(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/performances")
            .route("", web::get().to(list_performances))
            .route("", web::post().to(create_performance))
            .route("/{id}", web::get().to(get_performance))
            .route("/{id}", web::put().to(update_performance))
            .route("/{id}", web::delete().to(delete_performance)),
    );
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::{bearer, call};
    use actix_web::{http::StatusCode, test};
    use serde_json::json;
    use uuid::Uuid;

    #[actix_web::test]
    async fn test_position_beyond_field_rejected() {
        let resp = call(
            test::TestRequest::post()
                .uri("/api/performances")
                .insert_header(bearer())
                .set_json(json!({
                    "tournament_id": Uuid::new_v4(),
                    "played_on": "2025-02-10",
                    "buy_in_amount": "215.00",
                    "position": 120,
                    "field_size": 80
                })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_missing_tournament_is_bad_request() {
        let resp = call(
            test::TestRequest::post()
                .uri("/api/performances")
                .insert_header(bearer())
                .set_json(json!({ "played_on": "2025-02-10", "buy_in_amount": "215.00" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
