use crate::api_error::ApiError;
use crate::auth::AuthUser;
use crate::http::AppState;
use crate::models::club::{ClubListQuery, ClubRequest};
use actix_web::{web, HttpResponse, Responder};
use tracing::info;
use uuid::Uuid;

/// POST /api/clubs
pub async fn create_club(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<ClubRequest>,
) -> Result<impl Responder, ApiError> {
    info!(user_id = %user.id(), name = %req.name, "Received create club request");
    let club = state.clubs.create(user.id(), req.into_inner()).await?;
    Ok(HttpResponse::Created().json(club))
}

/// GET /api/clubs
pub async fn list_clubs(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<ClubListQuery>,
) -> Result<impl Responder, ApiError> {
    let clubs = state.clubs.list(user.id(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(clubs))
}

/// GET /api/clubs/{id}
pub async fn get_club(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let club = state.clubs.get(user.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(club))
}

/// PUT /api/clubs/{id}
pub async fn update_club(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<ClubRequest>,
) -> Result<impl Responder, ApiError> {
    let club_id = path.into_inner();
    info!(club_id = %club_id, "Received update club request");
    let club = state.clubs.update(user.id(), club_id, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(club))
}

/// DELETE /api/clubs/{id}
pub async fn delete_club(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let club_id = path.into_inner();
    info!(club_id = %club_id, "Received delete club request");
    state.clubs.delete(user.id(), club_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/clubs")
            .route("", web::get().to(list_clubs))
            .route("", web::post().to(create_club))
            .route("/{id}", web::get().to(get_club))
            .route("/{id}", web::put().to(update_club))
            .route("/{id}", web::delete().to(delete_club)),
    );
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::{bearer, call, status_of};
    use actix_web::{http::StatusCode, test};
    use serde_json::json;

    #[actix_web::test]
    async fn test_requires_token() {
        let status = status_of(test::TestRequest::get().uri("/api/clubs")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_rejects_blank_name() {
        let resp = call(
            test::TestRequest::post()
                .uri("/api/clubs")
                .insert_header(bearer())
                .set_json(json!({ "name": "" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_malformed_json_uses_error_envelope() {
        let resp = call(
            test::TestRequest::post()
                .uri("/api/clubs")
                .insert_header(bearer())
                .insert_header(("Content-Type", "application/json"))
                .set_payload("{not json"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], 400);
    }

    #[actix_web::test]
    async fn test_invalid_id_is_not_routed() {
        let resp = call(test::TestRequest::get().uri("/api/clubs/not-a-uuid").insert_header(bearer())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
