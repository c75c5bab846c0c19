use crate::api_error::ApiError;
use crate::auth::AuthUser;
use crate::http::AppState;
use crate::models::tournament::{TournamentListQuery, TournamentRequest};
use actix_web::{web, HttpResponse, Responder};
use tracing::info;
use uuid::Uuid;

/// POST /api/tournaments
pub async fn create_tournament(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<TournamentRequest>,
) -> Result<impl Responder, ApiError> {
    info!(
        user_id = %user.id(),
        name = %req.name,
        starts_at = %req.starts_at,
        "Received create tournament request"
    );
    let tournament = state.tournaments.create(user.id(), req.into_inner()).await?;
    Ok(HttpResponse::Created().json(tournament))
}

/// GET /api/tournaments?club_id&from&to&page&per_page
pub async fn list_tournaments(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<TournamentListQuery>,
) -> Result<impl Responder, ApiError> {
    let page = state.tournaments.list(user.id(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/tournaments/{id}
pub async fn get_tournament(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let tournament = state.tournaments.get(user.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tournament))
}

/// PUT /api/tournaments/{id}
pub async fn update_tournament(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<TournamentRequest>,
) -> Result<impl Responder, ApiError> {
    let tournament_id = path.into_inner();
    info!(tournament_id = %tournament_id, "Received update tournament request");
    let tournament = state
        .tournaments
        .update(user.id(), tournament_id, req.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(tournament))
}

/// DELETE /api/tournaments/{id}
pub async fn delete_tournament(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let tournament_id = path.into_inner();
    info!(tournament_id = %tournament_id, "Received delete tournament request");
    state.tournaments.delete(user.id(), tournament_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tournaments")
            .route("", web::get().to(list_tournaments))
            .route("", web::post().to(create_tournament))
            .route("/{id}", web::get().to(get_tournament))
            .route("/{id}", web::put().to(update_tournament))
            .route("/{id}", web::delete().to(delete_tournament)),
    );
}
