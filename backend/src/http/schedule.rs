use crate::api_error::ApiError;
use crate::auth::AuthUser;
use crate::http::AppState;
use crate::models::schedule::{ScheduleEventRequest, ScheduleListQuery};
use actix_web::{web, HttpResponse, Responder};
use tracing::info;
use uuid::Uuid;

pub async fn create_event(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<ScheduleEventRequest>,
) -> Result<impl Responder, ApiError> {
    info!(user_id = %user.id(), title = %req.title, "Received create schedule event request");
    let event = state.schedule.create(user.id(), req.into_inner()).await?;
    Ok(HttpResponse::Created().json(event))
}

/// GET /api/schedule?from&to&limit
/// Defaults to upcoming events.
pub async fn list_events(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<ScheduleListQuery>,
) -> Result<impl Responder, ApiError> {
    let events = state.schedule.list(user.id(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(events))
}

pub async fn get_event(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let event = state.schedule.get(user.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(event))
}

pub async fn update_event(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<ScheduleEventRequest>,
) -> Result<impl Responder, ApiError> {
    let event = state
        .schedule
        .update(user.id(), path.into_inner(), req.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(event))
}

pub async fn delete_event(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    state.schedule.delete(user.id(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/schedule")
            .route("", web::get().to(list_events))
            .route("", web::post().to(create_event))
            .route("/{id}", web::get().to(get_event))
            .route("/{id}", web::put().to(update_event))
            .route("/{id}", web::delete().to(delete_event)),
    );
}
