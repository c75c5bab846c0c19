use crate::api_error::ApiError;
use crate::auth::AuthUser;
use crate::http::AppState;
use crate::models::expense::{ExpenseListQuery, ExpenseRequest};
use actix_web::{web, HttpResponse, Responder};
use tracing::info;
use uuid::Uuid;

/// POST /api/expenses
pub async fn create_expense(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<ExpenseRequest>,
) -> Result<impl Responder, ApiError> {
    info!(user_id = %user.id(), category = %req.category, "Received create expense request");
    let expense = state.expenses.create(user.id(), req.into_inner()).await?;
    Ok(HttpResponse::Created().json(expense))
}

/// GET /api/expenses?category&from&to&page&per_page
pub async fn list_expenses(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<ExpenseListQuery>,
) -> Result<impl Responder, ApiError> {
    let page = state.expenses.list(user.id(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_expense(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let expense = state.expenses.get(user.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(expense))
}

pub async fn update_expense(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<ExpenseRequest>,
) -> Result<impl Responder, ApiError> {
    let expense = state
        .expenses
        .update(user.id(), path.into_inner(), req.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(expense))
}

pub async fn delete_expense(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let expense_id = path.into_inner();
    info!(expense_id = %expense_id, "Received delete expense request");
    state.expenses.delete(user.id(), expense_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/expenses")
            .route("", web::get().to(list_expenses))
            .route("", web::post().to(create_expense))
            .route("/{id}", web::get().to(get_expense))
            .route("/{id}", web::put().to(update_expense))
            .route("/{id}", web::delete().to(delete_expense)),
    );
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::{bearer, call};
    use actix_web::{http::StatusCode, test};
    use serde_json::json;

    #[actix_web::test]
    async fn test_zero_amount_rejected() {
        let resp = call(
            test::TestRequest::post()
                .uri("/api/expenses")
                .insert_header(bearer())
                .set_json(json!({
                    "category": "travel",
                    "amount": "0",
                    "description": "Bus to Sao Paulo",
                    "spent_on": "2025-04-01"
                })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_unknown_category_filter_rejected() {
        let resp = call(
            test::TestRequest::get()
                .uri("/api/expenses?category=casino")
                .insert_header(bearer()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
