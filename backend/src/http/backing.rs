use crate::api_error::ApiError;
use crate::auth::AuthUser;
use crate::http::AppState;
use crate::models::backing::*;
use crate::service::backing_service;
use actix_web::{web, HttpResponse, Responder};
use tracing::info;
use uuid::Uuid;

// =============================================================================
// OFFERS
// =============================================================================

/// POST /api/backing/offers
pub async fn create_offer(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<CreateOfferRequest>,
) -> Result<impl Responder, ApiError> {
    info!(
        user_id = %user.id(),
        tournament_id = %req.tournament_id,
        percentage_offered = %req.percentage_offered,
        markup = %req.markup,
        "Received create backing offer request"
    );
    let offer = state.backing.create_offer(user.id(), req.into_inner()).await?;
    Ok(HttpResponse::Created().json(offer))
}

/// GET /api/backing/offers?status&tournament_id
pub async fn list_offers(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<OfferListQuery>,
) -> Result<impl Responder, ApiError> {
    let offers = state.backing.list_offers(user.id(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(offers))
}

/// GET /api/backing/offers/{id}
pub async fn get_offer(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let offer = state.backing.get_offer(user.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(offer))
}

/// DELETE /api/backing/offers/{id}
pub async fn delete_offer(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let offer_id = path.into_inner();
    info!(offer_id = %offer_id, "Received delete backing offer request");
    state.backing.delete_offer(user.id(), offer_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/backing/offers/{id}/status
/// Open, close, reopen or cancel an offer.
pub async fn update_offer_status(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<UpdateOfferStatusRequest>,
) -> Result<impl Responder, ApiError> {
    let offer_id = path.into_inner();
    info!(offer_id = %offer_id, status = %req.status, "Received offer status change");
    let offer = state
        .backing
        .update_status(user.id(), offer_id, req.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(offer))
}

// =============================================================================
// INVESTMENTS
// =============================================================================

/// POST /api/backing/offers/{id}/investments
pub async fn add_investment(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<CreateInvestmentRequest>,
) -> Result<impl Responder, ApiError> {
    let offer_id = path.into_inner();
    info!(
        offer_id = %offer_id,
        backer = %req.backer_name,
        percentage = %req.percentage_bought,
        "Received investment request"
    );
    let investment = state
        .backing
        .add_investment(user.id(), offer_id, req.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(investment))
}

/// GET /api/backing/offers/{id}/investments
pub async fn list_investments(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let investments = state.backing.list_investments(user.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(investments))
}

/// DELETE /api/backing/investments/{id}
pub async fn delete_investment(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    state.backing.delete_investment(user.id(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// =============================================================================
// RESULTS & PAYOUTS
// =============================================================================

/// POST /api/backing/offers/{id}/result
/// Records the prize, creates the payouts and settles the offer.
pub async fn record_result(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<RecordResultRequest>,
) -> Result<impl Responder, ApiError> {
    let offer_id = path.into_inner();
    info!(offer_id = %offer_id, prize = %req.prize_amount, "Received backing result");
    let result = state
        .backing
        .record_result(user.id(), offer_id, req.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(result))
}

/// GET /api/backing/offers/{id}/result
pub async fn get_result(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let result = state.backing.get_result(user.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/backing/payouts?status&offer_id
pub async fn list_payouts(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PayoutListQuery>,
) -> Result<impl Responder, ApiError> {
    let payouts = state.backing.list_payouts(user.id(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(payouts))
}

/// POST /api/backing/payouts/{id}/paid
pub async fn mark_payout_paid(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let payout = state.backing.mark_payout_paid(user.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(payout))
}

/// POST /api/backing/quote
/// Arithmetic preview; nothing is stored.
pub async fn quote(_user: AuthUser, req: web::Json<BackingQuoteRequest>) -> Result<impl Responder, ApiError> {
    let quote = backing_service::quote(&req)?;
    Ok(HttpResponse::Ok().json(quote))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/backing")
            .route("/offers", web::get().to(list_offers))
            .route("/offers", web::post().to(create_offer))
            .route("/offers/{id}", web::get().to(get_offer))
            .route("/offers/{id}", web::delete().to(delete_offer))
            .route("/offers/{id}/status", web::post().to(update_offer_status))
            .route("/offers/{id}/investments", web::get().to(list_investments))
            .route("/offers/{id}/investments", web::post().to(add_investment))
            .route("/offers/{id}/result", web::get().to(get_result))
            .route("/offers/{id}/result", web::post().to(record_result))
            .route("/investments/{id}", web::delete().to(delete_investment))
            .route("/payouts", web::get().to(list_payouts))
            .route("/payouts/{id}/paid", web::post().to(mark_payout_paid))
            .route("/quote", web::post().to(quote)),
    );
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::{bearer, call, status_of};
    use actix_web::{http::StatusCode, test};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::str::FromStr;
    use uuid::Uuid;

    #[actix_web::test]
    async fn test_quote_computes_amounts() {
        let resp = call(
            test::TestRequest::post()
                .uri("/api/backing/quote")
                .insert_header(bearer())
                .set_json(json!({
                    "buy_in_amount": "1000",
                    "percentage_sold": "10",
                    "markup": "1.5",
                    "prize_amount": "5000"
                })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        let amount = |key: &str| Decimal::from_str(body[key].as_str().unwrap()).unwrap();
        assert_eq!(amount("amount_paid"), dec!(150));
        assert_eq!(amount("markup_premium"), dec!(50));
        assert_eq!(amount("net_prize"), dec!(4850));
    }

    #[actix_web::test]
    async fn test_quote_rejects_markup_out_of_range() {
        let resp = call(
            test::TestRequest::post()
                .uri("/api/backing/quote")
                .insert_header(bearer())
                .set_json(json!({ "buy_in_amount": "1000", "percentage_sold": "10", "markup": "0.8" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_quote_requires_token() {
        let status = status_of(
            test::TestRequest::post()
                .uri("/api/backing/quote")
                .set_json(json!({ "buy_in_amount": "1000", "percentage_sold": "10", "markup": "1" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_settled_cannot_be_set_directly() {
        let resp = call(
            test::TestRequest::post()
                .uri(&format!("/api/backing/offers/{}/status", Uuid::new_v4()))
                .insert_header(bearer())
                .set_json(json!({ "status": "settled" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_offer_with_bad_markup_rejected_before_database() {
        let resp = call(
            test::TestRequest::post()
                .uri("/api/backing/offers")
                .insert_header(bearer())
                .set_json(json!({
                    "tournament_id": Uuid::new_v4(),
                    "percentage_offered": "50",
                    "markup": "6"
                })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
