use crate::api_error::ApiError;
use crate::auth::jwt_service::{Claims, JwtError, JwtService};
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Authentication middleware for protecting routes
pub struct AuthMiddleware {
    jwt_service: Rc<JwtService>,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self {
            jwt_service: Rc::new(jwt_service),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            jwt_service: self.jwt_service.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    jwt_service: Rc<JwtService>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let jwt_service = self.jwt_service.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let auth_header = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok());

            let Some(auth_value) = auth_header else {
                warn!(path = %req.path(), "Missing authorization header");
                return Err(ApiError::Unauthorized.into());
            };

            let Some(token) = auth_value.strip_prefix("Bearer ") else {
                warn!("Invalid authorization header format");
                return Err(ApiError::Unauthorized.into());
            };

            match jwt_service.validate_token(token) {
                Ok(claims) => {
                    debug!(user_id = %claims.sub, "Request authenticated");
                    req.extensions_mut().insert(claims);
                    service.call(req).await
                }
                Err(JwtError::TokenExpired) => {
                    warn!("Token expired");
                    Err(ApiError::Unauthorized.into())
                }
                Err(e) => {
                    warn!(error = %e, "Token validation failed");
                    Err(ApiError::Unauthorized.into())
                }
            }
        })
    }
}

/// The authenticated caller; every row the handlers touch is scoped to this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = req
            .extensions()
            .get::<Claims>()
            .and_then(|claims| claims.user_id().ok())
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized);
        ready(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt_service::test_support::{test_service, token_for};
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.id().to_string())
    }

    #[actix_web::test]
    async fn test_missing_header_rejected() {
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(test_service()))
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get().uri("/me").to_request();
        let result = test::try_call_service(&app, req).await;
        let err = result.err().expect("request must be rejected");
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_valid_token_reaches_handler() {
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(test_service()))
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let user_id = Uuid::new_v4();
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {}", token_for(&user_id.to_string(), 600))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert_eq!(body, user_id.to_string());
    }

    #[actix_web::test]
    async fn test_extractor_without_middleware_is_unauthorized() {
        let app = test::init_service(App::new().route("/me", web::get().to(whoami))).await;
        let req = test::TestRequest::get().uri("/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
