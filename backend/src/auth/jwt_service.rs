use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// JWT-related errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token validation failed: {0}")]
    TokenValidation(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token subject")]
    InvalidSubject,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            _ => JwtError::TokenValidation(err.to_string()),
        }
    }
}

/// Claims issued by the hosted auth provider. Only `sub` and `exp` are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::InvalidSubject)
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret_key: String,
    pub audience: Option<String>,
    pub leeway_seconds: u64,
}

/// Verifies bearer tokens; issuing them is the auth provider's job.
#[derive(Clone)]
pub struct JwtService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_seconds;
        match config.audience {
            Some(ref audience) => validation.set_audience(&[audience.as_str()]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            validation,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        // Reject tokens whose subject is not a user id up front.
        data.claims.user_id()?;
        Ok(data.claims)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub const TEST_SECRET: &str = "test_secret_key_for_unit_testing_12345";

    pub fn test_service() -> JwtService {
        JwtService::new(JwtConfig {
            secret_key: TEST_SECRET.to_string(),
            audience: None,
            leeway_seconds: 0,
        })
    }

    pub fn token_for(sub: &str, expires_in_secs: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            exp: now + expires_in_secs,
            iat: Some(now),
            email: Some("player@example.com".to_string()),
            role: Some("authenticated".to_string()),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_valid_token() {
        let service = test_service();
        let user_id = Uuid::new_v4();
        let claims = service.validate_token(&token_for(&user_id.to_string(), 600)).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.role.as_deref(), Some("authenticated"));
    }

    #[test]
    fn test_expired_token() {
        let service = test_service();
        let token = token_for(&Uuid::new_v4().to_string(), -3600);
        assert!(matches!(service.validate_token(&token), Err(JwtError::TokenExpired)));
    }

    #[test]
    fn test_wrong_secret() {
        let other = JwtService::new(JwtConfig {
            secret_key: "a_completely_different_secret_value".to_string(),
            audience: None,
            leeway_seconds: 0,
        });
        let token = token_for(&Uuid::new_v4().to_string(), 600);
        assert!(matches!(other.validate_token(&token), Err(JwtError::TokenValidation(_))));
    }

    #[test]
    fn test_non_uuid_subject() {
        let service = test_service();
        let token = token_for("not-a-uuid", 600);
        assert!(matches!(service.validate_token(&token), Err(JwtError::InvalidSubject)));
    }
}
