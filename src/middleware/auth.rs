use crate::{
    config::AuthConfig,
    database::connection::DbPool,
    models::{
        auth::Claims,
        member::{Member, MemberRole},
    },
    utils::helpers::ApiResponse,
};
use actix_web::{
    FromRequest, HttpRequest, HttpResponse, dev::Payload, error::InternalError, http::header,
    web,
};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Token expired")]
    Expired,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Verifies access tokens issued by the hosted auth provider.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The member behind the request's bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub auth_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub user_role: MemberRole,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.user_role == MemberRole::Admin
    }
}

fn reject(response: HttpResponse, message: &str) -> actix_web::Error {
    InternalError::from_response(message.to_string(), response).into()
}

fn unauthorized(message: &str) -> actix_web::Error {
    reject(
        HttpResponse::Unauthorized().json(ApiResponse::<()>::error(message.to_string())),
        message,
    )
}

fn forbidden(message: &str) -> actix_web::Error {
    reject(
        HttpResponse::Forbidden().json(ApiResponse::<()>::error(message.to_string())),
        message,
    )
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req).map(str::to_string);
        let verifier = req.app_data::<web::Data<TokenVerifier>>().cloned();
        let pool = req.app_data::<web::Data<DbPool>>().cloned();
        let path = req.path().to_string();

        Box::pin(async move {
            let token = token.ok_or_else(|| {
                warn!("Missing bearer token on {}", path);
                unauthorized("Authentication required")
            })?;

            let verifier = verifier.ok_or_else(|| {
                error!("TokenVerifier is not registered as app data");
                actix_web::error::ErrorInternalServerError("Authentication service error")
            })?;

            let claims = verifier.verify(&token).map_err(|e| {
                warn!("Rejected token on {}: {}", path, e);
                match e {
                    AuthError::Expired => unauthorized("Token expired"),
                    _ => unauthorized("Invalid token"),
                }
            })?;

            let email = claims
                .email
                .clone()
                .ok_or_else(|| forbidden("Token carries no email"))?;

            let pool = pool.ok_or_else(|| {
                error!("Database pool is not registered as app data");
                actix_web::error::ErrorInternalServerError("Authentication service error")
            })?;

            let member = Member::find_by_email(&pool, &email)
                .await
                .map_err(|e| {
                    error!("Failed to resolve member for {}: {}", email, e);
                    actix_web::error::ErrorInternalServerError("Authentication service error")
                })?
                .ok_or_else(|| {
                    warn!("No member profile for {}", email);
                    forbidden("No member profile for this account")
                })?;

            if !member.is_active {
                return Err(forbidden("Member account is inactive"));
            }

            Ok(AuthenticatedUser {
                auth_id: claims.sub,
                user_id: member.id,
                email: member.email,
                name: member.name,
                user_role: member.role,
            })
        })
    }
}
