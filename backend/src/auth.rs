use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::Role,
    repository::RepositoryState,
};

/// Claims
///
/// Payload expected inside the bearer JWT issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the UUID of the user's profile row.
    pub sub: Uuid,
    /// Expiration time. Always validated.
    pub exp: usize,
    /// Issued at.
    pub iat: usize,
}

/// Principal
///
/// The resolved identity of an authenticated request. The core trusts this value
/// and never re-verifies the credential it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

/// Principal Extractor Implementation
///
/// Resolution order:
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing user.
/// 2. `Authorization: Bearer <jwt>`, decoded with the configured secret.
/// 3. Profile lookup, so deleted users lose access even with a live token.
///
/// Rejection: `AppError::Unauthorized` (401) on any failure.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(*principal);
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|id| Uuid::parse_str(id).ok());

            if let Some(user_id) = bypass_id {
                // The id must still map to a real profile so the role is loaded.
                match repo.get_user(user_id).await {
                    Ok(Some(user)) => {
                        let principal = Principal {
                            id: user.id,
                            role: user.role,
                        };
                        parts.extensions.insert(principal);
                        return Ok(principal);
                    }
                    Ok(None) => tracing::debug!(user = %user_id, "bypass id has no profile"),
                    Err(e) => tracing::error!(error = %e, "principal lookup failed"),
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!(?other, "rejected invalid token"),
            }
            AppError::Unauthorized
        })?;

        let user = repo
            .get_user(token_data.claims.sub)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "principal lookup failed");
                AppError::Unauthorized
            })?
            .ok_or(AppError::Unauthorized)?;

        let principal = Principal {
            id: user.id,
            role: user.role,
        };
        parts.extensions.insert(principal);
        Ok(principal)
    }
}
