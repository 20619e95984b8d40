//! Request extractors for the session principal

use axum::extract::{FromRef, FromRequestParts};
use http::request::Parts;

use super::session::SessionStore;
use crate::utils::AppError;

pub const SESSION_HEADER: &str = "x-session-token";

/// The wallet-identified caller behind a valid session
#[derive(Debug, Clone)]
pub struct Principal {
    pub address: String,
    pub user_key: String,
    pub nickname: String,
}

/// Present when a valid session accompanies the request, absent
/// otherwise; never rejects
#[derive(Debug, Clone)]
pub struct OptionalPrincipal(pub Option<Principal>);

async fn resolve(parts: &Parts, sessions: &SessionStore) -> Option<Principal> {
    let token = parts
        .headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())?;
    let session = sessions.get(token).await?;
    Some(Principal {
        address: session.address,
        user_key: session.user_key,
        nickname: session.nickname,
    })
}

impl<S> FromRequestParts<S> for Principal
where
    SessionStore: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionStore::from_ref(state);
        let has_header = parts.headers.contains_key(SESSION_HEADER);
        match resolve(parts, &sessions).await {
            Some(principal) => Ok(principal),
            // A presented-but-dead token reads as expired, no token as missing
            None if has_header => Err(AppError::SessionExpired),
            None => Err(AppError::Unauthorized),
        }
    }
}

impl<S> FromRequestParts<S> for OptionalPrincipal
where
    SessionStore: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionStore::from_ref(state);
        Ok(OptionalPrincipal(resolve(parts, &sessions).await))
    }
}
