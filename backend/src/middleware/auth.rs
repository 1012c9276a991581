//! Acting-user middleware
//!
//! Authentication happens upstream. The gateway forwards the authenticated
//! user's id in the `X-User-Id` header; every mutating operation records it
//! on the rows it writes.

use axum::{
    extract::Request,
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// User on whose behalf the request runs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActingUser {
    pub user_id: Uuid,
}

/// Parse the acting user from request headers
///
/// Returns `Ok(None)` when the header is absent and an error when it is
/// present but not a UUID.
pub fn parse_acting_user(headers: &HeaderMap) -> Result<Option<ActingUser>, AppError> {
    let Some(value) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    let user_id = value
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(|| AppError::Unauthorized("X-User-Id is not a valid UUID".to_string()))?;

    Ok(Some(ActingUser { user_id }))
}

/// Resolves `X-User-Id` once per request and stores it in the extensions
pub async fn acting_user_middleware(mut request: Request, next: Next) -> Response {
    match parse_acting_user(request.headers()) {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
        }
        Ok(None) => {}
        Err(err) => return err.into_response(),
    }

    next.run(request).await
}

/// Extractor for the acting user; rejects the request when none was supplied
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser(pub ActingUser);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.user_id
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<ActingUser>() {
            return Ok(CurrentUser(*user));
        }

        // Also works on routers mounted without the middleware
        parse_acting_user(&parts.headers)?
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("X-User-Id header is required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_missing_header_is_none() {
        let headers = HeaderMap::new();
        assert_eq!(parse_acting_user(&headers).unwrap(), None);
    }

    #[test]
    fn test_valid_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(
            parse_acting_user(&headers).unwrap(),
            Some(ActingUser { user_id: id })
        );
    }

    #[test]
    fn test_garbage_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("admin"));
        assert!(matches!(
            parse_acting_user(&headers),
            Err(AppError::Unauthorized(_))
        ));
    }
}
