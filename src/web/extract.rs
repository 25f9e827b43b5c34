use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::Json;

use crate::auth::User;
use crate::error::AppError;
use crate::web::server::AppState;

/// Name of the session cookie set on login
pub const TOKEN_COOKIE: &str = "token";

/// Logged-in caller. Rejects with 401 when the token is missing or stale.
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

/// Session token from `Authorization: Bearer` or the `token` cookie
pub fn token_from_parts(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|t| !t.is_empty())
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts).ok_or(AppError::Unauthorized)?;
        let user = state.desk.authenticate(&token)?;
        Ok(CurrentUser { user, token })
    }
}

/// JSON request body whose parse failures come back as 400 `{"error": ...}`
pub struct Body<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for Body<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Body(value)),
            Err(rejection) => Err(AppError::validation(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    fn parts(header: (&str, &str)) -> Parts {
        let (parts, _) = HttpRequest::builder()
            .header(header.0, header.1)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_bearer_token() {
        let p = parts(("authorization", "Bearer abc123"));
        assert_eq!(token_from_parts(&p).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_cookie_token() {
        let p = parts(("cookie", "theme=dark; token=deadbeef; other=1"));
        assert_eq!(token_from_parts(&p).as_deref(), Some("deadbeef"));
    }

    #[test]
    fn test_missing_token() {
        let p = parts(("cookie", "theme=dark"));
        assert!(token_from_parts(&p).is_none());
        let p = parts(("authorization", "Basic Zm9v"));
        assert!(token_from_parts(&p).is_none());
    }
}
