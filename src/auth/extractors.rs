use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use super::{dto::Profile, jwt::JwtKeys};
use crate::{error::AppError, state::AppState};

pub const TOKEN_COOKIE: &str = "token";

/// Authenticated caller, resolved from a bearer header or the `token` cookie.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Profile);

/// Authenticated caller whose admin flag is set.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Profile);

/// Bearer header first, then the `token` cookie.
pub(crate) fn find_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = find_token(&parts.headers)
            .ok_or_else(|| AppError::unauthenticated("Not authorized, no token"))?;

        let keys = JwtKeys::from_ref(state);
        let user_id = keys.verify(&token).map_err(|e| {
            warn!(error = %e, "token rejected");
            AppError::unauthenticated("Not authorized, token failed")
        })?;

        let user = state
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| {
                warn!(%user_id, "token subject no longer exists");
                AppError::unauthenticated("User not found")
            })?;

        Ok(AuthUser(user.into()))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            warn!(user_id = %user.id, "admin route refused");
            return Err(AppError::Forbidden("Not authorized as admin".into()));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header::COOKIE, HeaderValue, Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    use crate::auth::{repo::UserRepo, repo_types::NewUser};
    use crate::memory::MemoryStore;

    fn headers(pairs: &[(axum::http::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let h = headers(&[(AUTHORIZATION, "Bearer abc"), (COOKIE, "token=def")]);
        assert_eq!(find_token(&h).as_deref(), Some("abc"));
    }

    #[test]
    fn falls_back_to_cookie() {
        let h = headers(&[(COOKIE, "theme=dark; token=def")]);
        assert_eq!(find_token(&h).as_deref(), Some("def"));

        let h = headers(&[(AUTHORIZATION, "Basic Zm9vOmJhcg=="), (COOKIE, "token=def")]);
        assert_eq!(find_token(&h).as_deref(), Some("def"));
    }

    #[test]
    fn nothing_to_find() {
        assert_eq!(find_token(&HeaderMap::new()), None);
        assert_eq!(find_token(&headers(&[(AUTHORIZATION, "Bearer ")])), None);
        assert_eq!(find_token(&headers(&[(COOKIE, "token=")])), None);
    }

    async fn whoami(AuthUser(user): AuthUser) -> String {
        user.email
    }

    async fn admin_only(AdminUser(user): AdminUser) -> String {
        user.name
    }

    fn router(state: AppState) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route("/admin", get(admin_only))
            .with_state(state)
    }

    async fn status_for(state: &AppState, uri: &str, auth: Option<String>) -> StatusCode {
        let mut req = Request::builder().uri(uri);
        if let Some(value) = auth {
            req = req.header(AUTHORIZATION, value);
        }
        router(state.clone())
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn rejects_missing_invalid_and_stale_tokens() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);

        assert_eq!(status_for(&state, "/whoami", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_for(&state, "/whoami", Some("Bearer garbage".into())).await,
            StatusCode::UNAUTHORIZED
        );

        let ghost = keys.issue(uuid::Uuid::new_v4()).unwrap();
        assert_eq!(
            status_for(&state, "/whoami", Some(format!("Bearer {ghost}"))).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn admin_gate() {
        let store = MemoryStore::new();
        let state = AppState::with_memory(store.clone());
        let keys = JwtKeys::from_ref(&state);

        let user = store
            .create(NewUser {
                name: "plain".into(),
                email: "plain@x.com".into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap();
        let admin = store
            .create(NewUser {
                name: "boss".into(),
                email: "boss@x.com".into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap();
        assert!(store.set_admin(admin.id, true).await);

        let user_token = format!("Bearer {}", keys.issue(user.id).unwrap());
        let admin_token = format!("Bearer {}", keys.issue(admin.id).unwrap());

        assert_eq!(status_for(&state, "/whoami", Some(user_token.clone())).await, StatusCode::OK);
        assert_eq!(status_for(&state, "/admin", Some(user_token)).await, StatusCode::FORBIDDEN);
        assert_eq!(status_for(&state, "/admin", Some(admin_token)).await, StatusCode::OK);
        assert_eq!(status_for(&state, "/admin", None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_of_deleted_user_is_rejected() {
        let store = MemoryStore::new();
        let state = AppState::with_memory(store.clone());
        let keys = JwtKeys::from_ref(&state);

        let user = store
            .create(NewUser {
                name: "gone".into(),
                email: "gone@x.com".into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap();
        let token = format!("Bearer {}", keys.issue(user.id).unwrap());
        assert_eq!(status_for(&state, "/whoami", Some(token.clone())).await, StatusCode::OK);

        assert!(store.remove_user(user.id).await);
        assert_eq!(status_for(&state, "/whoami", Some(token)).await, StatusCode::UNAUTHORIZED);
    }
}
