use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, Profile, RegisterRequest},
        extractors::{AuthUser, TOKEN_COOKIE},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::CreateUserError,
        repo_types::NewUser,
    },
    error::{AppError, AppResult, MessageBody},
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/profile", get(profile))
}

fn token_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let keys = JwtKeys::from_ref(state);
    let mut cookie = Cookie::new(TOKEN_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(state.config.production);
    cookie.set_max_age(time::Duration::seconds(keys.ttl().as_secs() as i64));
    cookie
}

#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let Json(payload) = payload.map_err(|e| AppError::invalid_input(e.body_text()))?;

    if payload.name.trim().is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::invalid_input("Name, email and password are required"));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::invalid_input("Invalid email"));
    }

    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("User already exists".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(NewUser {
            name: payload.name,
            email: payload.email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            CreateUserError::EmailTaken => AppError::Conflict("User already exists".into()),
            CreateUserError::Store(e) => AppError::Internal(e),
        })?;

    let token = JwtKeys::from_ref(&state).issue(user.id)?;
    let jar = jar.add(token_cookie(&state, token.clone()));

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            token,
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let Json(payload) = payload.map_err(|e| AppError::invalid_input(e.body_text()))?;

    let Some(user) = state.users.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    let token = JwtKeys::from_ref(&state).issue(user.id)?;
    let jar = jar.add(token_cookie(&state, token.clone()));

    info!(user_id = %user.id, "user logged in");
    Ok((
        jar,
        Json(AuthResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            token,
        }),
    ))
}

#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<MessageBody>) {
    let mut removal = Cookie::new(TOKEN_COOKIE, "");
    removal.set_path("/");
    removal.set_http_only(true);
    removal.set_same_site(SameSite::Lax);
    removal.set_secure(state.config.production);
    removal.set_max_age(time::Duration::seconds(0));

    // Always sent, even when the request carried no cookie.
    (jar.add(removal), Json(MessageBody::new("Logged out successfully")))
}

#[instrument(skip(state, caller), fields(user_id = %caller.0.id))]
pub async fn profile(State(state): State<AppState>, caller: AuthUser) -> AppResult<Json<Profile>> {
    let AuthUser(caller) = caller;
    let user = state
        .users
        .find_by_id(caller.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("Mixed.Case@Example.org"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("no-at.com"));
        assert!(!is_valid_email("sp ace@x.com"));
    }

    #[test]
    fn login_cookie_attributes() {
        let state = AppState::fake();
        let cookie = token_cookie(&state, "abc".into());
        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(30)));
    }

    #[test]
    fn production_cookie_is_secure() {
        let mut state = AppState::fake();
        let mut config = (*state.config).clone();
        config.production = true;
        state.config = std::sync::Arc::new(config);

        let cookie = token_cookie(&state, "abc".into());
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
