//! API handlers for Bookhold REST endpoints

pub mod health;
pub mod librarian;
pub mod member;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Identity, Role},
    AppState,
};

/// Successful response body: `error` is always null
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub error: Option<String>,
    pub status: u16,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            data,
            error: None,
            status: StatusCode::OK.as_u16(),
        })
    }

    pub fn created(data: T) -> (StatusCode, Json<Self>) {
        (
            StatusCode::CREATED,
            Json(Self {
                data,
                error: None,
                status: StatusCode::CREATED.as_u16(),
            }),
        )
    }
}

/// Session issued on login
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    /// Signed session token, also set as an HTTP-only cookie
    pub token: String,
    pub role: Role,
    pub subject_id: Uuid,
}

impl SessionResponse {
    fn new(token: String, identity: Identity) -> Self {
        Self {
            token,
            role: identity.role,
            subject_id: identity.subject_id,
        }
    }
}

/// Extractor for a logged-in member
pub struct AuthenticatedMember(pub Uuid);

/// Extractor for a logged-in librarian
pub struct AuthenticatedLibrarian(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedMember {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = authenticate(parts, state, Role::Member)?;
        Ok(AuthenticatedMember(identity.subject_id))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedLibrarian {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = authenticate(parts, state, Role::Librarian)?;
        Ok(AuthenticatedLibrarian(identity.subject_id))
    }
}

/// The first presented token that verifies for `role` wins
fn authenticate(parts: &Parts, state: &AppState, role: Role) -> Result<Identity, AppError> {
    let mut rejection = AppError::InvalidToken("Missing session token".to_string());
    for token in session_tokens(parts, &state.config.auth.cookie_name) {
        match state.services.auth.tokens().verify_role(&token, role) {
            Ok(identity) => return Ok(identity),
            Err(e) => rejection = e,
        }
    }
    Err(rejection)
}

/// Session cookie, then `Authorization: Bearer`
fn session_tokens(parts: &Parts, cookie_name: &str) -> Vec<String> {
    let cookie = CookieJar::from_headers(&parts.headers)
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string());

    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    cookie.into_iter().chain(bearer).collect()
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((state.config.auth.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn expired_session_cookie(state: &AppState) -> Cookie<'static> {
    Cookie::build(state.config.auth.cookie_name.clone()).path("/").build()
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Librarian
        .route("/librarian/signup", post(librarian::signup))
        .route("/librarian/login", post(librarian::login))
        .route("/librarian/logout", post(librarian::logout))
        .route("/librarian/me", get(librarian::me))
        .route("/librarian/members", get(librarian::list_members))
        .route("/librarian/members/:member_id", delete(librarian::delete_member))
        .route(
            "/librarian/members/:member_id/books/:book_id/return",
            post(librarian::return_book),
        )
        .route("/librarian/books", get(librarian::list_books).post(librarian::add_book))
        .route(
            "/librarian/books/:book_id",
            put(librarian::update_book).delete(librarian::delete_book),
        )
        // Member
        .route("/member/signup", post(member::signup))
        .route("/member/login", post(member::login))
        .route("/member/logout", post(member::logout))
        .route("/member/me", get(member::me))
        .route("/member/books", get(member::list_books))
        .route("/member/books/:book_id/borrow", post(member::borrow))
        .route("/member/books/:book_id/return", post(member::return_book))
        .route("/member/account", delete(member::delete_account))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
