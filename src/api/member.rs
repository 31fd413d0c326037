//! Member endpoints: account, catalog browsing, borrowing and returns

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        identity::{LoginRequest, SignupRequest},
        Book, BookWithBorrower, MemberWithBooks, Role,
    },
    AppState,
};

use super::{expired_session_cookie, session_cookie, AuthenticatedMember, Envelope, SessionResponse};

/// Register a member account
#[utoipa::path(
    post,
    path = "/member/signup",
    tag = "member",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Member created", body = MemberWithBooks),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Username already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(signup), _): WithRejection<Json<SignupRequest>, AppError>,
) -> AppResult<(StatusCode, Json<Envelope<MemberWithBooks>>)> {
    let member = state.services.auth.signup_member(&signup).await?;
    let profile = state.services.catalog.member_profile(member.id).await?;
    Ok(Envelope::created(profile))
}

/// Log in as a member
#[utoipa::path(
    post,
    path = "/member/login",
    tag = "member",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued, cookie set", body = SessionResponse),
        (status = 401, description = "Invalid username or password", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(login), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<(CookieJar, Json<Envelope<SessionResponse>>)> {
    let (token, identity) = state.services.auth.login(Role::Member, &login).await?;
    let jar = jar.add(session_cookie(&state, token.clone()));
    Ok((jar, Envelope::ok(SessionResponse::new(token, identity))))
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/member/logout",
    tag = "member",
    responses(
        (status = 200, description = "Session cookie cleared")
    )
)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Envelope<()>>) {
    (jar.remove(expired_session_cookie(&state)), Envelope::ok(()))
}

/// Get the logged-in member and the books they hold
#[utoipa::path(
    get,
    path = "/member/me",
    tag = "member",
    security(("session" = [])),
    responses(
        (status = 200, description = "Current member", body = MemberWithBooks),
        (status = 401, description = "Login required", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
) -> AppResult<Json<Envelope<MemberWithBooks>>> {
    let profile = state.services.catalog.member_profile(member_id).await?;
    Ok(Envelope::ok(profile))
}

/// Browse the catalog. Only the caller's own loans show a borrower.
#[utoipa::path(
    get,
    path = "/member/books",
    tag = "member",
    security(("session" = [])),
    responses(
        (status = 200, description = "Catalog", body = [BookWithBorrower]),
        (status = 401, description = "Login required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
) -> AppResult<Json<Envelope<Vec<BookWithBorrower>>>> {
    let books = state.services.catalog.list_books_for_member(member_id).await?;
    Ok(Envelope::ok(books))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/member/books/{book_id}/borrow",
    tag = "member",
    security(("session" = [])),
    params(
        ("book_id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book borrowed", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book not available", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow(
    State(state): State<AppState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<Envelope<Book>>> {
    let book = state.services.lending.borrow(member_id, book_id).await?;
    Ok(Envelope::ok(book))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/member/books/{book_id}/return",
    tag = "member",
    security(("session" = [])),
    params(
        ("book_id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book not borrowed by this member", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<Envelope<Book>>> {
    let book = state.services.lending.return_book(member_id, book_id).await?;
    Ok(Envelope::ok(book))
}

/// Delete the caller's account, returning every book they hold
#[utoipa::path(
    delete,
    path = "/member/account",
    tag = "member",
    security(("session" = [])),
    responses(
        (status = 200, description = "Account deleted, session cookie cleared"),
        (status = 401, description = "Login required", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Envelope<()>>)> {
    state.services.lending.delete_member(member_id).await?;
    Ok((jar.remove(expired_session_cookie(&state)), Envelope::ok(())))
}
