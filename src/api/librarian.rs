//! Librarian endpoints: account, catalog management and member administration

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
        Book, BookUpdate, BookWithBorrower, Librarian, MemberWithBooks, NewBook, Role,
    },
    AppState,
};

use super::{expired_session_cookie, session_cookie, AuthenticatedLibrarian, Envelope, SessionResponse};

/// Register a librarian account
#[utoipa::path(
    post,
    path = "/librarian/signup",
    tag = "librarian",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Librarian created", body = Librarian),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Username already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(signup), _): WithRejection<Json<SignupRequest>, AppError>,
) -> AppResult<(StatusCode, Json<Envelope<Librarian>>)> {
    let librarian = state.services.auth.signup_librarian(&signup).await?;
    Ok(Envelope::created(librarian))
}

/// Log in as a librarian
#[utoipa::path(
    post,
    path = "/librarian/login",
    tag = "librarian",
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
    let (token, identity) = state.services.auth.login(Role::Librarian, &login).await?;
    let jar = jar.add(session_cookie(&state, token.clone()));
    Ok((jar, Envelope::ok(SessionResponse::new(token, identity))))
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/librarian/logout",
    tag = "librarian",
    responses(
        (status = 200, description = "Session cookie cleared")
    )
)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Envelope<()>>) {
    (jar.remove(expired_session_cookie(&state)), Envelope::ok(()))
}

/// Get the logged-in librarian
#[utoipa::path(
    get,
    path = "/librarian/me",
    tag = "librarian",
    security(("session" = [])),
    responses(
        (status = 200, description = "Current librarian", body = Librarian),
        (status = 401, description = "Login required", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedLibrarian(librarian_id): AuthenticatedLibrarian,
) -> AppResult<Json<Envelope<Librarian>>> {
    let librarian = state.services.catalog.librarian_profile(librarian_id).await?;
    Ok(Envelope::ok(librarian))
}

/// List members with the books they hold
#[utoipa::path(
    get,
    path = "/librarian/members",
    tag = "librarian",
    security(("session" = [])),
    responses(
        (status = 200, description = "Members with borrowed books", body = [MemberWithBooks]),
        (status = 401, description = "Login required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    AuthenticatedLibrarian(_librarian): AuthenticatedLibrarian,
) -> AppResult<Json<Envelope<Vec<MemberWithBooks>>>> {
    let members = state.services.catalog.list_members().await?;
    Ok(Envelope::ok(members))
}

/// Delete a member, returning every book they hold
#[utoipa::path(
    delete,
    path = "/librarian/members/{member_id}",
    tag = "librarian",
    security(("session" = [])),
    params(
        ("member_id" = Uuid, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member deleted"),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_member(
    State(state): State<AppState>,
    AuthenticatedLibrarian(_librarian): AuthenticatedLibrarian,
    Path(member_id): Path<Uuid>,
) -> AppResult<Json<Envelope<()>>> {
    state.services.lending.delete_member(member_id).await?;
    Ok(Envelope::ok(()))
}

/// Check a book back in on behalf of a member
#[utoipa::path(
    post,
    path = "/librarian/members/{member_id}/books/{book_id}/return",
    tag = "librarian",
    security(("session" = [])),
    params(
        ("member_id" = Uuid, Path, description = "Member ID"),
        ("book_id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = Book),
        (status = 404, description = "Member or book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book not borrowed by this member", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedLibrarian(_librarian): AuthenticatedLibrarian,
    Path((member_id, book_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Envelope<Book>>> {
    let book = state.services.lending.return_book(member_id, book_id).await?;
    Ok(Envelope::ok(book))
}

/// List every book with its borrower
#[utoipa::path(
    get,
    path = "/librarian/books",
    tag = "librarian",
    security(("session" = [])),
    responses(
        (status = 200, description = "Catalog", body = [BookWithBorrower]),
        (status = 401, description = "Login required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedLibrarian(_librarian): AuthenticatedLibrarian,
) -> AppResult<Json<Envelope<Vec<BookWithBorrower>>>> {
    let books = state.services.catalog.list_books().await?;
    Ok(Envelope::ok(books))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/librarian/books",
    tag = "librarian",
    security(("session" = [])),
    request_body = NewBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Missing required field", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_book(
    State(state): State<AppState>,
    AuthenticatedLibrarian(_librarian): AuthenticatedLibrarian,
    WithRejection(Json(book), _): WithRejection<Json<NewBook>, AppError>,
) -> AppResult<(StatusCode, Json<Envelope<Book>>)> {
    let book = state.services.catalog.add_book(&book).await?;
    Ok(Envelope::created(book))
}

/// Edit a book's descriptive fields
#[utoipa::path(
    put,
    path = "/librarian/books/{book_id}",
    tag = "librarian",
    security(("session" = [])),
    params(
        ("book_id" = Uuid, Path, description = "Book ID")
    ),
    request_body = BookUpdate,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedLibrarian(_librarian): AuthenticatedLibrarian,
    Path(book_id): Path<Uuid>,
    WithRejection(Json(update), _): WithRejection<Json<BookUpdate>, AppError>,
) -> AppResult<Json<Envelope<Book>>> {
    let book = state.services.catalog.update_book(book_id, &update).await?;
    Ok(Envelope::ok(book))
}

/// Remove a book from the catalog, detaching it from its borrower
#[utoipa::path(
    delete,
    path = "/librarian/books/{book_id}",
    tag = "librarian",
    security(("session" = [])),
    params(
        ("book_id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book deleted"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book kept changing during delete", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedLibrarian(_librarian): AuthenticatedLibrarian,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<Envelope<()>>> {
    state.services.lending.delete_book(book_id).await?;
    Ok(Envelope::ok(()))
}
