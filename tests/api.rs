//! HTTP-level tests driving the full router over the in-memory store

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bookhold_server::{api, store::MemoryStore, AppConfig, AppState};

fn app() -> Router {
    api::router(AppState::new(AppConfig::default(), Arc::new(MemoryStore::new())))
}

struct Reply {
    status: StatusCode,
    set_cookie: Option<String>,
    body: Value,
}

async fn call(app: &Router, method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> Reply {
    let mut request = Request::builder().method(method).uri(format!("/api/v1{}", uri));
    if let Some(token) = auth {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    Reply { status, set_cookie, body }
}

/// Sign up and log in, returning the session token
async fn account(app: &Router, role: &str, username: &str) -> String {
    let credentials = json!({ "username": username, "password": "secret" });
    let mut signup = credentials.clone();
    signup["name"] = json!(username);

    let reply = call(app, Method::POST, &format!("/{}/signup", role), None, Some(signup)).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);

    let reply = call(app, Method::POST, &format!("/{}/login", role), None, Some(credentials)).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    reply.body["data"]["token"].as_str().unwrap().to_string()
}

async fn add_book(app: &Router, librarian: &str, title: &str) -> String {
    let book = json!({ "title": title, "author": "Author", "description": "Description" });
    let reply = call(app, Method::POST, "/librarian/books", Some(librarian), Some(book)).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    reply.body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = app();

    let reply = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "healthy");

    let reply = call(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ready");
}

#[tokio::test]
async fn test_borrow_and_return_flow() {
    let app = app();
    let librarian = account(&app, "librarian", "lib@example.org").await;
    let alice = account(&app, "member", "alice@example.org").await;
    let bob = account(&app, "member", "bob@example.org").await;
    let book = add_book(&app, &librarian, "Dune").await;

    let reply = call(&app, Method::POST, &format!("/member/books/{}/borrow", book), Some(&alice), None).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["data"]["status"]["available"], false);
    assert!(reply.body["error"].is_null());

    let reply = call(&app, Method::GET, "/member/me", Some(&alice), None).await;
    assert_eq!(reply.body["data"]["books"][0]["title"], "Dune");
    assert!(reply.body["data"].get("password").is_none());

    // Second borrower is refused with an inline business error
    let reply = call(&app, Method::POST, &format!("/member/books/{}/borrow", book), Some(&bob), None).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["code"], "BookUnavailable");
    assert!(reply.body["data"].is_null());

    // Bob cannot return what Alice holds
    let reply = call(&app, Method::POST, &format!("/member/books/{}/return", book), Some(&bob), None).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["code"], "NotBorrowed");

    let reply = call(&app, Method::GET, "/librarian/books", Some(&librarian), None).await;
    assert_eq!(reply.body["data"][0]["borrower"]["username"], "alice@example.org");

    let reply = call(&app, Method::GET, "/member/books", Some(&bob), None).await;
    assert_eq!(reply.body["data"][0]["available"], false);
    assert!(reply.body["data"][0]["borrower"].is_null());

    let reply = call(&app, Method::POST, &format!("/member/books/{}/return", book), Some(&alice), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["status"]["available"], true);

    let reply = call(&app, Method::GET, "/member/me", Some(&alice), None).await;
    assert_eq!(reply.body["data"]["books"], json!([]));
}

#[tokio::test]
async fn test_librarian_deletes_member_and_book() {
    let app = app();
    let librarian = account(&app, "librarian", "lib@example.org").await;
    let alice = account(&app, "member", "alice@example.org").await;
    let (first, second) = (
        add_book(&app, &librarian, "First").await,
        add_book(&app, &librarian, "Second").await,
    );

    for book in [&first, &second] {
        let reply = call(&app, Method::POST, &format!("/member/books/{}/borrow", book), Some(&alice), None).await;
        assert_eq!(reply.status, StatusCode::OK);
    }

    // Deleting a borrowed book detaches it from the member
    let reply = call(&app, Method::DELETE, &format!("/librarian/books/{}", first), Some(&librarian), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let reply = call(&app, Method::GET, "/librarian/members", Some(&librarian), None).await;
    let books = reply.body["data"][0]["books"].as_array().unwrap().clone();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["title"], "Second");

    let member_id = reply.body["data"][0]["id"].as_str().unwrap().to_string();
    let reply = call(&app, Method::DELETE, &format!("/librarian/members/{}", member_id), Some(&librarian), None).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = call(&app, Method::GET, "/librarian/books", Some(&librarian), None).await;
    assert_eq!(reply.body["data"][0]["title"], "Second");
    assert_eq!(reply.body["data"][0]["available"], true);

    // The deleted member's token no longer reaches an account
    let reply = call(&app, Method::GET, "/member/me", Some(&alice), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = call(&app, Method::DELETE, &format!("/librarian/members/{}", member_id), Some(&librarian), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_librarian_returns_book_for_member() {
    let app = app();
    let librarian = account(&app, "librarian", "lib@example.org").await;
    let alice = account(&app, "member", "alice@example.org").await;
    let book = add_book(&app, &librarian, "Dune").await;
    call(&app, Method::POST, &format!("/member/books/{}/borrow", book), Some(&alice), None).await;

    let me = call(&app, Method::GET, "/member/me", Some(&alice), None).await;
    let member_id = me.body["data"]["id"].as_str().unwrap().to_string();

    let uri = format!("/librarian/members/{}/books/{}/return", member_id, book);
    let reply = call(&app, Method::POST, &uri, Some(&librarian), None).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = call(&app, Method::POST, &uri, Some(&librarian), None).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_member_deletes_own_account() {
    let app = app();
    let librarian = account(&app, "librarian", "lib@example.org").await;
    let alice = account(&app, "member", "alice@example.org").await;
    let book = add_book(&app, &librarian, "Dune").await;
    call(&app, Method::POST, &format!("/member/books/{}/borrow", book), Some(&alice), None).await;

    let reply = call(&app, Method::DELETE, "/member/account", Some(&alice), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.set_cookie.is_some());

    let reply = call(&app, Method::GET, "/librarian/members", Some(&librarian), None).await;
    assert_eq!(reply.body["data"], json!([]));
    let reply = call(&app, Method::GET, "/librarian/books", Some(&librarian), None).await;
    assert_eq!(reply.body["data"][0]["available"], true);
}

#[tokio::test]
async fn test_missing_or_wrong_session_is_unauthorized() {
    let app = app();
    let member = account(&app, "member", "alice@example.org").await;

    let reply = call(&app, Method::GET, "/librarian/books", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "Login required");

    let reply = call(&app, Method::GET, "/librarian/books", Some(&member), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["code"], "InvalidToken");

    let reply = call(&app, Method::GET, "/member/me", Some("garbage"), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "Login required");
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let app = app();
    account(&app, "member", "alice@example.org").await;

    let credentials = json!({ "username": "alice@example.org", "password": "secret" });
    let reply = call(&app, Method::POST, "/member/login", None, Some(credentials)).await;
    let cookie = reply.set_cookie.unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let pair = cookie.split(';').next().unwrap().to_string();
    let request = Request::builder()
        .uri("/api/v1/member/me")
        .header(header::COOKIE, pair)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let reply = call(&app, Method::POST, "/member/logout", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.set_cookie.unwrap().starts_with("token="));
}

#[tokio::test]
async fn test_bad_credentials_and_input() {
    let app = app();
    let librarian = account(&app, "librarian", "lib@example.org").await;

    let wrong = json!({ "username": "lib@example.org", "password": "nope" });
    let reply = call(&app, Method::POST, "/librarian/login", None, Some(wrong)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "Invalid username or password");

    let duplicate = json!({ "name": "Again", "username": "lib@example.org", "password": "x" });
    let reply = call(&app, Method::POST, "/librarian/signup", None, Some(duplicate)).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let not_email = json!({ "name": "Eve", "username": "eve", "password": "x" });
    let reply = call(&app, Method::POST, "/member/signup", None, Some(not_email)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], "ValidationError");

    let untitled = json!({ "title": "", "author": "A", "description": "D" });
    let reply = call(&app, Method::POST, "/librarian/books", Some(&librarian), Some(untitled)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "Title is required");

    let missing = format!("/librarian/books/{}", uuid::Uuid::new_v4());
    let reply = call(&app, Method::PUT, &missing, Some(&librarian), Some(json!({ "title": "X" }))).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_edit_book_keeps_loan() {
    let app = app();
    let librarian = account(&app, "librarian", "lib@example.org").await;
    let alice = account(&app, "member", "alice@example.org").await;
    let book = add_book(&app, &librarian, "Dune").await;
    call(&app, Method::POST, &format!("/member/books/{}/borrow", book), Some(&alice), None).await;

    let edit = json!({ "description": "Spice must flow" });
    let reply = call(&app, Method::PUT, &format!("/librarian/books/{}", book), Some(&librarian), Some(edit)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["description"], "Spice must flow");
    assert_eq!(reply.body["data"]["status"]["available"], false);
}

#[tokio::test]
async fn test_missing_required_field_is_validation_error() {
    let app = app();
    let librarian = account(&app, "librarian", "lib@example.org").await;

    let untitled = json!({ "author": "A", "description": "D" });
    let reply = call(&app, Method::POST, "/librarian/books", Some(&librarian), Some(untitled)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], "ValidationError");
    assert_eq!(reply.body["error"], "Title is required");
    assert!(reply.body["data"].is_null());

    let no_password = json!({ "name": "Eve", "username": "eve@example.org" });
    let reply = call(&app, Method::POST, "/member/signup", None, Some(no_password)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "Password is required");

    let reply = call(&app, Method::POST, "/member/login", None, Some(json!({ "username": "eve@example.org" }))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], "ValidationError");
}

#[tokio::test]
async fn test_bearer_header_is_used_when_cookie_does_not_verify() {
    let app = app();
    let librarian = account(&app, "librarian", "lib@example.org").await;
    let member = account(&app, "member", "alice@example.org").await;

    for stale in ["token=garbage".to_string(), format!("token={}", member)] {
        let request = Request::builder()
            .uri("/api/v1/librarian/me")
            .header(header::COOKIE, stale)
            .header(header::AUTHORIZATION, format!("Bearer {}", librarian))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let request = Request::builder()
        .uri("/api/v1/librarian/me")
        .header(header::COOKIE, format!("token={}", member))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
