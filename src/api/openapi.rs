//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, librarian, member};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookhold API",
        version = "1.0.0",
        description = "Library lending REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Librarian
        librarian::signup,
        librarian::login,
        librarian::logout,
        librarian::me,
        librarian::list_members,
        librarian::delete_member,
        librarian::return_book,
        librarian::list_books,
        librarian::add_book,
        librarian::update_book,
        librarian::delete_book,
        // Member
        member::signup,
        member::login,
        member::logout,
        member::me,
        member::list_books,
        member::borrow,
        member::return_book,
        member::delete_account,
    ),
    components(
        schemas(
            // Accounts
            crate::models::identity::SignupRequest,
            crate::models::identity::LoginRequest,
            crate::models::Role,
            crate::models::Librarian,
            crate::models::Member,
            crate::models::MemberSummary,
            crate::models::MemberWithBooks,
            super::SessionResponse,
            // Books
            crate::models::Book,
            crate::models::book::BookStatusDoc,
            crate::models::BookWithBorrower,
            crate::models::NewBook,
            crate::models::BookUpdate,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SessionAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "librarian", description = "Librarian accounts, catalog and member administration"),
        (name = "member", description = "Member accounts, borrowing and returns")
    )
)]
pub struct ApiDoc;

/// Session token, sent as the `token` cookie or a bearer header
struct SessionAddon;

impl Modify for SessionAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("token"))),
        );
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
