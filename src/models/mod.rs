//! Data models for Bookhold

pub mod book;
pub mod identity;
pub mod librarian;
pub mod member;

// Re-export commonly used types
pub use book::{Book, BookStatus, BookUpdate, BookWithBorrower, NewBook};
pub use identity::{Identity, Role, SessionClaims};
pub use librarian::Librarian;
pub use member::{Member, MemberSummary, MemberWithBooks};
