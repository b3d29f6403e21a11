pub mod auth;
pub mod chat;
pub mod middleware;
pub mod protocol;
pub mod rejection;
pub mod rest;
pub mod sessions;
pub mod state;

// Re-export the pieces the binary needs to build the router.
pub use chat::chat_handler;
pub use middleware::require_auth;
pub use rest::ApiDoc;
