pub mod auth;
pub mod guard;
pub mod middleware;
pub mod protocol;
pub mod refresh_task;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the main WebSocket handler to make it easily accessible
// to the binary that will build the web server router.
pub use middleware::load_session;
pub use rest::ApiDoc;
pub use ws_handler::ws_handler;
