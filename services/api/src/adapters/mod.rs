pub mod backend;
pub mod db;
pub mod session;

pub use backend::HttpBackendAdapter;
pub use db::DbAdapter;
pub use session::DbSessionProvider;
