pub mod assistant;
pub mod db;
pub mod kv_store;
pub mod remote_auth;

pub use assistant::ScriptedAssistant;
pub use db::PgRowStore;
pub use kv_store::JsonFileStore;
pub use remote_auth::RemoteAuthAdapter;
