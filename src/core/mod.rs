pub mod admin;
pub mod dashboard;
pub mod device_store;
pub mod documents;
pub mod leave;
pub mod log;
pub mod occurrences;
pub mod profile;
pub mod punch;
pub mod session_context;
pub mod session_guard;
pub mod suggestion;
pub mod terms;
