pub mod collaborator;
pub mod document;
pub mod flag;
pub mod leave;
pub mod occurrence;
pub mod punch;
pub mod record;
pub mod session_record;
pub mod terms;
pub mod user;
