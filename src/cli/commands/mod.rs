pub mod admin;
pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod init;
pub mod leave;
pub mod log;
pub mod occurrences;
pub mod profile;
pub mod punch;
pub mod terms;
pub mod watch;

use crate::backend::local::LocalBackend;
use crate::config::Config;
use crate::core::device_store::DeviceStore;
use crate::core::session_context::{SessionContext, TerminalNotifier};
use crate::core::session_guard::GuardState;
use crate::errors::{AppError, AppResult};
use crate::utils::path::expand_tilde;
use std::fs;

/// Open the backend and restore this device's session.
pub(crate) fn open_context(cfg: &Config) -> AppResult<SessionContext<LocalBackend>> {
    let backend = LocalBackend::open(cfg)?;
    let devices = DeviceStore::new(Config::devices_dir());
    SessionContext::init(backend, devices, &cfg.device_name)
}

/// Restore the session and make sure it is still the owner of the account.
/// A session replaced by another device is closed here.
pub(crate) fn signed_in(cfg: &Config) -> AppResult<SessionContext<LocalBackend>> {
    let mut ctx = open_context(cfg)?;
    if !ctx.is_authenticated() {
        return Err(AppError::NotAuthenticated);
    }
    match ctx.process_notifications(&TerminalNotifier)? {
        GuardState::Active => Ok(ctx),
        GuardState::Revoked => Err(AppError::SessionExpired),
    }
}

/// [`signed_in`], with the current terms of use accepted.
pub(crate) fn accepted(cfg: &Config) -> AppResult<SessionContext<LocalBackend>> {
    let ctx = signed_in(cfg)?;
    crate::core::terms::require(&ctx)?;
    Ok(ctx)
}

pub(crate) fn read_file(path: &str) -> AppResult<(String, Vec<u8>)> {
    let p = expand_tilde(path);
    let bytes = fs::read(&p)?;
    Ok((crate::utils::path::file_name_of(&p), bytes))
}
