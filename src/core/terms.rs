//! Terms of use gate: a user must accept the current version before using
//! the app. Acceptance is recorded once per version together with the
//! position the user was at.

use crate::backend::{Backend, Query};
use crate::core::punch::LocationProvider;
use crate::core::session_context::SessionContext;
use crate::db::log::Journal;
use crate::errors::{AppError, AppResult};
use crate::models::record::Record;
use crate::models::terms::TermAcceptance;
use crate::ui::messages::warning;
use chrono::{DateTime, Timelike, Utc};

pub const TERMS_VERSION: &str = "1.0";

/// Recorded in place of a network address.
pub const ORIGIN: &str = "RPONTO_CLI";

pub const TERMS_TEXT: &str = "Para continuar utilizando o rPonto, você deve aceitar os novos termos de uso.";
pub const LOCATION_NOTICE: &str = "* Ao aceitar, sua localização será registrada para fins de auditoria.";

/// The user's acceptance of the current version, if any.
pub fn current<B: Backend + Journal>(ctx: &SessionContext<B>) -> AppResult<Option<TermAcceptance>> {
    let user = ctx.user()?;
    let rows = ctx.backend().select(
        &Query::table(TermAcceptance::TABLE)
            .eq("user_id", user.id.as_str())
            .eq("term_version", TERMS_VERSION)
            .limit(1),
    )?;
    rows.into_iter().next().map(TermAcceptance::from_row).transpose()
}

/// Whether the current version was accepted. A failed lookup counts as
/// not accepted.
pub fn has_accepted<B: Backend + Journal>(ctx: &SessionContext<B>) -> bool {
    match current(ctx) {
        Ok(found) => found.is_some(),
        Err(e) => {
            warning(format!("Could not check the terms of use: {}", e));
            false
        }
    }
}

/// Fail with [`AppError::TermsNotAccepted`] until the current version is accepted.
pub fn require<B: Backend + Journal>(ctx: &SessionContext<B>) -> AppResult<()> {
    if has_accepted(ctx) {
        Ok(())
    } else {
        Err(AppError::TermsNotAccepted(TERMS_VERSION.to_string()))
    }
}

/// Accept the current version. Location permission is mandatory; an
/// earlier acceptance of the same version is returned unchanged.
pub fn accept<B: Backend + Journal>(
    ctx: &SessionContext<B>,
    location: &dyn LocationProvider,
    now: DateTime<Utc>,
) -> AppResult<TermAcceptance> {
    let user = ctx.user()?;
    if let Some(existing) = current(ctx)? {
        return Ok(existing);
    }

    if !location.request_permission() {
        return Err(AppError::LocationDenied);
    }
    let sample = location.current_position()?;

    let at = now.with_nanosecond(0).unwrap_or(now);
    let acceptance = TermAcceptance::new(&user.id, TERMS_VERSION, ORIGIN, sample, at);

    let backend = ctx.backend();
    let stored = match backend.insert(TermAcceptance::TABLE, acceptance.to_row()?) {
        Ok(row) => row,
        Err(e) => {
            warning(format!("Terms acceptance not recorded: {}", e));
            backend.journal("terms_failed", &user.id, &e.to_string());
            return Err(e);
        }
    };

    backend.journal(
        "terms_accepted",
        &user.id,
        &format!("Terms version {} accepted", TERMS_VERSION),
    );
    TermAcceptance::from_row(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::local::{BackendSettings, LocalBackend};
    use crate::backend::storage::FsStorage;
    use crate::backend::RecordStore;
    use crate::core::device_store::DeviceStore;
    use crate::core::punch::FixedLocation;
    use crate::models::punch::LocationSample;
    use tempfile::TempDir;

    fn signed_in(dir: &TempDir) -> SessionContext<LocalBackend> {
        let pool = crate::db::initialize::open_initialized(&dir.path().join("t.sqlite").to_string_lossy()).unwrap();
        let b = LocalBackend::new(
            pool,
            FsStorage::new(dir.path().join("storage"), "http://files.test"),
            BackendSettings::default(),
        );
        b.create_user("ana@example.com", "pw").unwrap();
        let mut ctx = SessionContext::init(b, DeviceStore::new(dir.path().join("dev")), "phone").unwrap();
        ctx.sign_in("ana@example.com", "pw").unwrap();
        ctx
    }

    fn here() -> FixedLocation {
        FixedLocation {
            sample: Some(LocationSample {
                lat: -23.55,
                lng: -46.63,
                accuracy: Some(8.0),
                is_mocked: false,
            }),
        }
    }

    #[test]
    fn acceptance_needs_the_location() {
        let dir = TempDir::new().unwrap();
        let ctx = signed_in(&dir);

        assert!(!has_accepted(&ctx));
        assert!(matches!(require(&ctx), Err(AppError::TermsNotAccepted(v)) if v == "1.0"));
        assert!(matches!(
            accept(&ctx, &FixedLocation { sample: None }, Utc::now()),
            Err(AppError::LocationDenied)
        ));
        assert!(!has_accepted(&ctx));

        let a = accept(&ctx, &here(), Utc::now()).unwrap();
        assert_eq!(a.term_version, TERMS_VERSION);
        assert_eq!(a.ip_address, ORIGIN);
        assert_eq!((a.lat, a.accuracy), (-23.55, Some(8.0)));
        assert!(has_accepted(&ctx));
        require(&ctx).unwrap();
    }

    #[test]
    fn accepting_twice_keeps_the_first_record() {
        let dir = TempDir::new().unwrap();
        let ctx = signed_in(&dir);
        let first = accept(&ctx, &here(), Utc::now()).unwrap();
        let again = accept(&ctx, &FixedLocation { sample: None }, Utc::now()).unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(
            ctx.backend().select(&Query::table(TermAcceptance::TABLE)).unwrap().len(),
            1
        );
    }

    #[test]
    fn older_versions_do_not_count() {
        let dir = TempDir::new().unwrap();
        let ctx = signed_in(&dir);
        let user_id = ctx.user().unwrap().id.clone();
        let old = TermAcceptance::new(&user_id, "0.9", ORIGIN, here().sample.unwrap(), Utc::now());
        ctx.backend()
            .insert(TermAcceptance::TABLE, old.to_row().unwrap())
            .unwrap();
        assert!(!has_accepted(&ctx));
    }

    #[test]
    fn signed_out_users_have_not_accepted() {
        let dir = TempDir::new().unwrap();
        let mut ctx = signed_in(&dir);
        accept(&ctx, &here(), Utc::now()).unwrap();
        ctx.sign_out().unwrap();
        assert!(!has_accepted(&ctx));
    }
}
