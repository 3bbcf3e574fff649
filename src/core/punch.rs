use crate::backend::Backend;
use crate::backend::rpc::TIME_HISTORY;
use crate::core::session_context::SessionContext;
use crate::db::log::Journal;
use crate::errors::{AppError, AppResult};
use crate::models::punch::{LocationSample, Punch, PunchKind};
use crate::models::record::{Record, from_rows};
use crate::ui::messages::warning;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Timelike, Utc};
use serde_json::{Value, json};

/// Identity confirmation before a punch (fingerprint, face unlock…).
pub trait BiometricAuthenticator {
    /// Whether the device can confirm identity at all.
    fn is_available(&self) -> bool;

    fn confirm(&self, prompt: &str) -> bool;
}

pub trait LocationProvider {
    /// Ask for the location permission; `false` when the user refused.
    fn request_permission(&self) -> bool;

    fn current_position(&self) -> AppResult<LocationSample>;
}

pub struct PunchLogic;

impl PunchLogic {
    /// Record a punch for the signed-in user.
    ///
    /// Biometric and location checks run before anything is written: a
    /// failed confirmation, a refused permission or an unresolved position
    /// aborts the punch. A mocked position is recorded but flagged.
    pub fn clock_in<B: Backend + Journal>(
        ctx: &SessionContext<B>,
        kind: PunchKind,
        biometric: &dyn BiometricAuthenticator,
        location: &dyn LocationProvider,
        now: DateTime<Utc>,
    ) -> AppResult<Punch> {
        let user = ctx.user()?;

        if biometric.is_available() && !biometric.confirm("Confirme sua identidade para bater o ponto") {
            return Err(AppError::BiometricFailed);
        }

        if !location.request_permission() {
            return Err(AppError::LocationDenied);
        }
        let sample = location.current_position()?;

        let clock_in = now.with_nanosecond(0).unwrap_or(now);
        let punch = Punch::new(&user.id, kind, clock_in, sample, ctx.device());

        let backend = ctx.backend();
        let stored = match backend.insert(Punch::TABLE, punch.to_row()?) {
            Ok(row) => row,
            Err(e) => {
                warning(format!("Punch not recorded: {}", e));
                backend.journal("punch_failed", &user.id, &e.to_string());
                return Err(e);
            }
        };
        let stored = Punch::from_row(stored)?;

        backend.journal(
            "punch",
            &user.id,
            &format!(
                "{} at {} ({})",
                stored.kind.to_db_str(),
                stored.clock_in.to_rfc3339_opts(SecondsFormat::Secs, true),
                stored.status.to_db_str()
            ),
        );
        Ok(stored)
    }

    /// The user's punches between two local calendar days (inclusive),
    /// most recent first.
    pub fn history<B: Backend + Journal>(
        ctx: &SessionContext<B>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Punch>> {
        let user = ctx.user()?;
        let params = json!({
            "p_user_id": user.id,
            "p_start_date": local_bound(start, NaiveTime::MIN),
            "p_end_date": local_bound(end, NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)),
        });

        let rows = match ctx.backend().rpc(TIME_HISTORY, params)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| v.as_object().cloned())
                .collect(),
            other => {
                return Err(AppError::Backend(format!(
                    "unexpected time history payload: {other}"
                )));
            }
        };
        from_rows(rows)
    }

    /// Today's punches, most recent first. Read failures give an empty day.
    pub fn today<B: Backend + Journal>(ctx: &SessionContext<B>, today: NaiveDate) -> AppResult<Vec<Punch>> {
        ctx.user()?;
        match Self::history(ctx, today, today) {
            Ok(p) => Ok(p),
            Err(e) => {
                warning(format!("Could not load today's punches: {}", e));
                Ok(Vec::new())
            }
        }
    }
}

fn local_bound(day: NaiveDate, time: NaiveTime) -> String {
    let naive = day.and_time(time);
    let at = Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive));
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Position given on the command line; no coordinates means no permission.
pub struct FixedLocation {
    pub sample: Option<LocationSample>,
}

impl LocationProvider for FixedLocation {
    fn request_permission(&self) -> bool {
        self.sample.is_some()
    }

    fn current_position(&self) -> AppResult<LocationSample> {
        self.sample.ok_or(AppError::LocationDenied)
    }
}

/// Biometric outcome chosen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BiometricMode {
    Ok,
    Failed,
    Unsupported,
}

impl BiometricAuthenticator for BiometricMode {
    fn is_available(&self) -> bool {
        !matches!(self, BiometricMode::Unsupported)
    }

    fn confirm(&self, _prompt: &str) -> bool {
        matches!(self, BiometricMode::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::local::{BackendSettings, LocalBackend};
    use crate::backend::storage::FsStorage;
    use crate::backend::{Query, RecordStore};
    use crate::core::device_store::DeviceStore;
    use crate::core::suggestion::suggest;
    use crate::models::punch::PunchStatus;
    use chrono::Duration;
    use tempfile::TempDir;

    fn signed_in(dir: &TempDir) -> SessionContext<LocalBackend> {
        let db = dir.path().join("p.sqlite");
        let pool = crate::db::initialize::open_initialized(&db.to_string_lossy()).unwrap();
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

    fn at(lat: f64, mocked: bool) -> FixedLocation {
        FixedLocation {
            sample: Some(LocationSample {
                lat,
                lng: -46.63,
                accuracy: Some(12.5),
                is_mocked: mocked,
            }),
        }
    }

    fn count(ctx: &SessionContext<LocalBackend>) -> usize {
        ctx.backend().select(&Query::table("time_entries")).unwrap().len()
    }

    #[test]
    fn mocked_location_is_recorded_as_flagged() {
        let dir = TempDir::new().unwrap();
        let ctx = signed_in(&dir);
        let now = Utc::now();

        let p = PunchLogic::clock_in(&ctx, PunchKind::Entry, &BiometricMode::Ok, &at(-23.55, true), now).unwrap();
        assert_eq!(p.status, PunchStatus::Flagged);
        assert!(p.is_mocked);

        let q = PunchLogic::clock_in(
            &ctx,
            PunchKind::BreakStart,
            &BiometricMode::Unsupported,
            &at(-23.55, false),
            now + Duration::seconds(5),
        )
        .unwrap();
        assert_eq!(q.status, PunchStatus::Valid);

        let back = PunchLogic::history(&ctx, now.with_timezone(&Local).date_naive(), now.with_timezone(&Local).date_naive()).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].status, PunchStatus::Valid);
        assert_eq!(back[1].status, PunchStatus::Flagged);
        assert_eq!(back[1].accuracy, Some(12.5));
    }

    #[test]
    fn failures_abort_before_writing() {
        let dir = TempDir::new().unwrap();
        let ctx = signed_in(&dir);

        let denied = FixedLocation { sample: None };
        assert!(matches!(
            PunchLogic::clock_in(&ctx, PunchKind::Entry, &BiometricMode::Ok, &denied, Utc::now()),
            Err(AppError::LocationDenied)
        ));
        assert!(matches!(
            PunchLogic::clock_in(&ctx, PunchKind::Entry, &BiometricMode::Failed, &at(1.0, false), Utc::now()),
            Err(AppError::BiometricFailed)
        ));
        assert_eq!(count(&ctx), 0);
    }

    #[test]
    fn suggestion_follows_the_latest_punch() {
        let dir = TempDir::new().unwrap();
        let ctx = signed_in(&dir);
        let today = Local::now().date_naive();
        let noon = Local
            .from_local_datetime(&today.and_hms_opt(12, 0, 0).unwrap())
            .earliest()
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(suggest(&PunchLogic::today(&ctx, today).unwrap()).label, "ENTRADA");

        for (i, kind) in PunchKind::ALL.into_iter().enumerate() {
            PunchLogic::clock_in(
                &ctx,
                kind,
                &BiometricMode::Ok,
                &at(0.0, false),
                noon + Duration::minutes(i as i64 * 60),
            )
            .unwrap();
        }
        let s = suggest(&PunchLogic::today(&ctx, today).unwrap());
        assert_eq!((s.kind, s.label), (PunchKind::Entry, "NOVA ENTRADA"));
    }

    #[test]
    fn signed_out_users_cannot_punch() {
        let dir = TempDir::new().unwrap();
        let mut ctx = signed_in(&dir);
        ctx.sign_out().unwrap();
        assert!(matches!(
            PunchLogic::clock_in(&ctx, PunchKind::Entry, &BiometricMode::Ok, &at(0.0, false), Utc::now()),
            Err(AppError::NotAuthenticated)
        ));
    }
}
