//! Live refresh of the home screen: edits to the user's profile and any
//! change to their leave requests, as made by the back office.

use crate::backend::{Backend, ChangeEvent, ChangeFilter, EventKind, Subscription};
use crate::core::profile;
use crate::core::session_context::SessionContext;
use crate::db::log::Journal;
use crate::errors::AppResult;
use crate::models::collaborator::Collaborator;
use crate::models::leave::LeaveRequest;
use crate::models::record::Record;

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardUpdate {
    Profile(Collaborator),
    /// Deleted requests carry no row.
    Leave(EventKind, Option<LeaveRequest>),
}

#[derive(Debug)]
pub struct DashboardWatcher {
    collaborator_id: String,
    profile: Subscription,
    leave: Subscription,
}

impl DashboardWatcher {
    /// Start listening for the signed-in user's profile. Users without a
    /// profile have no dashboard to refresh.
    pub fn open<B: Backend + Journal>(ctx: &SessionContext<B>) -> AppResult<Option<Self>> {
        let Some(me) = profile::lookup_optional(ctx)? else {
            return Ok(None);
        };
        let backend = ctx.backend();
        let profile = backend.subscribe(
            ChangeFilter::new(Collaborator::TABLE, EventKind::Update).with_eq("id", me.id.as_str()),
        )?;
        let leave = backend.subscribe(
            ChangeFilter::new(LeaveRequest::TABLE, EventKind::Any)
                .with_eq("collaborator_id", me.id.as_str()),
        )?;
        Ok(Some(Self {
            collaborator_id: me.id,
            profile,
            leave,
        }))
    }

    pub fn collaborator_id(&self) -> &str {
        &self.collaborator_id
    }

    /// Everything that changed since the last call, in feed order.
    pub fn pending(&mut self) -> AppResult<Vec<DashboardUpdate>> {
        let mut events: Vec<(i64, DashboardUpdate)> = Vec::new();

        for ev in self.profile.poll()? {
            if let Some(row) = ev.new {
                events.push((ev.id, DashboardUpdate::Profile(Collaborator::from_row(row)?)));
            }
        }
        for ev in self.leave.poll()? {
            events.push((ev.id, leave_update(ev)?));
        }

        events.sort_by_key(|(id, _)| *id);
        Ok(events.into_iter().map(|(_, u)| u).collect())
    }

    /// Stop listening. Safe to call more than once.
    pub fn release(&mut self) {
        self.profile.unsubscribe();
        self.leave.unsubscribe();
    }
}

fn leave_update(ev: ChangeEvent) -> AppResult<DashboardUpdate> {
    let request = ev.new.map(LeaveRequest::from_row).transpose()?;
    Ok(DashboardUpdate::Leave(ev.kind, request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::local::{BackendSettings, LocalBackend};
    use crate::backend::storage::FsStorage;
    use crate::backend::{Filter, RecordStore};
    use crate::core::admin::{AdminLogic, NewCollaborator};
    use crate::core::device_store::DeviceStore;
    use crate::core::leave::{LeaveLogic, NewLeave};
    use crate::models::leave::{LeaveStatus, LeaveType};
    use chrono::{NaiveDate, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    fn signed_in(dir: &TempDir) -> SessionContext<LocalBackend> {
        let pool = crate::db::initialize::open_initialized(&dir.path().join("d.sqlite").to_string_lossy()).unwrap();
        let b = LocalBackend::new(
            pool,
            FsStorage::new(dir.path().join("storage"), "http://files.test"),
            BackendSettings::default(),
        );
        for (email, name) in [("ana@example.com", "Ana Souza"), ("bia@example.com", "Bia Lima")] {
            AdminLogic::add_user(
                &b,
                email,
                "pw",
                NewCollaborator {
                    full_name: name.into(),
                    ..Default::default()
                },
            )
            .unwrap();
        }
        let mut ctx = SessionContext::init(b, DeviceStore::new(dir.path().join("dev")), "phone").unwrap();
        ctx.sign_in("ana@example.com", "pw").unwrap();
        ctx
    }

    fn vacation(ctx: &SessionContext<LocalBackend>) -> String {
        let day = NaiveDate::from_ymd_opt(2031, 1, 10).unwrap();
        LeaveLogic::create(
            ctx,
            "documentos_pessoais",
            NewLeave {
                kind: LeaveType::Vacation,
                start: day,
                end: None,
                reason: String::new(),
                attachment: None,
            },
            Utc::now(),
        )
        .unwrap()
        .id
    }

    #[test]
    fn own_leave_and_profile_changes_arrive_in_order() {
        let dir = TempDir::new().unwrap();
        let ctx = signed_in(&dir);
        let mut watcher = DashboardWatcher::open(&ctx).unwrap().unwrap();
        assert!(watcher.pending().unwrap().is_empty());

        let id = vacation(&ctx);
        AdminLogic::set_leave_status(ctx.backend(), &id, LeaveStatus::Approved).unwrap();
        ctx.backend()
            .update(
                Collaborator::TABLE,
                &[Filter::eq("id", watcher.collaborator_id())],
                json!({"role": "Coordenadora"}).as_object().cloned().unwrap(),
            )
            .unwrap();

        let updates = watcher.pending().unwrap();
        assert_eq!(updates.len(), 3);
        assert!(matches!(&updates[0], DashboardUpdate::Leave(EventKind::Insert, Some(r)) if r.status == LeaveStatus::Pending));
        assert!(matches!(&updates[1], DashboardUpdate::Leave(EventKind::Update, Some(r)) if r.status == LeaveStatus::Approved));
        assert!(matches!(&updates[2], DashboardUpdate::Profile(c) if c.role.as_deref() == Some("Coordenadora")));
        assert!(watcher.pending().unwrap().is_empty());
    }

    #[test]
    fn other_collaborators_are_ignored() {
        let dir = TempDir::new().unwrap();
        let ctx = signed_in(&dir);
        let mut watcher = DashboardWatcher::open(&ctx).unwrap().unwrap();

        let bia = AdminLogic::collaborator_by_email(ctx.backend(), "bia@example.com").unwrap();
        ctx.backend()
            .update(
                Collaborator::TABLE,
                &[Filter::eq("id", bia.id.as_str())],
                json!({"role": "Gerente"}).as_object().cloned().unwrap(),
            )
            .unwrap();
        ctx.backend()
            .insert(
                LeaveRequest::TABLE,
                json!({"collaborator_id": bia.id, "type": "FOLGA", "start_date": "2031-02-01",
                       "end_date": "2031-02-01", "days_count": 1})
                .as_object()
                .cloned()
                .unwrap(),
            )
            .unwrap();

        assert!(watcher.pending().unwrap().is_empty());
    }

    #[test]
    fn nothing_arrives_after_release() {
        let dir = TempDir::new().unwrap();
        let ctx = signed_in(&dir);
        let mut watcher = DashboardWatcher::open(&ctx).unwrap().unwrap();
        watcher.release();
        watcher.release();
        vacation(&ctx);
        assert!(watcher.pending().unwrap().is_empty());
    }
}
