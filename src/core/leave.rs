use crate::backend::rpc::VACATION_BALANCE;
use crate::backend::{Backend, Direction, Query};
use crate::core::documents;
use crate::core::profile;
use crate::core::session_context::SessionContext;
use crate::db::log::Journal;
use crate::errors::{AppError, AppResult};
use crate::models::leave::{LeaveRequest, LeaveStatus, LeaveType, VacationBalance};
use crate::models::record::{Record, from_rows};
use crate::ui::messages::warning;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;

/// File attached to a request.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct NewLeave {
    pub kind: LeaveType,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub reason: String,
    pub attachment: Option<Attachment>,
}

/// Inclusive day count; a missing end means a single day.
pub fn days_count(start: NaiveDate, end: Option<NaiveDate>) -> AppResult<(NaiveDate, i64)> {
    let end = end.unwrap_or(start);
    if end < start {
        return Err(AppError::InvalidInput(format!(
            "end date {} is before start date {}",
            end, start
        )));
    }
    Ok((end, (end - start).num_days() + 1))
}

pub fn reason_with_attachment(reason: &str, url: Option<&str>) -> String {
    match url {
        Some(u) => format!("{}\n\n[Anexo]: {}", reason, u),
        None => reason.to_string(),
    }
}

pub struct LeaveLogic;

impl LeaveLogic {
    /// Validate and submit a request. Attachments are uploaded first so the
    /// reason can link to them.
    pub fn create<B: Backend + Journal>(
        ctx: &SessionContext<B>,
        bucket: &str,
        req: NewLeave,
        now: DateTime<Utc>,
    ) -> AppResult<LeaveRequest> {
        let (end, days) = days_count(req.start, req.end)?;
        if req.kind.requires_attachment() && req.attachment.is_none() {
            return Err(AppError::AttachmentRequired(req.kind.label().to_string()));
        }

        let profile = profile::lookup(ctx)?;

        let url = match &req.attachment {
            Some(a) => Some(documents::upload(ctx, bucket, &a.file_name, &a.bytes, "requests", now)?.url),
            None => None,
        };

        let leave = LeaveRequest {
            id: String::new(),
            collaborator_id: profile.id.clone(),
            kind: req.kind,
            start_date: req.start,
            end_date: end,
            days_count: days,
            reason: reason_with_attachment(&req.reason, url.as_deref()),
            status: LeaveStatus::Pending,
            created_at: None,
        };

        let backend = ctx.backend();
        let stored = LeaveRequest::from_row(backend.insert(LeaveRequest::TABLE, leave.to_row()?)?)?;
        backend.journal(
            "leave_request",
            &profile.id,
            &format!(
                "{} {} → {} ({} days)",
                stored.kind.to_db_str(),
                stored.start_date,
                stored.end_date,
                stored.days_count
            ),
        );
        Ok(stored)
    }

    /// Own requests, newest first.
    pub fn list<B: Backend + Journal>(ctx: &SessionContext<B>) -> AppResult<Vec<LeaveRequest>> {
        let Some(profile) = profile::lookup_optional(ctx)? else {
            return Ok(Vec::new());
        };
        let rows = ctx.backend().select(
            &Query::table(LeaveRequest::TABLE)
                .eq("collaborator_id", profile.id.as_str())
                .order("created_at", Direction::Desc),
        )?;
        from_rows(rows)
    }

    /// Approved requests starting today or later, soonest first.
    pub fn upcoming<B: Backend + Journal>(
        ctx: &SessionContext<B>,
        today: NaiveDate,
    ) -> AppResult<Vec<LeaveRequest>> {
        let Some(profile) = profile::lookup_optional(ctx)? else {
            return Ok(Vec::new());
        };
        let rows = ctx.backend().select(
            &Query::table(LeaveRequest::TABLE)
                .eq("collaborator_id", profile.id.as_str())
                .eq("status", LeaveStatus::Approved.to_db_str())
                .gte("start_date", today.format("%Y-%m-%d").to_string())
                .order("start_date", Direction::Asc),
        )?;
        from_rows(rows)
    }

    /// Vacation balance; any failure yields [`VacationBalance::FALLBACK`].
    pub fn balance<B: Backend + Journal>(ctx: &SessionContext<B>) -> VacationBalance {
        let fetched = profile::lookup(ctx).and_then(|p| {
            let v = ctx
                .backend()
                .rpc(VACATION_BALANCE, json!({ "target_collaborator_id": p.id }))?;
            Ok(serde_json::from_value::<VacationBalance>(v)?)
        });
        match fetched {
            Ok(b) => b,
            Err(e) => {
                warning(format!("Vacation balance unavailable: {}", e));
                VacationBalance::FALLBACK
            }
        }
    }
}
