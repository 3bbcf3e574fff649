use crate::backend::{Backend, Direction, Query};
use crate::core::profile;
use crate::core::session_context::SessionContext;
use crate::db::log::Journal;
use crate::errors::AppResult;
use crate::models::occurrence::Occurrence;
use crate::models::record::{Record, from_rows};

/// The user's HR occurrences, most recent event first.
pub fn list<B: Backend + Journal>(ctx: &SessionContext<B>) -> AppResult<Vec<Occurrence>> {
    let Some(profile) = profile::lookup_optional(ctx)? else {
        return Ok(Vec::new());
    };
    let rows = ctx.backend().select(
        &Query::table(Occurrence::TABLE)
            .eq("collaborator_id", profile.id.as_str())
            .order("date_event", Direction::Desc),
    )?;
    from_rows(rows)
}
