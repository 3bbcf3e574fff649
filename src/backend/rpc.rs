//! Server-side procedures exposed through `RpcClient::rpc`.

use crate::db::values::row_to_json;
use crate::errors::{AppError, AppResult};
use crate::models::leave::VacationBalance;
use crate::utils::date::{add_months, elapsed};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

pub const TIME_HISTORY: &str = "get_user_time_history";
pub const VACATION_BALANCE: &str = "get_vacation_balance";

fn str_param<'a>(params: &'a Value, name: &str) -> AppResult<&'a str> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Backend(format!("missing parameter '{}'", name)))
}

fn ts_param(params: &Value, name: &str) -> AppResult<String> {
    let raw = str_param(params, name)?;
    let ts = DateTime::parse_from_rfc3339(raw)
        .map_err(|_| AppError::InvalidDate(raw.to_string()))?
        .with_timezone(&Utc);
    Ok(ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// `get_user_time_history { p_user_id, p_start_date, p_end_date }`:
/// the user's punches inside the range, most recent first.
pub fn user_time_history(conn: &Connection, params: &Value) -> AppResult<Value> {
    let user_id = str_param(params, "p_user_id")?;
    let start = ts_param(params, "p_start_date")?;
    let end = ts_param(params, "p_end_date")?;

    let mut stmt = conn.prepare(
        "SELECT * FROM time_entries
         WHERE user_id = ?1 AND clock_in >= ?2 AND clock_in <= ?3
         ORDER BY clock_in DESC",
    )?;
    let rows = stmt.query_map(params![user_id, start, end], row_to_json)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(Value::Object(r?));
    }
    Ok(Value::Array(out))
}

/// Vacation entitlement for one acquisition period.
///
/// Nothing is due before the first full year of service. Afterwards the
/// collaborator is entitled to `per_period` days, minus approved vacation
/// days starting on or after the most recent hire-date anniversary.
pub fn compute_vacation_balance(
    hire_date: NaiveDate,
    today: NaiveDate,
    approved: &[(NaiveDate, i64)],
    per_period: i64,
) -> VacationBalance {
    let served = elapsed(hire_date, today);
    if served.years < 1 {
        return VacationBalance {
            total: 0,
            available: 0,
            taken: 0,
        };
    }

    let period_start = add_months(hire_date, served.years as u32 * 12).unwrap_or(hire_date);
    let taken: i64 = approved
        .iter()
        .filter(|(start, _)| *start >= period_start)
        .map(|(_, days)| *days)
        .sum();

    VacationBalance {
        total: per_period,
        available: (per_period - taken).max(0),
        taken,
    }
}

/// `get_vacation_balance { target_collaborator_id }`.
pub fn vacation_balance(
    conn: &Connection,
    params: &Value,
    per_period: i64,
    today: NaiveDate,
) -> AppResult<Value> {
    let collaborator_id = str_param(params, "target_collaborator_id")?;

    let hire: Option<Option<String>> = conn
        .query_row(
            "SELECT hire_date FROM collaborators WHERE id = ?1",
            [collaborator_id],
            |r| r.get(0),
        )
        .optional()?;

    let hire = match hire {
        None => return Err(AppError::NotFound(format!("collaborator {}", collaborator_id))),
        Some(None) => None,
        Some(Some(s)) => Some(
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| AppError::InvalidDate(s))?,
        ),
    };

    let Some(hire_date) = hire else {
        return Ok(serde_json::to_value(VacationBalance {
            total: 0,
            available: 0,
            taken: 0,
        })?);
    };

    let mut stmt = conn.prepare(
        "SELECT start_date, days_count FROM leave_requests
         WHERE collaborator_id = ?1 AND type = 'FERIAS' AND status = 'APPROVED'",
    )?;
    let rows = stmt.query_map([collaborator_id], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?))
    })?;

    let mut approved = Vec::new();
    for r in rows {
        let (start, days) = r?;
        let start =
            NaiveDate::parse_from_str(&start, "%Y-%m-%d").map_err(|_| AppError::InvalidDate(start))?;
        approved.push((start, days));
    }

    let balance = compute_vacation_balance(hire_date, today, &approved, per_period);
    Ok(serde_json::to_value(balance)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn nothing_due_in_the_first_year() {
        let b = compute_vacation_balance(d("2025-03-10"), d("2026-03-09"), &[], 30);
        assert_eq!(b.total, 0);
        assert_eq!(b.available, 0);
    }

    #[test]
    fn only_vacations_in_the_current_period_count() {
        let approved = [(d("2025-01-05"), 10), (d("2025-04-01"), 12)];
        let b = compute_vacation_balance(d("2023-03-10"), d("2025-10-20"), &approved, 30);
        assert_eq!(b.total, 30);
        assert_eq!(b.taken, 12);
        assert_eq!(b.available, 18);
    }

    #[test]
    fn available_never_goes_negative() {
        let approved = [(d("2025-04-01"), 40)];
        let b = compute_vacation_balance(d("2023-03-10"), d("2025-10-20"), &approved, 30);
        assert_eq!(b.available, 0);
        assert_eq!(b.taken, 40);
    }
}
