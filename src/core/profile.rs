use crate::backend::{Backend, Filter, Query};
use crate::core::documents::sanitize_file_name;
use crate::core::session_context::SessionContext;
use crate::db::log::Journal;
use crate::errors::{AppError, AppResult};
use crate::models::collaborator::Collaborator;
use crate::models::record::Record;
use crate::utils::date::elapsed;
use chrono::NaiveDate;
use serde_json::Value;

/// What sensitive fields show until revealed.
pub const HIDDEN: &str = "•••••••••••";

/// Profile of the signed-in user: matched on `user_id`, then on e-mail for
/// profiles created before the account was linked.
pub fn lookup<B: Backend + Journal>(ctx: &SessionContext<B>) -> AppResult<Collaborator> {
    let user = ctx.user()?;
    let backend = ctx.backend();

    let by_id = backend.select(
        &Query::table(Collaborator::TABLE)
            .eq("user_id", user.id.as_str())
            .limit(1),
    )?;
    if let Some(row) = by_id.into_iter().next() {
        return Collaborator::from_row(row);
    }

    let by_email = backend.select(
        &Query::table(Collaborator::TABLE)
            .eq("email", user.email.as_str())
            .limit(1),
    )?;
    match by_email.into_iter().next() {
        Some(row) => Collaborator::from_row(row),
        None => Err(AppError::ProfileNotFound),
    }
}

/// Like [`lookup`], but a missing profile is `None` instead of an error.
pub fn lookup_optional<B: Backend + Journal>(ctx: &SessionContext<B>) -> AppResult<Option<Collaborator>> {
    match lookup(ctx) {
        Ok(c) => Ok(Some(c)),
        Err(AppError::ProfileNotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Upload a new profile picture and point the profile at it.
pub fn update_avatar<B: Backend + Journal>(
    ctx: &SessionContext<B>,
    bucket: &str,
    file_name: &str,
    bytes: &[u8],
    content_type: &str,
    millis: i64,
) -> AppResult<String> {
    let profile = lookup(ctx)?;
    let backend = ctx.backend();

    let path = format!(
        "{}/avatar_{}_{}",
        profile.id,
        millis,
        sanitize_file_name(file_name)
    );
    backend.upload(bucket, &path, bytes, content_type, true)?;
    let url = backend.public_url(bucket, &path);

    let mut patch = serde_json::Map::new();
    patch.insert("avatar_url".into(), Value::String(url.clone()));
    backend.update(
        Collaborator::TABLE,
        &[Filter::eq("id", profile.id.as_str())],
        patch,
    )?;

    backend.journal("avatar", &profile.id, &url);
    Ok(url)
}

fn plural(n: i64, one: &str, many: &str) -> String {
    if n == 1 {
        format!("1 {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Human tenure, e.g. "2 anos e 3 meses". Under one month the days are
/// shown instead.
pub fn time_in_company(hire_date: NaiveDate, today: NaiveDate) -> String {
    let e = elapsed(hire_date, today);
    let years = i64::from(e.years);
    let months = i64::from(e.months);

    match (years, months) {
        (0, 0) => plural(i64::from(e.days), "dia", "dias"),
        (0, m) => plural(m, "mês", "meses"),
        (y, 0) => plural(y, "ano", "anos"),
        (y, m) => format!("{} e {}", plural(y, "ano", "anos"), plural(m, "mês", "meses")),
    }
}

/// Fill the `0` slots of `pattern` with the digits of `value`. Output stops
/// where the digits run out; extra digits are dropped.
fn apply_mask(value: &str, pattern: &str) -> String {
    let mut digits = value.chars().filter(char::is_ascii_digit).peekable();
    let mut out = String::new();
    for slot in pattern.chars() {
        if digits.peek().is_none() {
            break;
        }
        if slot == '0' {
            if let Some(d) = digits.next() {
                out.push(d);
            }
        } else {
            out.push(slot);
        }
    }
    out
}

pub fn format_cpf(value: &str) -> String {
    apply_mask(value, "000.000.000-00")
}

pub fn format_rg(value: &str) -> String {
    apply_mask(value, "00.000.000-0")
}

pub fn format_pis(value: &str) -> String {
    apply_mask(value, "000.00000.00-0")
}

/// Display value of a sensitive document number.
pub fn sensitive(value: Option<&str>, format: fn(&str) -> String, reveal: bool) -> String {
    match value.map(str::trim) {
        None | Some("") | Some("-") => "-".to_string(),
        Some(v) if reveal => format(v),
        Some(_) => HIDDEN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::date::parse_date;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn tenure_wording() {
        assert_eq!(time_in_company(d("2020-01-15"), d("2025-03-20")), "5 anos e 2 meses");
        assert_eq!(time_in_company(d("2024-03-20"), d("2025-04-20")), "1 ano e 1 mês");
        assert_eq!(time_in_company(d("2023-03-20"), d("2025-03-25")), "2 anos");
        assert_eq!(time_in_company(d("2025-01-10"), d("2025-04-11")), "3 meses");
        assert_eq!(time_in_company(d("2025-04-01"), d("2025-04-02")), "1 dia");
        assert_eq!(time_in_company(d("2025-04-01"), d("2025-04-01")), "0 dias");
    }

    #[test]
    fn masks_brazilian_documents() {
        assert_eq!(format_cpf("12345678901"), "123.456.789-01");
        assert_eq!(format_cpf("123.456.789-01"), "123.456.789-01");
        assert_eq!(format_rg("123456789"), "12.345.678-9");
        assert_eq!(format_pis("12345678901"), "123.45678.90-1");
        assert_eq!(format_cpf("1234"), "123.4");
    }

    #[test]
    fn sensitive_values_stay_hidden_unless_revealed() {
        assert_eq!(sensitive(Some("12345678901"), format_cpf, false), HIDDEN);
        assert_eq!(sensitive(Some("12345678901"), format_cpf, true), "123.456.789-01");
        assert_eq!(sensitive(None, format_cpf, true), "-");
    }
}
