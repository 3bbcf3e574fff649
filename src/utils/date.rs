use chrono::{Datelike, Months, NaiveDate};

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Accepts ISO dates (`2025-10-20`) and Brazilian ones (`20/10/2025`).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// Calendar distance between two dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Elapsed {
    pub years: i32,
    pub months: u32,
    pub days: u32,
}

/// Whole years, months and remaining days from `from` to `to`.
/// Returns zero when `to` is before `from`.
pub fn elapsed(from: NaiveDate, to: NaiveDate) -> Elapsed {
    if to <= from {
        return Elapsed::default();
    }

    let mut months =
        (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    let anchor_for = |m: i32| add_months(from, m.max(0) as u32).unwrap_or(from);
    if anchor_for(months) > to {
        months -= 1;
    }
    let months = months.max(0);
    let anchor = anchor_for(months);

    Elapsed {
        years: months / 12,
        months: (months % 12) as u32,
        days: (to - anchor).num_days().max(0) as u32,
    }
}

/// First and last day of a month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = add_months(first, 1)?.pred_opt()?;
    Some((first, last))
}

/// `YYYY-MM` → bounds of that month.
pub fn parse_month(period: &str) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", period.trim()), "%Y-%m-%d").ok()?;
    month_bounds(first.year(), first.month())
}

pub fn current_month() -> (NaiveDate, NaiveDate) {
    let t = today();
    month_bounds(t.year(), t.month()).unwrap_or((t, t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn parses_both_formats() {
        assert_eq!(d("2025-10-20"), d("20/10/2025"));
        assert!(parse_date("20-10-2025").is_none());
    }

    #[test]
    fn elapsed_counts_whole_units() {
        let e = elapsed(d("2020-01-15"), d("2025-03-14"));
        assert_eq!((e.years, e.months), (5, 1));
        assert_eq!(e.days, 27);

        let e = elapsed(d("2024-02-29"), d("2025-02-28"));
        assert_eq!((e.years, e.months, e.days), (1, 0, 0));

        assert_eq!(elapsed(d("2025-01-01"), d("2024-01-01")), Elapsed::default());
    }

    #[test]
    fn month_bounds_handle_leap_years() {
        let (a, b) = month_bounds(2024, 2).unwrap();
        assert_eq!(a, d("2024-02-01"));
        assert_eq!(b, d("2024-02-29"));
        assert_eq!(parse_month("2025-12").unwrap().1, d("2025-12-31"));
    }
}
