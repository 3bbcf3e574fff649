use super::record::Record;
use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Kind of time-clock event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PunchKind {
    Entry,
    BreakStart,
    BreakEnd,
    Exit,
}

impl PunchKind {
    pub const ALL: [PunchKind; 4] = [
        PunchKind::Entry,
        PunchKind::BreakStart,
        PunchKind::BreakEnd,
        PunchKind::Exit,
    ];

    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PunchKind::Entry => "ENTRY",
            PunchKind::BreakStart => "BREAK_START",
            PunchKind::BreakEnd => "BREAK_END",
            PunchKind::Exit => "EXIT",
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "ENTRY" => Some(PunchKind::Entry),
            "BREAK_START" => Some(PunchKind::BreakStart),
            "BREAK_END" => Some(PunchKind::BreakEnd),
            "EXIT" => Some(PunchKind::Exit),
            _ => None,
        }
    }

    /// Parse user input: DB names in any case, plus the short forms
    /// `in`, `lunch`, `back`, `out`.
    pub fn parse(s: &str) -> AppResult<Self> {
        let norm = s.trim().to_uppercase().replace('-', "_");
        let kind = match norm.as_str() {
            "IN" | "ENTRADA" => Some(PunchKind::Entry),
            "LUNCH" | "BREAK" | "ALMOCO" | "ALMOÇO" => Some(PunchKind::BreakStart),
            "BACK" | "RETORNO" => Some(PunchKind::BreakEnd),
            "OUT" | "SAIDA" | "SAÍDA" => Some(PunchKind::Exit),
            other => PunchKind::from_db_str(other),
        };
        kind.ok_or_else(|| AppError::InvalidPunchType(s.to_string()))
    }

    /// Short label used in the history list.
    pub fn history_label(&self) -> &'static str {
        match self {
            PunchKind::Entry => "ENTRADA",
            PunchKind::BreakStart => "ALMOÇO",
            PunchKind::BreakEnd => "RETORNO",
            PunchKind::Exit => "SAÍDA",
        }
    }
}

/// Validity classification of a punch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PunchStatus {
    Valid,
    /// Recorded with a simulated position; kept for back-office review.
    Flagged,
    /// Changed afterwards by the back office.
    Adjusted,
}

impl PunchStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PunchStatus::Valid => "VALID",
            PunchStatus::Flagged => "FLAGGED",
            PunchStatus::Adjusted => "ADJUSTED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "VALID" => Some(PunchStatus::Valid),
            "FLAGGED" => Some(PunchStatus::Flagged),
            "ADJUSTED" => Some(PunchStatus::Adjusted),
            _ => None,
        }
    }

    /// Status assigned at write time: a mocked position flags the punch
    /// but never blocks it.
    pub fn for_sample(sample: &LocationSample) -> Self {
        if sample.is_mocked {
            PunchStatus::Flagged
        } else {
            PunchStatus::Valid
        }
    }
}

/// A resolved position reading from the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub lat: f64,
    pub lng: f64,
    pub accuracy: Option<f64>,
    pub is_mocked: bool,
}

/// One time-clock entry (`time_entries` row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Punch {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: PunchKind,
    pub clock_in: DateTime<Utc>,
    pub lat: f64,
    pub lng: f64,
    pub accuracy: Option<f64>,
    #[serde(deserialize_with = "super::flag::deserialize")]
    pub is_mocked: bool,
    #[serde(default)]
    pub device_info: String,
    pub status: PunchStatus,
}

impl Record for Punch {
    const TABLE: &'static str = "time_entries";
}

impl Punch {
    /// Build a new, not yet persisted punch from a resolved location sample.
    pub fn new(
        user_id: &str,
        kind: PunchKind,
        clock_in: DateTime<Utc>,
        sample: LocationSample,
        device_info: &str,
    ) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.to_string(),
            kind,
            clock_in,
            lat: sample.lat,
            lng: sample.lng,
            accuracy: sample.accuracy,
            is_mocked: sample.is_mocked,
            device_info: device_info.to_string(),
            status: PunchStatus::for_sample(&sample),
        }
    }

    pub fn location(&self) -> LocationSample {
        LocationSample {
            lat: self.lat,
            lng: self.lng,
            accuracy: self.accuracy,
            is_mocked: self.is_mocked,
        }
    }

    pub fn local_time(&self) -> DateTime<Local> {
        self.clock_in.with_timezone(&Local)
    }

    /// Calendar day of the punch, in local time.
    pub fn local_date(&self) -> NaiveDate {
        self.local_time().date_naive()
    }

    pub fn time_str(&self) -> String {
        self.local_time().format("%H:%M").to_string()
    }

    pub fn date_str(&self) -> String {
        self.local_time().format("%d/%m/%Y").to_string()
    }
}
