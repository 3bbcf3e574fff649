//! Next-punch suggestion for the time clock.
//!
//! Only the most recent punch of the day is looked at; the rest of the day's
//! sequence is never validated.

use crate::models::punch::{Punch, PunchKind};
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suggestion {
    pub kind: PunchKind,
    pub label: &'static str,
    pub subtext: &'static str,
    pub icon: &'static str,
}

/// One of the always-available manual overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualOption {
    pub kind: PunchKind,
    pub label: &'static str,
    pub icon: &'static str,
}

const MANUAL_OPTIONS: [ManualOption; 4] = [
    ManualOption {
        kind: PunchKind::Entry,
        label: "Entrada",
        icon: "log-in-outline",
    },
    ManualOption {
        kind: PunchKind::BreakStart,
        label: "Almoço",
        icon: "cafe-outline",
    },
    ManualOption {
        kind: PunchKind::BreakEnd,
        label: "Retorno",
        icon: "restaurant-outline",
    },
    ManualOption {
        kind: PunchKind::Exit,
        label: "Saída",
        icon: "log-out-outline",
    },
];

/// Suggest the next punch given today's punches, most recent first.
pub fn suggest(todays_punches: &[Punch]) -> Suggestion {
    suggest_after(todays_punches.first().map(|p| p.kind))
}

/// Same as [`suggest`], keyed on the most recent punch type alone.
pub fn suggest_after(last: Option<PunchKind>) -> Suggestion {
    match last {
        None => Suggestion {
            kind: PunchKind::Entry,
            label: "ENTRADA",
            subtext: "Vamos começar o dia?",
            icon: "log-in-outline",
        },
        Some(PunchKind::Entry) => Suggestion {
            kind: PunchKind::BreakStart,
            label: "SAÍDA ALMOÇO",
            subtext: "Bom descanso!",
            icon: "cafe-outline",
        },
        Some(PunchKind::BreakStart) => Suggestion {
            kind: PunchKind::BreakEnd,
            label: "VOLTA ALMOÇO",
            subtext: "Bom retorno!",
            icon: "restaurant-outline",
        },
        Some(PunchKind::BreakEnd) => Suggestion {
            kind: PunchKind::Exit,
            label: "SAÍDA END",
            subtext: "Até amanhã!",
            icon: "log-out-outline",
        },
        // a new entry after leaving is possible overtime
        Some(PunchKind::Exit) => Suggestion {
            kind: PunchKind::Entry,
            label: "NOVA ENTRADA",
            subtext: "Hora extra?",
            icon: "add-circle-outline",
        },
    }
}

pub fn manual_options() -> [ManualOption; 4] {
    MANUAL_OPTIONS
}

/// Punches of `history` falling on the local calendar day `today`, order kept.
pub fn todays_punches(history: &[Punch], today: NaiveDate) -> Vec<Punch> {
    history
        .iter()
        .filter(|p| p.local_date() == today)
        .cloned()
        .collect()
}
