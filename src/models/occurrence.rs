use super::record::Record;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// HR occurrence (warning, commendation, note) registered by the back office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub collaborator_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date_event: NaiveDate,
    pub severity_level: i64,
}

impl Record for Occurrence {
    const TABLE: &'static str = "occurrences";
}

impl Occurrence {
    pub fn severity_label(&self) -> &'static str {
        match self.severity_level {
            i64::MIN..=1 => "Baixa",
            2 => "Média",
            _ => "Alta",
        }
    }
}
