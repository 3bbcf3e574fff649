use super::record::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File published to (or uploaded by) an employee: payslips, contracts,
/// medical certificates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorDocument {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub collaborator_id: String,
    pub name: String,
    pub url: String,
    pub category: String,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size_bytes: i64,
    pub competence_month: Option<u32>,
    pub competence_year: Option<i32>,
    pub signed_at: Option<DateTime<Utc>>,
    pub signature_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for CollaboratorDocument {
    const TABLE: &'static str = "collaborator_documents";
}

impl CollaboratorDocument {
    /// "MM/YYYY" competence, when the document has one.
    pub fn competence(&self) -> Option<String> {
        match (self.competence_month, self.competence_year) {
            (Some(m), Some(y)) => Some(format!("{:02}/{}", m, y)),
            (None, Some(y)) => Some(y.to_string()),
            _ => None,
        }
    }
}
