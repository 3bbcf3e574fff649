use super::record::Record;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// HR profile of an employee (`collaborators` row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collaborator {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub full_name: String,
    pub role: Option<String>,
    pub department: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub cpf: Option<String>,
    pub rg: Option<String>,
    pub pis: Option<String>,
    pub avatar_url: Option<String>,
}

impl Record for Collaborator {
    const TABLE: &'static str = "collaborators";
}

impl Collaborator {
    pub fn role_or_default(&self) -> &str {
        self.role.as_deref().unwrap_or("Colaborador")
    }

    /// Uppercase initial shown in avatars without a picture.
    pub fn initial(&self) -> String {
        self.full_name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }
}
