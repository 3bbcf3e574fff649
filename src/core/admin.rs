//! Back-office operations against the local backend: creating accounts,
//! publishing documents and occurrences, reviewing requests and punches.
//! They write through the record store so subscribers see the changes.

use crate::backend::local::LocalBackend;
use crate::backend::{Filter, ObjectStorage, Query, RecordStore};
use crate::core::documents::{content_type_for, sanitize_file_name};
use crate::db::log::Journal;
use crate::errors::{AppError, AppResult};
use crate::models::collaborator::Collaborator;
use crate::models::document::CollaboratorDocument;
use crate::models::leave::{LeaveRequest, LeaveStatus};
use crate::models::occurrence::Occurrence;
use crate::models::punch::{Punch, PunchStatus};
use crate::models::record::Record;
use crate::models::user::User;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default)]
pub struct NewCollaborator {
    pub full_name: String,
    pub role: Option<String>,
    pub department: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub cpf: Option<String>,
    pub rg: Option<String>,
    pub pis: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PublishedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub category: String,
    pub competence_month: Option<u32>,
    pub competence_year: Option<i32>,
}

pub struct AdminLogic;

impl AdminLogic {
    /// Create the login and its linked HR profile.
    pub fn add_user(
        backend: &LocalBackend,
        email: &str,
        password: &str,
        profile: NewCollaborator,
    ) -> AppResult<(User, Collaborator)> {
        let user = backend.create_user(email, password)?;
        let collaborator = Collaborator {
            id: String::new(),
            user_id: Some(user.id.clone()),
            email: Some(user.email.clone()),
            full_name: profile.full_name,
            role: profile.role,
            department: profile.department,
            hire_date: profile.hire_date,
            cpf: profile.cpf,
            rg: profile.rg,
            pis: profile.pis,
            avatar_url: None,
        };
        let stored = Collaborator::from_row(backend.insert(Collaborator::TABLE, collaborator.to_row()?)?)?;
        backend.journal("add_user", &user.id, &format!("{} ({})", stored.full_name, user.email));
        Ok((user, stored))
    }

    pub fn collaborator_by_email(backend: &LocalBackend, email: &str) -> AppResult<Collaborator> {
        let rows = backend.select(&Query::table(Collaborator::TABLE).eq("email", email.trim()).limit(1))?;
        match rows.into_iter().next() {
            Some(row) => Collaborator::from_row(row),
            None => Err(AppError::ProfileNotFound),
        }
    }

    /// Publish a document (payslip, contract…) to a collaborator.
    pub fn add_document(
        backend: &LocalBackend,
        bucket: &str,
        email: &str,
        doc: PublishedDocument,
        now: DateTime<Utc>,
    ) -> AppResult<CollaboratorDocument> {
        let owner = Self::collaborator_by_email(backend, email)?;
        let content_type = content_type_for(&doc.file_name);
        let path = format!(
            "{}/{}_{}",
            owner.id,
            now.timestamp_millis(),
            sanitize_file_name(&doc.file_name)
        );
        backend.upload(bucket, &path, &doc.bytes, content_type, false)?;

        let record = CollaboratorDocument {
            id: String::new(),
            collaborator_id: owner.id.clone(),
            name: doc.file_name,
            url: backend.public_url(bucket, &path),
            category: doc.category,
            content_type: Some(content_type.to_string()),
            size_bytes: doc.bytes.len() as i64,
            competence_month: doc.competence_month,
            competence_year: doc.competence_year,
            signed_at: None,
            signature_url: None,
            created_at: None,
        };
        let stored = CollaboratorDocument::from_row(
            backend.insert(CollaboratorDocument::TABLE, record.to_row()?)?,
        )?;
        backend.journal("add_document", &owner.id, &stored.name);
        Ok(stored)
    }

    pub fn add_occurrence(
        backend: &LocalBackend,
        email: &str,
        kind: &str,
        title: &str,
        description: &str,
        date_event: NaiveDate,
        severity_level: i64,
    ) -> AppResult<Occurrence> {
        let owner = Self::collaborator_by_email(backend, email)?;
        let occ = Occurrence {
            id: String::new(),
            collaborator_id: owner.id.clone(),
            kind: kind.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            date_event,
            severity_level,
        };
        let stored = Occurrence::from_row(backend.insert(Occurrence::TABLE, occ.to_row()?)?)?;
        backend.journal("add_occurrence", &owner.id, title);
        Ok(stored)
    }

    fn set_status(backend: &LocalBackend, table: &str, id: &str, status: &str) -> AppResult<()> {
        let mut patch = Map::new();
        patch.insert("status".into(), Value::String(status.to_string()));
        let changed = backend.update(table, &[Filter::eq("id", id)], patch)?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("{} {}", table, id)));
        }
        backend.journal("set_status", id, &format!("{} → {}", table, status));
        Ok(())
    }

    pub fn set_leave_status(backend: &LocalBackend, id: &str, status: LeaveStatus) -> AppResult<()> {
        Self::set_status(backend, LeaveRequest::TABLE, id, status.to_db_str())
    }

    /// Review a punch; the only mutable column of a punch is its status.
    pub fn set_punch_status(backend: &LocalBackend, id: &str, status: PunchStatus) -> AppResult<()> {
        Self::set_status(backend, Punch::TABLE, id, status.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::local::BackendSettings;
    use crate::backend::storage::FsStorage;
    use crate::db::initialize::open_initialized;
    use tempfile::TempDir;

    fn backend(dir: &TempDir) -> LocalBackend {
        let pool = open_initialized(&dir.path().join("a.sqlite").to_string_lossy()).unwrap();
        LocalBackend::new(
            pool,
            FsStorage::new(dir.path().join("storage"), "http://files.test"),
            BackendSettings::default(),
        )
    }

    #[test]
    fn add_user_links_the_profile() {
        let dir = TempDir::new().unwrap();
        let b = backend(&dir);
        let (user, profile) = AdminLogic::add_user(
            &b,
            "ana@example.com",
            "pw",
            NewCollaborator {
                full_name: "Ana Souza".into(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(profile.user_id.as_deref(), Some(user.id.as_str()));
        assert_eq!(
            AdminLogic::collaborator_by_email(&b, "ana@example.com").unwrap().id,
            profile.id
        );
    }

    #[test]
    fn status_updates_need_an_existing_row() {
        let dir = TempDir::new().unwrap();
        let b = backend(&dir);
        assert!(matches!(
            AdminLogic::set_leave_status(&b, "missing", LeaveStatus::Approved),
            Err(AppError::NotFound(_))
        ));
    }
}
