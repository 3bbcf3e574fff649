use crate::backend::{Backend, Direction, Filter, Query};
use crate::core::profile;
use crate::core::session_context::SessionContext;
use crate::db::log::Journal;
use crate::errors::{AppError, AppResult};
use crate::models::document::CollaboratorDocument;
use crate::models::record::{Record, from_rows};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub const DEFAULT_BUCKET: &str = "documentos_pessoais";

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Storage-safe file name: everything but ASCII letters, digits and dots
/// becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9.]").expect("valid regex"));
    re.replace_all(name, "_").into_owned()
}

pub fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Uploads attached to requests are filed as medical certificates.
pub fn category_for_folder(folder: &str) -> &'static str {
    if folder == "requests" { "Atestado" } else { "Outros" }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    Signed { signature_url: String },
    AlreadySigned { signed_at: DateTime<Utc> },
}

/// The user's documents, newest first. No profile means no documents.
pub fn list<B: Backend + Journal>(
    ctx: &SessionContext<B>,
    filter: &DocumentFilter,
) -> AppResult<Vec<CollaboratorDocument>> {
    let Some(profile) = profile::lookup_optional(ctx)? else {
        return Ok(Vec::new());
    };

    let mut q = Query::table(CollaboratorDocument::TABLE)
        .eq("collaborator_id", profile.id.as_str())
        .order("created_at", Direction::Desc);
    if let Some(c) = &filter.category {
        q = q.eq("category", c.as_str());
    }
    if let Some(y) = filter.year {
        q = q.eq("competence_year", y);
    }
    if let Some(m) = filter.month {
        q = q.eq("competence_month", m);
    }

    from_rows(ctx.backend().select(&q)?)
}

/// Store a file under `<collaborator>/<millis>_<name>` and register it.
pub fn upload<B: Backend + Journal>(
    ctx: &SessionContext<B>,
    bucket: &str,
    file_name: &str,
    bytes: &[u8],
    folder: &str,
    now: DateTime<Utc>,
) -> AppResult<CollaboratorDocument> {
    let profile = profile::lookup(ctx)?;
    let backend = ctx.backend();
    let content_type = content_type_for(file_name);

    let path = format!(
        "{}/{}_{}",
        profile.id,
        now.timestamp_millis(),
        sanitize_file_name(file_name)
    );
    backend.upload(bucket, &path, bytes, content_type, false)?;
    let url = backend.public_url(bucket, &path);

    let doc = CollaboratorDocument {
        id: String::new(),
        collaborator_id: profile.id.clone(),
        name: file_name.to_string(),
        url: url.clone(),
        category: category_for_folder(folder).to_string(),
        content_type: Some(content_type.to_string()),
        size_bytes: bytes.len() as i64,
        competence_month: None,
        competence_year: None,
        signed_at: None,
        signature_url: None,
        created_at: None,
    };
    let stored = CollaboratorDocument::from_row(backend.insert(CollaboratorDocument::TABLE, doc.to_row()?)?)?;

    backend.journal("upload", &profile.id, &format!("{} -> {}", file_name, url));
    Ok(stored)
}

/// Attach a PNG signature (raw base64 or a `data:` URL) to one of the
/// user's documents.
pub fn sign<B: Backend + Journal>(
    ctx: &SessionContext<B>,
    bucket: &str,
    document_id: &str,
    signature: &str,
    now: DateTime<Utc>,
) -> AppResult<SignOutcome> {
    let profile = profile::lookup(ctx)?;
    let backend = ctx.backend();

    let owned = [
        Filter::eq("id", document_id),
        Filter::eq("collaborator_id", profile.id.as_str()),
    ];
    let existing = backend.select(&Query {
        filters: owned.to_vec(),
        ..Query::table(CollaboratorDocument::TABLE)
    })?;
    let Some(row) = existing.into_iter().next() else {
        return Err(AppError::DocumentNotFound(document_id.to_string()));
    };
    let doc = CollaboratorDocument::from_row(row)?;
    if let Some(signed_at) = doc.signed_at {
        return Ok(SignOutcome::AlreadySigned { signed_at });
    }

    let clean = signature.trim().replace(PNG_DATA_URL_PREFIX, "");
    let png = STANDARD
        .decode(clean.trim())
        .map_err(|e| AppError::InvalidInput(format!("signature is not valid base64: {e}")))?;

    let path = format!(
        "{}/signature_{}_{}.png",
        profile.id,
        document_id,
        now.timestamp_millis()
    );
    backend.upload(bucket, &path, &png, "image/png", false)?;
    let url = backend.public_url(bucket, &path);

    let mut patch = Map::new();
    patch.insert(
        "signed_at".into(),
        Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    patch.insert("signature_url".into(), Value::String(url.clone()));

    let changed = backend.update(CollaboratorDocument::TABLE, &owned, patch)?;
    if changed == 0 {
        return Err(AppError::DocumentNotFound(document_id.to_string()));
    }

    backend.journal("sign", document_id, &url);
    Ok(SignOutcome::Signed { signature_url: url })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_made_storage_safe() {
        assert_eq!(sanitize_file_name("atestado médico (1).pdf"), "atestado_m_dico__1_.pdf");
        assert_eq!(sanitize_file_name("a-b_c.PNG"), "a_b_c.PNG");
    }

    #[test]
    fn request_uploads_are_certificates() {
        assert_eq!(category_for_folder("requests"), "Atestado");
        assert_eq!(category_for_folder("misc"), "Outros");
    }

    #[test]
    fn guesses_content_types() {
        assert_eq!(content_type_for("x.PDF"), "application/pdf");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
