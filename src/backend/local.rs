//! SQLite + filesystem implementation of the backend contract.
//!
//! Every write to a public table also appends a row to the `changes`
//! outbox, inside the same transaction; subscriptions read that outbox
//! after their cursor. Several processes sharing one database file
//! therefore see each other's changes.

use super::auth;
use super::feed::{ChangeEvent, ChangeFilter, ChangeSource, EventKind, Subscription};
use super::rpc;
use super::storage::FsStorage;
use super::{
    AuthClient, Direction, Filter, ObjectStorage, Query, RecordStore, Row, RpcClient,
    validate_ident,
};
use crate::config::Config;
use crate::db::initialize::open_initialized;
use crate::db::log::Journal;
use crate::db::pool::DbPool;
use crate::db::values::{json_to_sql, row_to_json};
use crate::errors::{AppError, AppResult};
use crate::models::user::{AuthSession, User};
use crate::utils::date;
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde_json::Value;
use std::rc::Rc;
use uuid::Uuid;

/// Storage bucket standing in for outgoing mail.
pub const MAILBOX_BUCKET: &str = "mailbox";

fn reset_message(user: &User, token: &str) -> String {
    format!(
        "To: {}\nSubject: Redefinição de senha\n\n\
         Use o código abaixo para definir uma nova senha (válido por {} minutos):\n\n\
         {}\n\n\
         rponto reset-password --token {} --password <nova senha>\n",
        user.email,
        auth::RESET_TTL_MINUTES,
        token,
        token
    )
}

/// Tables reachable through the record store, and whether the backend
/// generates their text `id`.
const PUBLIC_TABLES: &[(&str, bool)] = &[
    ("collaborators", true),
    ("user_active_sessions", false),
    ("time_entries", true),
    ("leave_requests", true),
    ("collaborator_documents", true),
    ("occurrences", true),
    ("user_term_acceptances", true),
];

fn public_table(name: &str) -> AppResult<(&'static str, bool)> {
    PUBLIC_TABLES
        .iter()
        .find(|(t, _)| *t == name)
        .copied()
        .ok_or_else(|| AppError::Backend(format!("table '{}' is not exposed", name)))
}

#[derive(Debug, Clone, Copy)]
pub struct BackendSettings {
    pub vacation_days_per_period: i64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            vacation_days_per_period: 30,
        }
    }
}

#[derive(Clone)]
pub struct LocalBackend {
    pool: Rc<DbPool>,
    storage: FsStorage,
    settings: BackendSettings,
}

impl LocalBackend {
    pub fn new(pool: DbPool, storage: FsStorage, settings: BackendSettings) -> Self {
        Self {
            pool: Rc::new(pool),
            storage,
            settings,
        }
    }

    /// Open the database named by the configuration, migrating it if needed.
    pub fn open(cfg: &Config) -> AppResult<Self> {
        let pool = open_initialized(&cfg.database)?;
        let storage = FsStorage::new(&cfg.storage_dir, &cfg.public_url_base);
        Ok(Self::new(
            pool,
            storage,
            BackendSettings {
                vacation_days_per_period: cfg.vacation_days_per_period,
            },
        ))
    }

    pub fn conn(&self) -> &Connection {
        &self.pool.conn
    }

    pub fn storage(&self) -> &FsStorage {
        &self.storage
    }

    /// Back-office account creation.
    pub fn create_user(&self, email: &str, password: &str) -> AppResult<User> {
        auth::create_user(self.conn(), email, password)
    }

    /// Finish a reset started with
    /// [`AuthClient::reset_password_for_email`].
    pub fn complete_password_reset(&self, token: &str, new_password: &str) -> AppResult<User> {
        let user = auth::complete_reset(self.conn(), token.trim(), new_password, Utc::now())?;
        self.journal("password_reset", &user.id, "Password changed with a reset link");
        Ok(user)
    }

    fn record_change(
        conn: &Connection,
        table: &str,
        kind: EventKind,
        new: Option<&Row>,
        old: Option<&Row>,
    ) -> AppResult<()> {
        let new_json = new.map(serde_json::to_string).transpose()?;
        let old_json = old.map(serde_json::to_string).transpose()?;
        conn.execute(
            "INSERT INTO changes (table_name, event, new_row, old_row, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                table,
                kind.to_db_str(),
                new_json,
                old_json,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn row_by_rowid(conn: &Connection, table: &str, rowid: i64) -> AppResult<Row> {
        let row = conn
            .query_row(
                &format!("SELECT * FROM {table} WHERE rowid = ?1"),
                [rowid],
                row_to_json,
            )
            .optional()?;
        row.ok_or_else(|| AppError::NotFound(format!("{} row {}", table, rowid)))
    }

    fn where_clause(filters: &[Filter], first_param: usize) -> AppResult<(String, Vec<SqlValue>)> {
        if filters.is_empty() {
            return Ok((String::new(), Vec::new()));
        }
        let mut parts = Vec::with_capacity(filters.len());
        let mut args = Vec::with_capacity(filters.len());
        for (i, f) in filters.iter().enumerate() {
            let col = validate_ident(f.column())?;
            parts.push(format!("{} {} ?{}", col, f.operator(), first_param + i));
            args.push(json_to_sql(f.value()));
        }
        Ok((format!(" WHERE {}", parts.join(" AND ")), args))
    }

    fn insert_row(conn: &Connection, table: &str, generated_id: bool, mut row: Row) -> AppResult<Row> {
        if generated_id {
            let missing = match row.get("id") {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                _ => false,
            };
            if missing {
                row.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
            }
        }
        if row.is_empty() {
            return Err(AppError::Backend(format!("empty insert into {}", table)));
        }

        let mut cols = Vec::with_capacity(row.len());
        let mut args = Vec::with_capacity(row.len());
        for (k, v) in &row {
            cols.push(validate_ident(k)?.to_string());
            args.push(json_to_sql(v));
        }
        let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{i}")).collect();
        conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                cols.join(", "),
                placeholders.join(", ")
            ),
            params_from_iter(args.iter()),
        )?;

        let stored = Self::row_by_rowid(conn, table, conn.last_insert_rowid())?;
        Self::record_change(conn, table, EventKind::Insert, Some(&stored), None)?;
        Ok(stored)
    }

    fn update_rowid(conn: &Connection, table: &str, rowid: i64, patch: &Row) -> AppResult<Row> {
        let old = Self::row_by_rowid(conn, table, rowid)?;

        let mut sets = Vec::with_capacity(patch.len());
        let mut args = Vec::with_capacity(patch.len() + 1);
        for (i, (k, v)) in patch.iter().enumerate() {
            sets.push(format!("{} = ?{}", validate_ident(k)?, i + 1));
            args.push(json_to_sql(v));
        }
        args.push(SqlValue::Integer(rowid));
        conn.execute(
            &format!(
                "UPDATE {} SET {} WHERE rowid = ?{}",
                table,
                sets.join(", "),
                args.len()
            ),
            params_from_iter(args.iter()),
        )?;

        let new = Self::row_by_rowid(conn, table, rowid)?;
        Self::record_change(conn, table, EventKind::Update, Some(&new), Some(&old))?;
        Ok(new)
    }

    fn matching_rowids(conn: &Connection, table: &str, filters: &[Filter]) -> AppResult<Vec<i64>> {
        let (clause, args) = Self::where_clause(filters, 1)?;
        let mut stmt = conn.prepare(&format!("SELECT rowid FROM {table}{clause}"))?;
        let ids = stmt.query_map(params_from_iter(args.iter()), |r| r.get::<_, i64>(0))?;
        let mut out = Vec::new();
        for id in ids {
            out.push(id?);
        }
        Ok(out)
    }
}

impl Journal for LocalBackend {
    fn journal(&self, operation: &str, target: &str, message: &str) {
        self.conn().journal(operation, target, message);
    }
}

impl AuthClient for LocalBackend {
    fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        auth::sign_in(self.conn(), email, password)
    }

    fn get_session(&self, token: &str) -> AppResult<Option<AuthSession>> {
        auth::get_session(self.conn(), token)
    }

    fn refresh_session(&self, token: &str) -> AppResult<AuthSession> {
        auth::refresh(self.conn(), token)
    }

    fn sign_out(&self, token: &str) -> AppResult<()> {
        auth::revoke(self.conn(), token)
    }

    fn reset_password_for_email(&self, email: &str) -> AppResult<()> {
        let now = Utc::now();
        let Some((user, token)) = auth::request_reset(self.conn(), email, now)? else {
            self.journal("password_reset_requested", email.trim(), "No account for this e-mail");
            return Ok(());
        };

        let path = format!("{}/{}_reset.txt", user.id, now.timestamp_millis());
        self.storage
            .upload(MAILBOX_BUCKET, &path, reset_message(&user, &token).as_bytes(), false)?;
        self.journal("password_reset_requested", &user.id, "Reset link sent");
        Ok(())
    }
}

impl RecordStore for LocalBackend {
    fn select(&self, query: &Query) -> AppResult<Vec<Row>> {
        let (table, _) = public_table(&query.table)?;
        let (clause, args) = Self::where_clause(&query.filters, 1)?;

        let mut sql = format!("SELECT * FROM {table}{clause}");
        if let Some(order) = &query.order {
            let dir = match order.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            sql.push_str(&format!(" ORDER BY {} {}", validate_ident(&order.column)?, dir));
        }
        if let Some(n) = query.limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), row_to_json)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn insert(&self, table: &str, row: Row) -> AppResult<Row> {
        let (table, generated_id) = public_table(table)?;
        let tx = self.conn().unchecked_transaction()?;
        let stored = Self::insert_row(&tx, table, generated_id, row)?;
        tx.commit()?;
        Ok(stored)
    }

    fn update(&self, table: &str, filters: &[Filter], patch: Row) -> AppResult<usize> {
        let (table, _) = public_table(table)?;
        if patch.is_empty() {
            return Err(AppError::Backend(format!("empty update on {}", table)));
        }

        let tx = self.conn().unchecked_transaction()?;
        let rowids = Self::matching_rowids(&tx, table, filters)?;
        for rowid in &rowids {
            Self::update_rowid(&tx, table, *rowid, &patch)?;
        }
        tx.commit()?;
        Ok(rowids.len())
    }

    fn upsert(&self, table: &str, key: &str, row: Row) -> AppResult<Row> {
        let (table, generated_id) = public_table(table)?;
        let key_value = row
            .get(validate_ident(key)?)
            .cloned()
            .ok_or_else(|| AppError::Backend(format!("upsert on {} without '{}'", table, key)))?;

        let tx = self.conn().unchecked_transaction()?;
        let existing = Self::matching_rowids(&tx, table, &[Filter::Eq(key.to_string(), key_value)])?;
        let stored = match existing.first() {
            Some(rowid) => Self::update_rowid(&tx, table, *rowid, &row)?,
            None => Self::insert_row(&tx, table, generated_id, row)?,
        };
        tx.commit()?;
        Ok(stored)
    }

    fn subscribe(&self, filter: ChangeFilter) -> AppResult<Subscription> {
        public_table(&filter.table)?;
        let feed = OutboxFeed {
            pool: Rc::clone(&self.pool),
        };
        let head = feed.head()?;
        Ok(Subscription::new(Rc::new(feed), filter, head))
    }

    fn resume(&self, filter: ChangeFilter, cursor: i64) -> AppResult<Subscription> {
        public_table(&filter.table)?;
        let feed = OutboxFeed {
            pool: Rc::clone(&self.pool),
        };
        Ok(Subscription::new(Rc::new(feed), filter, cursor))
    }
}

impl ObjectStorage for LocalBackend {
    fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
        upsert: bool,
    ) -> AppResult<()> {
        self.storage.upload(bucket, path, bytes, upsert)
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.storage.public_url(bucket, path)
    }
}

impl RpcClient for LocalBackend {
    fn rpc(&self, name: &str, params: Value) -> AppResult<Value> {
        match name {
            rpc::TIME_HISTORY => rpc::user_time_history(self.conn(), &params),
            rpc::VACATION_BALANCE => rpc::vacation_balance(
                self.conn(),
                &params,
                self.settings.vacation_days_per_period,
                date::today(),
            ),
            other => Err(AppError::UnknownRpc(other.to_string())),
        }
    }
}

/// Reads the `changes` outbox.
struct OutboxFeed {
    pool: Rc<DbPool>,
}

impl ChangeSource for OutboxFeed {
    fn changes_after(&self, table: &str, cursor: i64) -> AppResult<Vec<ChangeEvent>> {
        let mut stmt = self.pool.conn.prepare(
            "SELECT id, table_name, event, new_row, old_row FROM changes
             WHERE table_name = ?1 AND id > ?2
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![table, cursor], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, Option<String>>(3)?,
                r.get::<_, Option<String>>(4)?,
            ))
        })?;

        let parse = |s: Option<String>| -> AppResult<Option<Row>> {
            match s {
                None => Ok(None),
                Some(text) => Ok(serde_json::from_str::<Value>(&text)?.as_object().cloned()),
            }
        };

        let mut out = Vec::new();
        for r in rows {
            let (id, table, event, new_row, old_row) = r?;
            let kind = EventKind::from_db_str(&event)
                .ok_or_else(|| AppError::invalid_record("changes", format!("event '{}'", event)))?;
            out.push(ChangeEvent {
                id,
                table,
                kind,
                new: parse(new_row)?,
                old: parse(old_row)?,
            });
        }
        Ok(out)
    }

    fn head(&self) -> AppResult<i64> {
        outbox_head(&self.pool.conn)
    }
}

/// Id of the latest outbox event ever written. Read from the AUTOINCREMENT
/// sequence so it does not move back once old events are pruned.
pub fn outbox_head(conn: &Connection) -> AppResult<i64> {
    let seq: Option<i64> = conn
        .query_row(
            "SELECT seq FROM sqlite_sequence WHERE name = 'changes'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    match seq {
        Some(seq) => Ok(seq),
        None => Ok(conn.query_row("SELECT IFNULL(MAX(id), 0) FROM changes", [], |r| r.get(0))?),
    }
}

/// Delete outbox events with an id up to and including `upto`.
pub fn prune_outbox(conn: &Connection, upto: i64) -> AppResult<usize> {
    Ok(conn.execute("DELETE FROM changes WHERE id <= ?1", params![upto])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn backend(dir: &TempDir) -> LocalBackend {
        let db = dir.path().join("t.sqlite");
        let pool = open_initialized(&db.to_string_lossy()).unwrap();
        LocalBackend::new(
            pool,
            FsStorage::new(dir.path().join("storage"), "http://files.test"),
            BackendSettings::default(),
        )
    }

    fn obj(v: serde_json::Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn insert_generates_ids_and_applies_defaults() {
        let dir = TempDir::new().unwrap();
        let b = backend(&dir);
        let row = b
            .insert(
                "occurrences",
                obj(json!({"collaborator_id": "c1", "type": "ADVERTENCIA",
                           "title": "Atraso", "date_event": "2025-10-01"})),
            )
            .unwrap();
        assert!(row["id"].as_str().is_some_and(|s| !s.is_empty()));
        assert_eq!(row["severity_level"], json!(1));
    }

    #[test]
    fn select_filters_orders_and_limits() {
        let dir = TempDir::new().unwrap();
        let b = backend(&dir);
        for (day, sev) in [("2025-10-01", 1), ("2025-10-03", 3), ("2025-10-02", 2)] {
            b.insert(
                "occurrences",
                obj(json!({"collaborator_id": "c1", "type": "X", "title": day,
                           "date_event": day, "severity_level": sev})),
            )
            .unwrap();
        }
        b.insert(
            "occurrences",
            obj(json!({"collaborator_id": "c2", "type": "X", "title": "other",
                       "date_event": "2025-10-05"})),
        )
        .unwrap();

        let rows = b
            .select(
                &Query::table("occurrences")
                    .eq("collaborator_id", "c1")
                    .gte("severity_level", 2)
                    .order("date_event", Direction::Desc)
                    .limit(5),
            )
            .unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r["title"].clone()).collect();
        assert_eq!(titles, vec![json!("2025-10-03"), json!("2025-10-02")]);
    }

    #[test]
    fn internal_tables_are_not_exposed() {
        let dir = TempDir::new().unwrap();
        let b = backend(&dir);
        assert!(b.select(&Query::table("users")).is_err());
        assert!(b.insert("auth_sessions", obj(json!({"token": "x"}))).is_err());
    }

    #[test]
    fn upsert_overwrites_by_key_and_notifies() {
        let dir = TempDir::new().unwrap();
        let b = backend(&dir);
        let mut sub = b
            .subscribe(ChangeFilter::new("user_active_sessions", EventKind::Any).with_eq("user_id", "u1"))
            .unwrap();

        let row = |tok: &str| {
            obj(json!({"user_id": "u1", "session_id": tok, "device_info": "d",
                       "last_seen": "2025-10-20T10:00:00Z"}))
        };
        b.upsert("user_active_sessions", "user_id", row("t1")).unwrap();
        b.upsert("user_active_sessions", "user_id", row("t2")).unwrap();

        let stored = b.select(&Query::table("user_active_sessions")).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["session_id"], json!("t2"));

        let events = sub.poll().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Insert);
        assert_eq!(events[1].kind, EventKind::Update);
        assert_eq!(events[1].new_value("session_id"), Some(&json!("t2")));
        assert_eq!(
            events[1].old.as_ref().and_then(|o| o.get("session_id")),
            Some(&json!("t1"))
        );
    }

    #[test]
    fn update_by_filter_counts_rows() {
        let dir = TempDir::new().unwrap();
        let b = backend(&dir);
        let doc = b
            .insert(
                "collaborator_documents",
                obj(json!({"collaborator_id": "c1", "name": "a.pdf", "url": "u"})),
            )
            .unwrap();
        let id = doc["id"].clone();

        let n = b
            .update(
                "collaborator_documents",
                &[Filter::eq("id", id.clone()), Filter::eq("collaborator_id", "someone-else")],
                obj(json!({"signature_url": "s"})),
            )
            .unwrap();
        assert_eq!(n, 0);

        let n = b
            .update(
                "collaborator_documents",
                &[Filter::eq("id", id), Filter::eq("collaborator_id", "c1")],
                obj(json!({"signature_url": "s"})),
            )
            .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn subscriptions_start_at_the_end_of_the_feed() {
        let dir = TempDir::new().unwrap();
        let b = backend(&dir);
        b.insert(
            "occurrences",
            obj(json!({"collaborator_id": "c1", "type": "X", "title": "old", "date_event": "2025-01-01"})),
        )
        .unwrap();

        let mut sub = b.subscribe(ChangeFilter::new("occurrences", EventKind::Insert)).unwrap();
        assert!(sub.poll().unwrap().is_empty());

        let resumed = b.resume(ChangeFilter::new("occurrences", EventKind::Insert), 0);
        assert_eq!(resumed.unwrap().poll().unwrap().len(), 1);
    }

    #[test]
    fn pruning_keeps_events_after_the_cursor() {
        let dir = TempDir::new().unwrap();
        let b = backend(&dir);
        let occurrence = |title: &str| {
            obj(json!({"collaborator_id": "c1", "type": "X", "title": title,
                       "date_event": "2025-10-01"}))
        };
        b.insert("occurrences", occurrence("one")).unwrap();
        let sub = b.subscribe(ChangeFilter::new("occurrences", EventKind::Insert)).unwrap();
        let cursor = sub.cursor();
        b.insert("occurrences", occurrence("two")).unwrap();
        b.insert("occurrences", occurrence("three")).unwrap();

        assert_eq!(prune_outbox(b.conn(), cursor).unwrap(), 1);
        assert_eq!(outbox_head(b.conn()).unwrap(), cursor + 2);

        let mut resumed = b
            .resume(ChangeFilter::new("occurrences", EventKind::Insert), cursor)
            .unwrap();
        let titles: Vec<_> = resumed
            .poll()
            .unwrap()
            .iter()
            .map(|e| e.new_value("title").cloned())
            .collect();
        assert_eq!(titles, vec![Some(json!("two")), Some(json!("three"))]);
    }

    #[test]
    fn head_survives_a_full_prune() {
        let dir = TempDir::new().unwrap();
        let b = backend(&dir);
        b.insert(
            "occurrences",
            obj(json!({"collaborator_id": "c1", "type": "X", "title": "t", "date_event": "2025-10-01"})),
        )
        .unwrap();
        let head = outbox_head(b.conn()).unwrap();
        assert_eq!(prune_outbox(b.conn(), head).unwrap(), 1);
        assert_eq!(outbox_head(b.conn()).unwrap(), head);

        let mut sub = b.subscribe(ChangeFilter::new("occurrences", EventKind::Insert)).unwrap();
        assert_eq!(sub.cursor(), head);
        b.insert(
            "occurrences",
            obj(json!({"collaborator_id": "c1", "type": "X", "title": "u", "date_event": "2025-10-02"})),
        )
        .unwrap();
        assert_eq!(sub.poll().unwrap().len(), 1);
    }

    #[test]
    fn reset_link_lands_in_the_mailbox() {
        let dir = TempDir::new().unwrap();
        let b = backend(&dir);
        let user = b.create_user("ana@example.com", "old").unwrap();

        b.reset_password_for_email("nobody@example.com").unwrap();
        assert!(!dir.path().join("storage").join(MAILBOX_BUCKET).exists());

        b.reset_password_for_email("ana@example.com").unwrap();
        let inbox = dir.path().join("storage").join(MAILBOX_BUCKET).join(&user.id);
        let mail = std::fs::read_dir(&inbox).unwrap().next().unwrap().unwrap().path();
        let text = std::fs::read_to_string(mail).unwrap();
        assert!(text.starts_with("To: ana@example.com"));
        let token = text.lines().find(|l| l.starts_with("rpo_")).unwrap();

        b.complete_password_reset(token, "new").unwrap();
        assert!(b.sign_in("ana@example.com", "new").is_ok());
        assert!(matches!(
            b.complete_password_reset(token, "again"),
            Err(AppError::InvalidResetToken)
        ));
    }

    #[test]
    fn unknown_rpc_is_rejected() {
        let dir = TempDir::new().unwrap();
        let b = backend(&dir);
        assert!(matches!(
            b.rpc("drop_everything", json!({})),
            Err(AppError::UnknownRpc(_))
        ));
    }
}
