//! Contract of the hosted backend the client talks to: authentication, a
//! filtered record store with change notifications, object storage and
//! named remote procedures.
//!
//! [`local::LocalBackend`] implements every trait on top of SQLite and the
//! filesystem.

pub mod auth;
pub mod feed;
pub mod local;
pub mod rpc;
pub mod storage;

use crate::errors::{AppError, AppResult};
use crate::models::user::{AuthSession, User};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub use feed::{ChangeEvent, ChangeFilter, EventKind, Subscription};

/// Untyped record as exchanged with the store.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Gte(String, Value),
    Lte(String, Value),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn gte(column: &str, value: impl Into<Value>) -> Self {
        Filter::Gte(column.to_string(), value.into())
    }

    pub fn lte(column: &str, value: impl Into<Value>) -> Self {
        Filter::Lte(column.to_string(), value.into())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::Gte(c, _) | Filter::Lte(c, _) => c,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            Filter::Eq(_, v) | Filter::Gte(_, v) | Filter::Lte(_, v) => v,
        }
    }

    pub fn operator(&self) -> &'static str {
        match self {
            Filter::Eq(..) => "=",
            Filter::Gte(..) => ">=",
            Filter::Lte(..) => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// Read request: `SELECT * FROM table WHERE filters ORDER BY … LIMIT …`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(name: &str) -> Self {
        Self {
            table: name.to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::gte(column, value));
        self
    }

    pub fn lte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::lte(column, value));
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Table and column names end up inside SQL text: only plain identifiers
/// are accepted.
pub fn validate_ident(name: &str) -> AppResult<&str> {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    let re = IDENT.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("valid regex"));
    if re.is_match(name) {
        Ok(name)
    } else {
        Err(AppError::Backend(format!("invalid identifier '{}'", name)))
    }
}

pub trait AuthClient {
    fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthSession>;

    /// Resolve a token into its live session; `None` when unknown or revoked.
    fn get_session(&self, token: &str) -> AppResult<Option<AuthSession>>;

    fn get_user(&self, token: &str) -> AppResult<User> {
        self.get_session(token)?
            .map(|s| s.user)
            .ok_or(AppError::SessionExpired)
    }

    /// Issue a new token for the session and revoke the old one.
    fn refresh_session(&self, token: &str) -> AppResult<AuthSession>;

    fn sign_out(&self, token: &str) -> AppResult<()>;

    /// Send a password reset link to `email`. Succeeds for unknown
    /// addresses too.
    fn reset_password_for_email(&self, email: &str) -> AppResult<()>;
}

pub trait RecordStore {
    fn select(&self, query: &Query) -> AppResult<Vec<Row>>;

    /// Insert one row and return it as stored (generated id and defaults included).
    fn insert(&self, table: &str, row: Row) -> AppResult<Row>;

    /// Patch every row matching all `filters`; returns the number of rows changed.
    fn update(&self, table: &str, filters: &[Filter], patch: Row) -> AppResult<usize>;

    /// Insert, or overwrite the row whose `key` column matches.
    fn upsert(&self, table: &str, key: &str, row: Row) -> AppResult<Row>;

    /// Open a change subscription starting at the current end of the feed.
    fn subscribe(&self, filter: ChangeFilter) -> AppResult<Subscription>;

    /// Reopen a subscription from a previously saved cursor.
    fn resume(&self, filter: ChangeFilter, cursor: i64) -> AppResult<Subscription>;
}

pub trait ObjectStorage {
    fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> AppResult<()>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

pub trait RpcClient {
    fn rpc(&self, name: &str, params: Value) -> AppResult<Value>;
}

/// Everything the client needs from the hosted platform.
pub trait Backend: AuthClient + RecordStore + ObjectStorage + RpcClient {}

impl<T: AuthClient + RecordStore + ObjectStorage + RpcClient> Backend for T {}
