//! Change notifications as an explicit channel.
//!
//! A [`Subscription`] is a lazy, unbounded and restartable sequence of
//! [`ChangeEvent`]s read from a [`ChangeSource`] after a cursor. It is
//! consumed by a single handler and cancelled explicitly.

use super::Row;
use crate::db::values::loosely_equal;
use crate::errors::AppResult;
use serde_json::Value;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Insert,
    Update,
    Delete,
    /// Filter-only: matches any of the above.
    Any,
}

impl EventKind {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EventKind::Insert => "INSERT",
            EventKind::Update => "UPDATE",
            EventKind::Delete => "DELETE",
            EventKind::Any => "*",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "INSERT" => Some(EventKind::Insert),
            "UPDATE" => Some(EventKind::Update),
            "DELETE" => Some(EventKind::Delete),
            "*" => Some(EventKind::Any),
            _ => None,
        }
    }

    /// Whether a filter of this kind lets an event of kind `event` through.
    pub fn accepts(&self, event: EventKind) -> bool {
        *self == EventKind::Any || *self == event
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Position in the feed; strictly increasing.
    pub id: i64,
    pub table: String,
    pub kind: EventKind,
    pub new: Option<Row>,
    pub old: Option<Row>,
}

impl ChangeEvent {
    /// Row the event is about: the new image, or the old one for deletes.
    pub fn row(&self) -> Option<&Row> {
        self.new.as_ref().or(self.old.as_ref())
    }

    pub fn new_value(&self, column: &str) -> Option<&Value> {
        self.new.as_ref().and_then(|r| r.get(column))
    }
}

/// What a subscriber wants to hear about: one table, one event kind and an
/// optional equality on a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeFilter {
    pub table: String,
    pub event: EventKind,
    pub column_eq: Option<(String, Value)>,
}

impl ChangeFilter {
    pub fn new(table: &str, event: EventKind) -> Self {
        Self {
            table: table.to_string(),
            event,
            column_eq: None,
        }
    }

    pub fn with_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.column_eq = Some((column.to_string(), value.into()));
        self
    }

    pub fn matches(&self, ev: &ChangeEvent) -> bool {
        if ev.table != self.table || !self.event.accepts(ev.kind) {
            return false;
        }
        match &self.column_eq {
            None => true,
            Some((col, expected)) => ev
                .row()
                .and_then(|r| r.get(col))
                .is_some_and(|v| loosely_equal(v, expected)),
        }
    }
}

/// Backend side of a subscription.
pub trait ChangeSource {
    /// Events of `table` with an id strictly greater than `cursor`, oldest first.
    fn changes_after(&self, table: &str, cursor: i64) -> AppResult<Vec<ChangeEvent>>;

    /// Id of the most recent event in the feed (0 when empty).
    fn head(&self) -> AppResult<i64>;
}

pub struct Subscription {
    source: Rc<dyn ChangeSource>,
    filter: ChangeFilter,
    cursor: i64,
    active: bool,
    pending: VecDeque<ChangeEvent>,
}

impl Subscription {
    pub fn new(source: Rc<dyn ChangeSource>, filter: ChangeFilter, cursor: i64) -> Self {
        Self {
            source,
            filter,
            cursor,
            active: true,
            pending: VecDeque::new(),
        }
    }

    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }

    /// Last feed position this subscription has read past.
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn fetch(&mut self) -> AppResult<()> {
        let events = self.source.changes_after(&self.filter.table, self.cursor)?;
        for ev in events {
            self.cursor = self.cursor.max(ev.id);
            if self.filter.matches(&ev) {
                self.pending.push_back(ev);
            }
        }
        Ok(())
    }

    /// Next matching event, or `None` when nothing is pending right now
    /// (or the subscription was cancelled).
    pub fn next_event(&mut self) -> AppResult<Option<ChangeEvent>> {
        if !self.active {
            return Ok(None);
        }
        if self.pending.is_empty() {
            self.fetch()?;
        }
        Ok(self.pending.pop_front())
    }

    /// Every matching event available right now.
    pub fn poll(&mut self) -> AppResult<Vec<ChangeEvent>> {
        if !self.active {
            return Ok(Vec::new());
        }
        self.fetch()?;
        Ok(self.pending.drain(..).collect())
    }

    /// Restart reading from `cursor`. Events already buffered are dropped.
    pub fn resume_from(&mut self, cursor: i64) {
        self.pending.clear();
        self.cursor = cursor;
    }

    /// Stop the subscription. Calling it again is a no-op.
    pub fn unsubscribe(&mut self) {
        self.active = false;
        self.pending.clear();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("filter", &self.filter)
            .field("cursor", &self.cursor)
            .field("active", &self.active)
            .finish()
    }
}
