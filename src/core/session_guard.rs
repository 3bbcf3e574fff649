//! Single-device admission: the session record in `user_active_sessions`
//! names the token that currently owns the account. Every client of the
//! same user listens for overwrites of that record; a token other than its
//! own means a newer login elsewhere, and this client has to leave.
//!
//! The record is a last-writer-wins register. Two logins racing each other
//! can both end up kicked, or neither; no compare-and-swap is attempted.

use crate::backend::{ChangeEvent, ChangeFilter, EventKind, RecordStore, Subscription};
use crate::db::log::Journal;
use crate::errors::AppResult;
use crate::models::record::Record;
use crate::models::session_record::SessionRecord;
use crate::ui::messages::warning;
use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Active,
    /// Terminal for this session instance.
    Revoked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Ignore,
    Kick,
}

#[derive(Debug)]
pub struct SessionGuard {
    user_id: String,
    token: String,
    subscription: Option<Subscription>,
    state: GuardState,
}

fn session_filter(user_id: &str) -> ChangeFilter {
    ChangeFilter::new(SessionRecord::TABLE, EventKind::Any).with_eq(SessionRecord::KEY, user_id)
}

impl SessionGuard {
    /// A guard that never kicks: used when registration could not be
    /// completed.
    pub fn unguarded(user_id: &str, token: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            token: token.to_string(),
            subscription: None,
            state: GuardState::Active,
        }
    }

    /// Claim the account for `token` and start listening for other claims.
    ///
    /// The subscription is opened before the write, so the echo of our own
    /// upsert is seen (and ignored) like any other notification.
    pub fn register<S>(store: &S, user_id: &str, token: &str, device: &str, now: DateTime<Utc>) -> Self
    where
        S: RecordStore + Journal,
    {
        let mut subscription = match store.subscribe(session_filter(user_id)) {
            Ok(s) => s,
            Err(e) => {
                warning(format!("Session listener unavailable: {}", e));
                store.journal("session_register_failed", user_id, &e.to_string());
                return Self::unguarded(user_id, token);
            }
        };

        let written = SessionRecord::new(user_id, token, device, now)
            .to_row()
            .and_then(|row| store.upsert(SessionRecord::TABLE, SessionRecord::KEY, row));

        if let Err(e) = written {
            subscription.unsubscribe();
            warning(format!("Could not register this session: {}", e));
            store.journal("session_register_failed", user_id, &e.to_string());
            return Self::unguarded(user_id, token);
        }

        store.journal(
            "session_registered",
            user_id,
            &format!("Session registered for device '{}'", device),
        );

        Self {
            user_id: user_id.to_string(),
            token: token.to_string(),
            subscription: Some(subscription),
            state: GuardState::Active,
        }
    }

    /// Rebuild the guard of an existing session from a saved feed cursor.
    pub fn resume<S: RecordStore>(store: &S, user_id: &str, token: &str, cursor: i64) -> AppResult<Self> {
        let subscription = store.resume(session_filter(user_id), cursor)?;
        Ok(Self {
            user_id: user_id.to_string(),
            token: token.to_string(),
            subscription: Some(subscription),
            state: GuardState::Active,
        })
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Whether another device's login will be detected.
    pub fn is_enforcing(&self) -> bool {
        self.state == GuardState::Active
            && self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Feed position to save for a later [`SessionGuard::resume`].
    pub fn cursor(&self) -> Option<i64> {
        self.subscription
            .as_ref()
            .filter(|s| s.is_active())
            .map(Subscription::cursor)
    }

    /// Decide on one notification. Tokens are compared by value; a kick
    /// moves the guard to `Revoked` and can only happen once.
    pub fn handle(&mut self, ev: &ChangeEvent) -> GuardDecision {
        if self.state == GuardState::Revoked {
            return GuardDecision::Ignore;
        }

        let owner = ev.new_value(SessionRecord::KEY).and_then(Value::as_str);
        if owner != Some(self.user_id.as_str()) {
            return GuardDecision::Ignore;
        }

        // deletes carry no new owner
        let Some(new_token) = ev.new_value("session_id").and_then(Value::as_str) else {
            return GuardDecision::Ignore;
        };

        if new_token == self.token {
            return GuardDecision::Ignore;
        }

        self.state = GuardState::Revoked;
        self.release();
        GuardDecision::Kick
    }

    /// Drain pending notifications. Returns `Some(Kick)` the one time the
    /// session is revoked.
    pub fn pump(&mut self) -> AppResult<Option<GuardDecision>> {
        loop {
            let next = match self.subscription.as_mut() {
                Some(sub) => sub.next_event()?,
                None => None,
            };
            let Some(ev) = next else {
                return Ok(None);
            };
            if self.handle(&ev) == GuardDecision::Kick {
                return Ok(Some(GuardDecision::Kick));
            }
        }
    }

    /// Stop listening. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(sub) = self.subscription.as_mut() {
            sub.unsubscribe();
        }
    }
}
