//! Authentication state of one device: the current session, its guard and
//! the persisted token.

use super::device_store::{DeviceState, DeviceStore};
use super::session_guard::{GuardDecision, GuardState, SessionGuard};
use crate::backend::Backend;
use crate::db::log::Journal;
use crate::errors::{AppError, AppResult, ErrorCategory};
use crate::models::user::{AuthEvent, AuthSession, User};
use crate::ui::messages::warning;
use chrono::Utc;

pub const KICK_TITLE: &str = "Aviso de Segurança";
pub const KICK_BODY: &str = "Você conectou em outro dispositivo. Esta sessão será encerrada.";

/// Shows a message the user has to acknowledge.
pub trait Notifier {
    fn blocking_notice(&self, title: &str, body: &str);
}

/// Terminal notifier used by the CLI.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn blocking_notice(&self, title: &str, body: &str) {
        crate::ui::messages::blocking_notice(title, body);
    }
}

pub struct SessionContext<B: Backend + Journal> {
    backend: B,
    devices: DeviceStore,
    device: String,
    session: Option<AuthSession>,
    guard: Option<SessionGuard>,
}

impl<B: Backend + Journal> SessionContext<B> {
    /// Restore the device's session, if any.
    ///
    /// The persisted token is checked with the backend; a revoked or
    /// unknown token is forgotten. A valid one gets its guard back from the
    /// saved cursor, so a login elsewhere in the meantime is still noticed.
    /// A session saved without a cursor was never registered and is
    /// registered again here.
    pub fn init(backend: B, devices: DeviceStore, device: &str) -> AppResult<Self> {
        let mut ctx = Self {
            backend,
            devices,
            device: device.to_string(),
            session: None,
            guard: None,
        };

        let Some(state) = ctx.devices.load(device)? else {
            return Ok(ctx);
        };

        let session = match ctx.backend.get_session(&state.token) {
            Ok(Some(s)) if s.user.id == state.user_id => s,
            Ok(_) => {
                ctx.backend
                    .journal("session_expired", &state.user_id, "Stored token no longer valid");
                ctx.devices.clear(device)?;
                return Ok(ctx);
            }
            Err(e) if e.category() == ErrorCategory::Auth => {
                ctx.backend.journal("session_expired", &state.user_id, &e.to_string());
                ctx.devices.clear(device)?;
                return Ok(ctx);
            }
            Err(e) => {
                warning(format!("Could not validate the stored session: {}", e));
                return Ok(ctx);
            }
        };

        match state.cursor {
            Some(cursor) => {
                let guard =
                    SessionGuard::resume(&ctx.backend, &session.user.id, &session.access_token, cursor)
                        .unwrap_or_else(|e| {
                            warning(format!("Session listener unavailable: {}", e));
                            SessionGuard::unguarded(&session.user.id, &session.access_token)
                        });
                ctx.session = Some(session);
                ctx.guard = Some(guard);
            }
            // the last registration failed: this start is the retry
            None => ctx.adopt(session)?,
        }
        Ok(ctx)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn user(&self) -> AppResult<&User> {
        self.session
            .as_ref()
            .map(|s| &s.user)
            .ok_or(AppError::NotAuthenticated)
    }

    pub fn is_enforcing(&self) -> bool {
        self.guard.as_ref().is_some_and(SessionGuard::is_enforcing)
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> AppResult<&AuthSession> {
        let session = self.backend.sign_in(email, password)?;
        self.on_auth_event(AuthEvent::SignedIn(session))?;
        self.session.as_ref().ok_or(AppError::NotAuthenticated)
    }

    /// Rotate the token and claim the account again with the new one.
    pub fn refresh(&mut self) -> AppResult<&AuthSession> {
        let token = self
            .session
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or(AppError::NotAuthenticated)?;

        match self.backend.refresh_session(&token) {
            Ok(session) => {
                self.on_auth_event(AuthEvent::TokenRefreshed(session))?;
                self.session.as_ref().ok_or(AppError::NotAuthenticated)
            }
            Err(e) => {
                if matches!(e, AppError::SessionExpired) {
                    self.teardown()?;
                }
                Err(e)
            }
        }
    }

    /// React to an auth state transition.
    pub fn on_auth_event(&mut self, event: AuthEvent) -> AppResult<()> {
        match event {
            AuthEvent::SignedIn(session) => {
                self.backend.journal(
                    "login",
                    &session.user.id,
                    &format!("Signed in as {} on '{}'", session.user.email, self.device),
                );
                self.adopt(session)
            }
            AuthEvent::TokenRefreshed(session) => {
                self.backend
                    .journal("refresh", &session.user.id, "Session token refreshed");
                self.adopt(session)
            }
            AuthEvent::SignedOut => self.teardown(),
        }
    }

    fn adopt(&mut self, session: AuthSession) -> AppResult<()> {
        if let Some(old) = self.guard.as_mut() {
            old.release();
        }

        let guard = SessionGuard::register(
            &self.backend,
            &session.user.id,
            &session.access_token,
            &self.device,
            Utc::now(),
        );

        self.devices.save(
            &self.device,
            &DeviceState {
                token: session.access_token.clone(),
                user_id: session.user.id.clone(),
                cursor: guard.cursor(),
            },
        )?;

        self.session = Some(session);
        self.guard = Some(guard);
        Ok(())
    }

    /// Handle pending change notifications.
    ///
    /// When another device has taken over, the user is shown the security
    /// notice, the session is signed out and `Revoked` is returned.
    pub fn process_notifications(&mut self, notifier: &dyn Notifier) -> AppResult<GuardState> {
        let user_id = self.user()?.id.clone();
        let Some(guard) = self.guard.as_mut() else {
            return Ok(GuardState::Active);
        };

        match guard.pump() {
            Ok(Some(GuardDecision::Kick)) => {
                notifier.blocking_notice(KICK_TITLE, KICK_BODY);
                self.backend.journal(
                    "session_kicked",
                    &user_id,
                    &format!("Session on '{}' replaced by another device", self.device),
                );
                self.sign_out()?;
                Ok(GuardState::Revoked)
            }
            Ok(_) => {
                self.save_cursor()?;
                Ok(GuardState::Active)
            }
            Err(e) => {
                warning(format!("Could not read session notifications: {}", e));
                Ok(GuardState::Active)
            }
        }
    }

    fn save_cursor(&self) -> AppResult<()> {
        let (Some(session), Some(guard)) = (&self.session, &self.guard) else {
            return Ok(());
        };
        let Some(cursor) = guard.cursor() else {
            return Ok(());
        };
        self.devices.save(
            &self.device,
            &DeviceState {
                token: session.access_token.clone(),
                user_id: session.user.id.clone(),
                cursor: Some(cursor),
            },
        )
    }

    /// Sign out on the backend and drop all local session state.
    /// Calling it while signed out only clears leftovers.
    pub fn sign_out(&mut self) -> AppResult<()> {
        if let Some(session) = self.session.as_ref()
            && let Err(e) = self.backend.sign_out(&session.access_token)
        {
            warning(format!("Backend sign-out failed: {}", e));
            self.backend
                .journal("logout_failed", &session.user.id, &e.to_string());
        }
        self.teardown()
    }

    fn teardown(&mut self) -> AppResult<()> {
        if let Some(guard) = self.guard.as_mut() {
            guard.release();
        }
        if let Some(session) = self.session.take() {
            self.backend.journal(
                "logout",
                &session.user.id,
                &format!("Session closed on '{}'", self.device),
            );
        }
        self.guard = None;
        self.devices.clear(&self.device)
    }
}
