//! Local credential and token bookkeeping (`users`, `auth_sessions`).

use crate::errors::{AppError, AppResult};
use crate::models::user::{AuthSession, User};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

fn new_token() -> String {
    format!(
        "rpo_{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

fn parse_ts(s: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| AppError::InvalidDate(s.to_string()))
}

pub fn create_user(conn: &Connection, email: &str, password: &str) -> AppResult<User> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::InvalidInput(format!("invalid e-mail '{}'", email)));
    }
    if password.is_empty() {
        return Err(AppError::InvalidInput("empty password".into()));
    }

    let id = Uuid::new_v4().to_string();
    let salt = Uuid::new_v4().simple().to_string();
    conn.execute(
        "INSERT INTO users (id, email, password_salt, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id,
            email,
            salt,
            digest(&salt, password),
            Utc::now().to_rfc3339()
        ],
    )?;

    Ok(User {
        id,
        email: email.to_string(),
    })
}

pub fn sign_in(conn: &Connection, email: &str, password: &str) -> AppResult<AuthSession> {
    let found: Option<(String, String, String, String)> = conn
        .query_row(
            "SELECT id, email, password_salt, password_hash FROM users WHERE email = ?1",
            [email.trim()],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()?;

    let Some((id, email, salt, hash)) = found else {
        return Err(AppError::InvalidCredentials);
    };
    if digest(&salt, password) != hash {
        return Err(AppError::InvalidCredentials);
    }

    issue(conn, User { id, email })
}

fn issue(conn: &Connection, user: User) -> AppResult<AuthSession> {
    let token = new_token();
    let now = Utc::now();
    conn.execute(
        "INSERT INTO auth_sessions (token, user_id, created_at, revoked) VALUES (?1, ?2, ?3, 0)",
        params![token, user.id, now.to_rfc3339()],
    )?;
    Ok(AuthSession {
        access_token: token,
        user,
        created_at: now,
    })
}

pub fn get_session(conn: &Connection, token: &str) -> AppResult<Option<AuthSession>> {
    let found: Option<(String, String, String)> = conn
        .query_row(
            "SELECT s.created_at, u.id, u.email
             FROM auth_sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token = ?1 AND s.revoked = 0",
            [token],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;

    match found {
        None => Ok(None),
        Some((created_at, id, email)) => Ok(Some(AuthSession {
            access_token: token.to_string(),
            user: User { id, email },
            created_at: parse_ts(&created_at)?,
        })),
    }
}

pub fn refresh(conn: &Connection, token: &str) -> AppResult<AuthSession> {
    let current = get_session(conn, token)?.ok_or(AppError::SessionExpired)?;
    revoke(conn, token)?;
    issue(conn, current.user)
}

pub fn revoke(conn: &Connection, token: &str) -> AppResult<()> {
    conn.execute(
        "UPDATE auth_sessions SET revoked = 1 WHERE token = ?1",
        [token],
    )?;
    Ok(())
}

/// How long a password reset link stays usable.
pub const RESET_TTL_MINUTES: i64 = 60;

/// Open a password reset for `email`. Unknown addresses give `None` so the
/// caller cannot tell them apart from known ones.
pub fn request_reset(
    conn: &Connection,
    email: &str,
    now: DateTime<Utc>,
) -> AppResult<Option<(User, String)>> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::InvalidInput("Por favor, informe seu e-mail.".into()));
    }

    let found: Option<(String, String)> = conn
        .query_row(
            "SELECT id, email FROM users WHERE email = ?1",
            [email],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let Some((id, email)) = found else {
        return Ok(None);
    };

    let token = new_token();
    conn.execute(
        "INSERT INTO password_resets (token, user_id, created_at, used) VALUES (?1, ?2, ?3, 0)",
        params![token, id, now.to_rfc3339()],
    )?;
    Ok(Some((User { id, email }, token)))
}

/// Set a new password with a reset token. The token works once and only
/// within [`RESET_TTL_MINUTES`]; every session of the user is revoked.
pub fn complete_reset(
    conn: &Connection,
    token: &str,
    new_password: &str,
    now: DateTime<Utc>,
) -> AppResult<User> {
    if new_password.is_empty() {
        return Err(AppError::InvalidInput("empty password".into()));
    }

    let found: Option<(String, String, String)> = conn
        .query_row(
            "SELECT r.created_at, u.id, u.email
             FROM password_resets r JOIN users u ON u.id = r.user_id
             WHERE r.token = ?1 AND r.used = 0",
            [token],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    let Some((created_at, id, email)) = found else {
        return Err(AppError::InvalidResetToken);
    };
    if now - parse_ts(&created_at)? > Duration::minutes(RESET_TTL_MINUTES) {
        return Err(AppError::InvalidResetToken);
    }

    let salt = Uuid::new_v4().simple().to_string();
    conn.execute(
        "UPDATE users SET password_salt = ?1, password_hash = ?2 WHERE id = ?3",
        params![salt, digest(&salt, new_password), id],
    )?;
    conn.execute("UPDATE password_resets SET used = 1 WHERE token = ?1", [token])?;
    conn.execute(
        "UPDATE auth_sessions SET revoked = 1 WHERE user_id = ?1",
        [&id],
    )?;

    Ok(User { id, email })
}
