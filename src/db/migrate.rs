use crate::ui::messages::success;
use rusqlite::{Connection, OptionalExtension, Result, params};

/// A schema step, applied once and remembered in the `log` table.
struct Migration {
    version: &'static str,
    description: &'static str,
    sql: &'static str,
}

const BASE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id              TEXT PRIMARY KEY,
        email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
        password_salt   TEXT NOT NULL,
        password_hash   TEXT NOT NULL,
        created_at      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS auth_sessions (
        token       TEXT PRIMARY KEY,
        user_id     TEXT NOT NULL REFERENCES users(id),
        created_at  TEXT NOT NULL,
        revoked     INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS collaborators (
        id          TEXT PRIMARY KEY,
        user_id     TEXT,
        email       TEXT COLLATE NOCASE,
        full_name   TEXT NOT NULL,
        role        TEXT,
        department  TEXT,
        hire_date   TEXT,
        cpf         TEXT,
        rg          TEXT,
        pis         TEXT,
        avatar_url  TEXT,
        created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );

    CREATE TABLE IF NOT EXISTS user_active_sessions (
        user_id      TEXT PRIMARY KEY,
        session_id   TEXT NOT NULL,
        device_info  TEXT NOT NULL DEFAULT '',
        last_seen    TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS time_entries (
        id           TEXT PRIMARY KEY,
        user_id      TEXT NOT NULL,
        type         TEXT NOT NULL CHECK(type IN ('ENTRY','BREAK_START','BREAK_END','EXIT')),
        clock_in     TEXT NOT NULL,
        lat          REAL NOT NULL,
        lng          REAL NOT NULL,
        accuracy     REAL,
        is_mocked    INTEGER NOT NULL DEFAULT 0,
        device_info  TEXT NOT NULL DEFAULT '',
        status       TEXT NOT NULL DEFAULT 'VALID' CHECK(status IN ('VALID','FLAGGED','ADJUSTED'))
    );

    CREATE TABLE IF NOT EXISTS leave_requests (
        id               TEXT PRIMARY KEY,
        collaborator_id  TEXT NOT NULL,
        type             TEXT NOT NULL CHECK(type IN ('FERIAS','FOLGA','LICENCA','FALTA','ATESTADO')),
        start_date       TEXT NOT NULL,
        end_date         TEXT NOT NULL,
        days_count       INTEGER NOT NULL,
        reason           TEXT NOT NULL DEFAULT '',
        status           TEXT NOT NULL DEFAULT 'PENDING'
                         CHECK(status IN ('PENDING','APPROVED','REJECTED','CANCELLED')),
        created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );

    CREATE TABLE IF NOT EXISTS collaborator_documents (
        id                TEXT PRIMARY KEY,
        collaborator_id   TEXT NOT NULL,
        name              TEXT NOT NULL,
        url               TEXT NOT NULL,
        category          TEXT NOT NULL DEFAULT 'Outros',
        type              TEXT,
        size_bytes        INTEGER NOT NULL DEFAULT 0,
        competence_month  INTEGER,
        competence_year   INTEGER,
        signed_at         TEXT,
        signature_url     TEXT,
        created_at        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );

    CREATE TABLE IF NOT EXISTS occurrences (
        id               TEXT PRIMARY KEY,
        collaborator_id  TEXT NOT NULL,
        type             TEXT NOT NULL,
        title            TEXT NOT NULL,
        description      TEXT NOT NULL DEFAULT '',
        date_event       TEXT NOT NULL,
        severity_level   INTEGER NOT NULL DEFAULT 1,
        created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );

    CREATE TABLE IF NOT EXISTS changes (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        table_name  TEXT NOT NULL,
        event       TEXT NOT NULL CHECK(event IN ('INSERT','UPDATE','DELETE')),
        new_row     TEXT,
        old_row     TEXT,
        created_at  TEXT NOT NULL
    );
"#;

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "20251001_0001_base_schema",
        description: "Created base self-service schema",
        sql: BASE_SCHEMA,
    },
    Migration {
        version: "20251014_0002_lookup_indexes",
        description: "Added lookup indexes for per-user queries",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_time_entries_user_clock ON time_entries(user_id, clock_in);
            CREATE INDEX IF NOT EXISTS idx_leave_requests_collab ON leave_requests(collaborator_id, start_date);
            CREATE INDEX IF NOT EXISTS idx_documents_collab ON collaborator_documents(collaborator_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_occurrences_collab ON occurrences(collaborator_id, date_event);
            CREATE INDEX IF NOT EXISTS idx_collaborators_user ON collaborators(user_id);
        "#,
    },
    Migration {
        version: "20251020_0003_changes_table_index",
        description: "Added change feed index on table name",
        sql: "CREATE INDEX IF NOT EXISTS idx_changes_table ON changes(table_name, id);",
    },
    Migration {
        version: "20251103_0004_term_acceptances",
        description: "Added terms of use acceptances",
        sql: r#"
            CREATE TABLE IF NOT EXISTS user_term_acceptances (
                id            TEXT PRIMARY KEY,
                user_id       TEXT NOT NULL,
                term_version  TEXT NOT NULL,
                accepted_at   TEXT NOT NULL,
                ip_address    TEXT NOT NULL DEFAULT '',
                lat           REAL NOT NULL,
                lng           REAL NOT NULL,
                accuracy      REAL,
                UNIQUE(user_id, term_version)
            );
        "#,
    },
    Migration {
        version: "20251110_0005_password_resets",
        description: "Added password reset tokens",
        sql: r#"
            CREATE TABLE IF NOT EXISTS password_resets (
                token       TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                used        INTEGER NOT NULL DEFAULT 0
            );
        "#,
    },
];

/// Ensure that the `log` table exists.
fn ensure_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn is_applied(conn: &Connection, version: &str) -> Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn apply(conn: &Connection, m: &Migration) -> Result<()> {
    conn.execute_batch(&format!("BEGIN;\n{}\nCOMMIT;", m.sql))
        .inspect_err(|_| {
            let _ = conn.execute_batch("ROLLBACK;");
        })?;

    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), 'migration_applied', ?1, ?2)",
        params![m.version, m.description],
    )?;

    success(format!("Migration applied: {} → {}", m.version, m.description));
    Ok(())
}

/// Versions of the migrations that still have to run.
pub fn pending_migrations(conn: &Connection) -> Result<Vec<&'static str>> {
    ensure_log_table(conn)?;
    let mut out = Vec::new();
    for m in MIGRATIONS {
        if !is_applied(conn, m.version)? {
            out.push(m.version);
        }
    }
    Ok(out)
}

/// Public entry point: run all pending migrations, in order.
///
/// Invoked by db::initialize::init_db().
pub fn run_pending_migrations(conn: &Connection) -> Result<()> {
    ensure_log_table(conn)?;

    for m in MIGRATIONS {
        if !is_applied(conn, m.version)? {
            apply(conn, m)?;
        }
    }

    Ok(())
}
