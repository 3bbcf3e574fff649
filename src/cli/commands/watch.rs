use super::signed_in;
use crate::backend::EventKind;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::dashboard::{DashboardUpdate, DashboardWatcher};
use crate::core::session_context::TerminalNotifier;
use crate::core::session_guard::GuardState;
use crate::errors::AppResult;
use crate::ui::messages::{info, warning};
use std::thread;
use std::time::Duration;

/// Poll the change feed until this session is replaced (or once, with `--once`).
/// Profile and leave request changes are printed as they arrive.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Watch { once } = cmd {
        // a session already replaced is reported by signed_in()
        let mut ctx = signed_in(cfg)?;
        if *once {
            info("Session active.");
            return Ok(());
        }

        let mut dashboard = match DashboardWatcher::open(&ctx) {
            Ok(d) => d,
            Err(e) => {
                warning(format!("Dashboard updates unavailable: {}", e));
                None
            }
        };

        info(format!(
            "Watching session of '{}' (every {} ms, Ctrl+C to stop)…",
            cfg.device_name, cfg.poll_interval_ms
        ));
        loop {
            thread::sleep(Duration::from_millis(cfg.poll_interval_ms.max(100)));
            if ctx.process_notifications(&TerminalNotifier)? == GuardState::Revoked {
                if let Some(d) = dashboard.as_mut() {
                    d.release();
                }
                return Ok(());
            }
            if let Some(d) = dashboard.as_mut() {
                for update in d.pending()? {
                    print_update(&update);
                }
            }
        }
    }

    Ok(())
}

fn print_update(update: &DashboardUpdate) {
    match update {
        DashboardUpdate::Profile(p) => {
            info(format!("Perfil atualizado: {} - {}", p.full_name, p.role_or_default()))
        }
        DashboardUpdate::Leave(EventKind::Delete, _) | DashboardUpdate::Leave(_, None) => {
            info("Solicitação removida.")
        }
        DashboardUpdate::Leave(kind, Some(r)) => {
            let verb = if *kind == EventKind::Insert { "registrada" } else { "atualizada" };
            info(format!(
                "Solicitação {} {}: {} → {} ({})",
                r.kind.label(),
                verb,
                r.start_date.format("%d/%m/%Y"),
                r.end_date.format("%d/%m/%Y"),
                r.status.label()
            ))
        }
    }
}
