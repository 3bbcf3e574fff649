use super::{accepted, read_file};
use crate::cli::parser::{Commands, LeaveAction};
use crate::config::Config;
use crate::core::leave::{Attachment, LeaveLogic, NewLeave};
use crate::errors::{AppError, AppResult};
use crate::models::leave::LeaveType;
use crate::ui::messages::{header, info, success};
use crate::utils::colors::{color_for_status, paint};
use crate::utils::date;
use crate::utils::table::Table;
use chrono::Utc;

fn parse_day(s: &str) -> AppResult<chrono::NaiveDate> {
    date::parse_date(s).ok_or_else(|| AppError::InvalidDate(s.to_string()))
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Leave { action } = cmd else {
        return Ok(());
    };
    let ctx = accepted(cfg)?;

    match action {
        LeaveAction::List => {
            let list = LeaveLogic::list(&ctx)?;
            if list.is_empty() {
                info("Nenhuma solicitação.");
                return Ok(());
            }
            let mut table = Table::new(&["Tipo", "Início", "Fim", "Dias", "Status", "Id"]);
            for r in &list {
                table.add_row(vec![
                    r.kind.label().to_string(),
                    r.start_date.format("%d/%m/%Y").to_string(),
                    r.end_date.format("%d/%m/%Y").to_string(),
                    r.days_count.to_string(),
                    paint(color_for_status(r.status.to_db_str()), r.status.label()),
                    r.id.clone(),
                ]);
            }
            header("Minhas solicitações");
            print!("{}", table.render());
        }

        LeaveAction::New {
            kind,
            start,
            end,
            reason,
            attach,
        } => {
            let attachment = match attach {
                Some(path) => {
                    let (file_name, bytes) = read_file(path)?;
                    Some(Attachment { file_name, bytes })
                }
                None => None,
            };
            let req = NewLeave {
                kind: LeaveType::parse(kind)?,
                start: parse_day(start)?,
                end: end.as_deref().map(parse_day).transpose()?,
                reason: reason.clone(),
                attachment,
            };
            let created = LeaveLogic::create(&ctx, &cfg.documents_bucket, req, Utc::now())?;
            success(format!(
                "Solicitação de {} enviada: {} dia(s) a partir de {} ({})",
                created.kind.label(),
                created.days_count,
                created.start_date.format("%d/%m/%Y"),
                created.status.label()
            ));
        }

        LeaveAction::Balance => {
            let b = LeaveLogic::balance(&ctx);
            header("Saldo de férias");
            println!("Disponível: {} dias", b.available);
            println!("Usufruído:  {} dias", b.taken);
            println!("Total:      {} dias", b.total);
        }

        LeaveAction::Upcoming => {
            let list = LeaveLogic::upcoming(&ctx, date::today())?;
            if list.is_empty() {
                info("Nenhum afastamento aprovado nos próximos dias.");
                return Ok(());
            }
            header("Próximos afastamentos");
            for r in &list {
                println!(
                    "• {} - {} ({} dias)",
                    r.start_date.format("%d/%m/%Y"),
                    r.kind.label(),
                    r.days_count
                );
            }
        }
    }

    Ok(())
}
