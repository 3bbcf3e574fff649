use super::accepted;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::punch::{FixedLocation, PunchLogic};
use crate::core::suggestion::{manual_options, suggest};
use crate::errors::{AppError, AppResult};
use crate::export::ExportLogic;
use crate::models::punch::{LocationSample, PunchKind, PunchStatus};
use crate::ui::messages::{header, info, success, warning};
use crate::utils::colors::{color_for_status, paint};
use crate::utils::date;
use crate::utils::table::Table;
use chrono::Utc;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    match cmd {
        Commands::Punch {
            kind,
            lat,
            lng,
            accuracy,
            mocked,
            biometric,
        } => {
            let ctx = accepted(cfg)?;

            let kind = match kind {
                Some(k) => PunchKind::parse(k)?,
                None => suggest(&PunchLogic::today(&ctx, date::today())?).kind,
            };

            let location = FixedLocation {
                sample: lat.zip(*lng).map(|(lat, lng)| LocationSample {
                    lat,
                    lng,
                    accuracy: *accuracy,
                    is_mocked: *mocked,
                }),
            };

            let punch = PunchLogic::clock_in(&ctx, kind, biometric, &location, Utc::now())?;
            success(format!(
                "{} registrada às {} ({})",
                punch.kind.history_label(),
                punch.time_str(),
                punch.date_str()
            ));
            if punch.status == PunchStatus::Flagged {
                warning("Localização simulada detectada: registro marcado para revisão.");
            }
        }

        Commands::Suggest => {
            let ctx = accepted(cfg)?;
            let today = PunchLogic::today(&ctx, date::today())?;
            let s = suggest(&today);

            header("Ponto");
            println!("👉 {}  ({})", s.label, s.kind.to_db_str());
            println!("   {}", s.subtext);
            println!();
            let options: Vec<String> = manual_options()
                .iter()
                .map(|o| format!("{} [{}]", o.label, o.kind.to_db_str()))
                .collect();
            info(format!("Registro manual: {}", options.join(" · ")));

            if let Some(last) = today.first() {
                println!(
                    "Último registro: {} às {}",
                    last.kind.history_label(),
                    last.time_str()
                );
            }
        }

        Commands::History {
            period,
            export,
            file,
            force,
        } => {
            let ctx = accepted(cfg)?;
            let (start, end) = match period {
                Some(p) => date::parse_month(p).ok_or_else(|| AppError::InvalidDate(p.clone()))?,
                None => date::current_month(),
            };
            let punches = PunchLogic::history(&ctx, start, end)?;

            if let (Some(format), Some(file)) = (export, file) {
                let n = ExportLogic::export_punches(&punches, *format, file, *force)?;
                info(format!("{} punches exported as {}", n, format.as_str()));
                return Ok(());
            }

            if punches.is_empty() {
                info(format!("Nenhum registro entre {} e {}.", start, end));
                return Ok(());
            }

            let mut table = Table::new(&["Data", "Hora", "Tipo", "Status", "Dispositivo"]);
            for p in &punches {
                table.add_row(vec![
                    p.date_str(),
                    p.time_str(),
                    p.kind.history_label().to_string(),
                    paint(color_for_status(p.status.to_db_str()), p.status.to_db_str()),
                    p.device_info.clone(),
                ]);
            }
            header(format!("Histórico {} → {}", start, end));
            print!("{}", table.render());
        }

        _ => {}
    }

    Ok(())
}
