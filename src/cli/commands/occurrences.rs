use super::accepted;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::occurrences;
use crate::errors::AppResult;
use crate::ui::messages::{header, info};
use crate::utils::colors::{color_for_severity, paint};
use crate::utils::table::Table;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if matches!(cmd, Commands::Occurrences) {
        let ctx = accepted(cfg)?;
        let list = occurrences::list(&ctx)?;

        if list.is_empty() {
            info("Nenhuma ocorrência registrada.");
            return Ok(());
        }

        let mut table = Table::new(&["Data", "Tipo", "Título", "Gravidade"]);
        for o in &list {
            table.add_row(vec![
                o.date_event.format("%d/%m/%Y").to_string(),
                o.kind.clone(),
                o.title.clone(),
                paint(color_for_severity(o.severity_level), o.severity_label()),
            ]);
        }
        header("Ocorrências");
        print!("{}", table.render());
        for o in list.iter().filter(|o| !o.description.is_empty()) {
            println!("• {}: {}", o.title, o.description);
        }
    }

    Ok(())
}
