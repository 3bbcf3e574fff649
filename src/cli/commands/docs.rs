use super::{accepted, read_file};
use crate::cli::parser::{Commands, DocsAction};
use crate::config::Config;
use crate::core::documents::{self, DocumentFilter, SignOutcome};
use crate::errors::AppResult;
use crate::ui::messages::{header, info, success, warning};
use crate::utils::colors::{GREEN, GREY, paint};
use crate::utils::path::expand_tilde;
use crate::utils::table::Table;
use chrono::{Local, Utc};
use std::fs;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Docs { action } = cmd else {
        return Ok(());
    };
    let ctx = accepted(cfg)?;

    match action {
        DocsAction::List {
            year,
            month,
            category,
        } => {
            let filter = DocumentFilter {
                year: *year,
                month: *month,
                category: category.clone(),
            };
            let docs = documents::list(&ctx, &filter)?;
            if docs.is_empty() {
                info("Nenhum documento encontrado.");
                return Ok(());
            }

            let mut table = Table::new(&["Nome", "Categoria", "Competência", "Assinatura", "Id"]);
            for d in &docs {
                let signed = match d.signed_at {
                    Some(at) => paint(
                        GREEN,
                        &format!("assinado {}", at.with_timezone(&Local).format("%d/%m/%Y")),
                    ),
                    None => paint(GREY, "pendente"),
                };
                table.add_row(vec![
                    d.name.clone(),
                    d.category.clone(),
                    d.competence().unwrap_or_else(|| "-".into()),
                    signed,
                    d.id.clone(),
                ]);
            }
            header("Documentos");
            print!("{}", table.render());
        }

        DocsAction::Upload { file, folder } => {
            let (name, bytes) = read_file(file)?;
            let doc = documents::upload(&ctx, &cfg.documents_bucket, &name, &bytes, folder, Utc::now())?;
            success(format!("Documento enviado ({}): {}", doc.category, doc.url));
        }

        DocsAction::Sign { id, signature } => {
            let encoded = fs::read_to_string(expand_tilde(signature))?;
            match documents::sign(&ctx, &cfg.documents_bucket, id, &encoded, Utc::now())? {
                SignOutcome::Signed { signature_url } => {
                    success(format!("Documento assinado: {}", signature_url));
                }
                SignOutcome::AlreadySigned { signed_at } => {
                    warning(format!(
                        "Documento já assinado em {}",
                        signed_at.with_timezone(&Local).format("%d/%m/%Y %H:%M")
                    ));
                }
            }
        }
    }

    Ok(())
}
