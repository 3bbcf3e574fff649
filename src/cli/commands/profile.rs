use super::{accepted, read_file};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::documents::content_type_for;
use crate::core::profile::{self, format_cpf, format_pis, format_rg, sensitive, time_in_company};
use crate::errors::AppResult;
use crate::ui::messages::{header, success};
use crate::utils::colors::colorize_optional;
use crate::utils::date;
use chrono::Utc;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Profile { reveal, avatar } = cmd {
        let ctx = accepted(cfg)?;

        if let Some(file) = avatar {
            let (name, bytes) = read_file(file)?;
            let url = profile::update_avatar(
                &ctx,
                &cfg.documents_bucket,
                &name,
                &bytes,
                content_type_for(&name),
                Utc::now().timestamp_millis(),
            )?;
            success(format!("Foto de perfil atualizada: {}", url));
        }

        let p = profile::lookup(&ctx)?;
        let email = ctx.user()?.email.clone();

        header(format!("({}) {}", p.initial(), p.full_name));
        println!("{}", email);
        if let Some(url) = &p.avatar_url {
            println!("🖼️  {}", url);
        }

        println!("\nInformações Profissionais");
        println!("  Cargo:        {}", p.role_or_default());
        println!(
            "  Departamento: {}",
            colorize_optional(p.department.as_deref().unwrap_or("-"))
        );
        match p.hire_date {
            Some(h) => {
                println!("  Admissão:     {}", h.format("%d/%m/%Y"));
                println!("  Tempo de casa: {}", time_in_company(h, date::today()));
            }
            None => println!("  Admissão:     {}", colorize_optional("-")),
        }

        println!("\nDocumentos");
        println!("  CPF: {}", sensitive(p.cpf.as_deref(), format_cpf, *reveal));
        println!("  RG:  {}", sensitive(p.rg.as_deref(), format_rg, *reveal));
        println!("  PIS: {}", sensitive(p.pis.as_deref(), format_pis, *reveal));
    }

    Ok(())
}
