use super::read_file;
use crate::backend::local::LocalBackend;
use crate::cli::parser::{AdminAction, Commands};
use crate::config::Config;
use crate::core::admin::{AdminLogic, NewCollaborator, PublishedDocument};
use crate::errors::{AppError, AppResult};
use crate::models::leave::LeaveStatus;
use crate::models::punch::PunchStatus;
use crate::ui::messages::success;
use crate::utils::date;
use chrono::{NaiveDate, Utc};

fn parse_day(s: &str) -> AppResult<NaiveDate> {
    date::parse_date(s).ok_or_else(|| AppError::InvalidDate(s.to_string()))
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Admin { action } = cmd else {
        return Ok(());
    };
    let backend = LocalBackend::open(cfg)?;

    match action {
        AdminAction::AddUser {
            email,
            password,
            name,
            role,
            department,
            hire_date,
            cpf,
            rg,
            pis,
        } => {
            let profile = NewCollaborator {
                full_name: name.clone(),
                role: role.clone(),
                department: department.clone(),
                hire_date: hire_date.as_deref().map(parse_day).transpose()?,
                cpf: cpf.clone(),
                rg: rg.clone(),
                pis: pis.clone(),
            };
            let (user, collaborator) = AdminLogic::add_user(&backend, email, password, profile)?;
            success(format!(
                "User {} created (collaborator {})",
                user.email, collaborator.id
            ));
        }

        AdminAction::AddDocument {
            email,
            file,
            category,
            month,
            year,
        } => {
            if let Some(m) = month
                && !(1..=12).contains(m)
            {
                return Err(AppError::InvalidInput(format!("month {m}")));
            }
            let (file_name, bytes) = read_file(file)?;
            let doc = AdminLogic::add_document(
                &backend,
                &cfg.documents_bucket,
                email,
                PublishedDocument {
                    file_name,
                    bytes,
                    category: category.clone(),
                    competence_month: *month,
                    competence_year: *year,
                },
                Utc::now(),
            )?;
            success(format!("Document {} published ({})", doc.name, doc.id));
        }

        AdminAction::AddOccurrence {
            email,
            kind,
            title,
            description,
            date: when,
            severity,
        } => {
            let occ = AdminLogic::add_occurrence(
                &backend,
                email,
                &kind.trim().to_uppercase(),
                title,
                description,
                parse_day(when)?,
                *severity,
            )?;
            success(format!("Occurrence {} recorded ({})", occ.title, occ.id));
        }

        AdminAction::SetLeaveStatus { id, status } => {
            let status = LeaveStatus::parse(status)?;
            AdminLogic::set_leave_status(&backend, id, status)?;
            success(format!("Request {} is now {}", id, status.to_db_str()));
        }

        AdminAction::SetPunchStatus { id, status } => {
            let parsed = PunchStatus::from_db_str(&status.trim().to_uppercase())
                .ok_or_else(|| AppError::InvalidStatus(status.clone()))?;
            AdminLogic::set_punch_status(&backend, id, parsed)?;
            success(format!("Punch {} is now {}", id, parsed.to_db_str()));
        }
    }

    Ok(())
}
