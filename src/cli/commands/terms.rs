use super::signed_in;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::punch::FixedLocation;
use crate::core::terms::{self, LOCATION_NOTICE, TERMS_TEXT, TERMS_VERSION};
use crate::errors::{AppError, AppResult};
use crate::models::punch::LocationSample;
use crate::ui::messages::{blocking_notice, header, info, success};
use chrono::{Local, Utc};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Terms {
        accept,
        lat,
        lng,
        accuracy,
    } = cmd
    {
        let ctx = signed_in(cfg)?;

        if !*accept {
            header(format!("Termos de uso - versão {}", TERMS_VERSION));
            match terms::current(&ctx)? {
                Some(a) => info(format!(
                    "Aceitos em {}.",
                    a.accepted_at.with_timezone(&Local).format("%d/%m/%Y %H:%M")
                )),
                None => {
                    println!("{}", TERMS_TEXT);
                    println!("{}", LOCATION_NOTICE);
                    info("Para aceitar: rponto terms --accept --lat <LAT> --lng <LNG>");
                }
            }
            return Ok(());
        }

        let location = FixedLocation {
            sample: lat.zip(*lng).map(|(lat, lng)| LocationSample {
                lat,
                lng,
                accuracy: *accuracy,
                is_mocked: false,
            }),
        };

        match terms::accept(&ctx, &location, Utc::now()) {
            Ok(_) => success("Termos aceitos. Bem-vindo de volta!"),
            Err(AppError::LocationDenied) => {
                blocking_notice(
                    "Permissão Necessária",
                    "Para aceitar os termos e garantir a conformidade legal, precisamos da sua localização.",
                );
                return Err(AppError::LocationDenied);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}
