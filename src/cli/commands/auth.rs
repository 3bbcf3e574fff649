use super::{open_context, signed_in};
use crate::backend::AuthClient;
use crate::backend::local::LocalBackend;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::profile;
use crate::errors::AppResult;
use crate::ui::messages::{info, success, warning};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    match cmd {
        Commands::Login { email, password } => {
            let mut ctx = open_context(cfg)?;
            if ctx.is_authenticated() {
                info("Closing the previous session of this device.");
                ctx.sign_out()?;
            }
            let session = ctx.sign_in(email, password)?;
            success(format!(
                "Signed in as {} on device '{}'",
                session.user.email, cfg.device_name
            ));
            if !ctx.is_enforcing() {
                warning("Single-device protection is not active for this session.");
            }
        }

        Commands::Logout => {
            let mut ctx = open_context(cfg)?;
            if ctx.is_authenticated() {
                ctx.sign_out()?;
                success("Signed out.");
            } else {
                ctx.sign_out()?;
                info("No session on this device.");
            }
        }

        Commands::ForgotPassword { email } => {
            let backend = LocalBackend::open(cfg)?;
            backend.reset_password_for_email(email)?;
            success("Link de redefinição enviado! Verifique seu e-mail.");
        }

        Commands::ResetPassword { token, password } => {
            let backend = LocalBackend::open(cfg)?;
            let user = backend.complete_password_reset(token, password)?;
            success(format!(
                "Senha redefinida para {}. Entre novamente em cada dispositivo.",
                user.email
            ));
        }

        Commands::Refresh => {
            let mut ctx = signed_in(cfg)?;
            ctx.refresh()?;
            success("Session token refreshed.");
        }

        Commands::Whoami => {
            let ctx = signed_in(cfg)?;
            let user = ctx.user()?;
            println!("👤 {} ({})", user.email, user.id);
            println!("📱 Device: {}", ctx.device());
            if let Some(p) = profile::lookup_optional(&ctx)? {
                println!("🏢 {} - {}", p.full_name, p.role_or_default());
            }
            if ctx.is_enforcing() {
                println!("🔒 Single-device protection: active");
            } else {
                println!("🔓 Single-device protection: inactive");
            }
        }

        _ => {}
    }

    Ok(())
}
