//! rPonto library root.
//! Exposes the CLI parser, the high-level run() function and the internal modules.

pub mod backend;
pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod export;
pub mod models;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::commands;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;

/// Central command dispatcher
pub fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    let cmd = &cli.command;
    match cmd {
        Commands::Init => commands::init::handle(cli),
        Commands::Config { .. } => commands::config::handle(cmd, cfg),
        Commands::Db { .. } => commands::db::handle(cmd, cfg),
        Commands::Log { .. } => commands::log::handle(cmd, cfg),
        Commands::Login { .. }
        | Commands::Logout
        | Commands::ForgotPassword { .. }
        | Commands::ResetPassword { .. }
        | Commands::Refresh
        | Commands::Whoami => commands::auth::handle(cmd, cfg),
        Commands::Terms { .. } => commands::terms::handle(cmd, cfg),
        Commands::Watch { .. } => commands::watch::handle(cmd, cfg),
        Commands::Punch { .. } | Commands::Suggest | Commands::History { .. } => {
            commands::punch::handle(cmd, cfg)
        }
        Commands::Profile { .. } => commands::profile::handle(cmd, cfg),
        Commands::Leave { .. } => commands::leave::handle(cmd, cfg),
        Commands::Docs { .. } => commands::docs::handle(cmd, cfg),
        Commands::Occurrences => commands::occurrences::handle(cmd, cfg),
        Commands::Admin { .. } => commands::admin::handle(cmd, cfg),
    }
}

/// Entry point used by main.rs
pub fn run() -> AppResult<()> {
    let cli = Cli::parse();

    let mut cfg = Config::load()?;

    if let Some(custom_db) = &cli.db {
        cfg.database = custom_db.clone();
    }
    if let Some(device) = &cli.device {
        cfg.device_name = device.clone();
    }

    dispatch(&cli, &cfg)
}
