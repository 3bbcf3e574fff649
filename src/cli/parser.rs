use crate::core::punch::BiometricMode;
use crate::export::ExportFormat;
use clap::{Parser, Subcommand};

/// Command-line interface definition for rPonto
/// Employee self-service client: time clock, leave requests, documents
#[derive(Parser)]
#[command(
    name = "rponto",
    version = env!("CARGO_PKG_VERSION"),
    about = "Employee self-service: time-clock punches, leave requests, documents and HR occurrences",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Name of this device (each device keeps its own session)
    #[arg(global = true, long = "device")]
    pub device: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Manage the configuration file (view or edit)
    Config {
        #[arg(long = "print", help = "Print the current configuration file")]
        print_config: bool,

        #[arg(long = "check", help = "Check configuration file for missing fields")]
        check: bool,

        #[arg(long = "migrate", help = "Run configuration file migrations if needed")]
        migrate: bool,

        #[arg(
            long = "edit",
            help = "Edit the configuration file (default editor: $EDITOR, or nano/vim/notepad)"
        )]
        edit_config: bool,

        #[arg(
            long = "editor",
            help = "Specify the editor to use (vim, nano, or custom path)"
        )]
        editor: Option<String>,
    },

    /// Manage the database (migrations, integrity checks, etc.)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity")]
        check: bool,

        #[arg(long = "vacuum", help = "Optimize the database using VACUUM")]
        vacuum: bool,

        #[arg(long = "info", help = "Show database information")]
        info: bool,
    },

    /// Print the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },

    /// Sign in on this device (signs out any other device of the same user)
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Sign out of this device
    Logout,

    /// Send a password reset link to an e-mail address
    ForgotPassword {
        #[arg(long)]
        email: String,
    },

    /// Set a new password with the code from the reset e-mail
    ResetPassword {
        #[arg(long)]
        token: String,

        #[arg(long)]
        password: String,
    },

    /// Rotate the session token
    Refresh,

    /// Show who is signed in on this device
    Whoami,

    /// Show or accept the terms of use (required before using the app)
    Terms {
        #[arg(long = "accept", help = "Accept the current version")]
        accept: bool,

        #[arg(long, allow_hyphen_values = true, requires = "lng")]
        lat: Option<f64>,

        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lng: Option<f64>,

        #[arg(long)]
        accuracy: Option<f64>,
    },

    /// Listen for session changes (another device signing in)
    Watch {
        #[arg(long = "once", help = "Process pending notifications and exit")]
        once: bool,
    },

    /// Record a time-clock punch (defaults to the suggested type)
    Punch {
        /// ENTRY, BREAK_START, BREAK_END, EXIT (or in, lunch, back, out)
        kind: Option<String>,

        #[arg(long, allow_hyphen_values = true, requires = "lng")]
        lat: Option<f64>,

        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lng: Option<f64>,

        #[arg(long)]
        accuracy: Option<f64>,

        #[arg(long = "mocked", help = "The position comes from a simulated provider")]
        mocked: bool,

        #[arg(long, value_enum, default_value = "unsupported")]
        biometric: BiometricMode,
    },

    /// Show the suggested next punch and the manual options
    Suggest,

    /// List punches of a month, optionally exporting them
    History {
        #[arg(long, short, value_name = "YYYY-MM", help = "Month to show (default: current)")]
        period: Option<String>,

        #[arg(long, value_enum, requires = "file")]
        export: Option<ExportFormat>,

        #[arg(long, value_name = "FILE")]
        file: Option<String>,

        #[arg(long, short = 'f', help = "Overwrite the export file without asking")]
        force: bool,
    },

    /// Show the collaborator profile
    Profile {
        #[arg(long = "reveal", help = "Show CPF, RG and PIS in clear")]
        reveal: bool,

        #[arg(long = "avatar", value_name = "FILE", help = "Upload a new profile picture")]
        avatar: Option<String>,
    },

    /// Leave and absence requests
    Leave {
        #[command(subcommand)]
        action: LeaveAction,
    },

    /// Personal documents
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// HR occurrences
    Occurrences,

    /// Back-office operations on the local backend
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
pub enum LeaveAction {
    /// List your requests, newest first
    List,

    /// Submit a new request
    New {
        #[arg(long = "type", help = "FERIAS, FOLGA, LICENCA, FALTA or ATESTADO")]
        kind: String,

        #[arg(long, help = "First day (YYYY-MM-DD or DD/MM/YYYY)")]
        start: String,

        #[arg(long, help = "Last day (defaults to the first day)")]
        end: Option<String>,

        #[arg(long, default_value = "")]
        reason: String,

        #[arg(long = "attach", value_name = "FILE", help = "Proof document (required for ATESTADO)")]
        attach: Option<String>,
    },

    /// Vacation balance of the current acquisition period
    Balance,

    /// Approved requests from today on
    Upcoming,
}

#[derive(Subcommand)]
pub enum DocsAction {
    /// List your documents
    List {
        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        month: Option<u32>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Upload a file
    Upload {
        file: String,

        #[arg(long, default_value = "requests")]
        folder: String,
    },

    /// Sign a document with a PNG signature (base64 text file)
    Sign {
        id: String,

        #[arg(long = "signature", value_name = "FILE")]
        signature: String,
    },
}

#[derive(Subcommand)]
pub enum AdminAction {
    /// Create a login with its collaborator profile
    AddUser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        department: Option<String>,

        #[arg(long = "hire-date")]
        hire_date: Option<String>,

        #[arg(long)]
        cpf: Option<String>,

        #[arg(long)]
        rg: Option<String>,

        #[arg(long)]
        pis: Option<String>,
    },

    /// Publish a document to a collaborator
    AddDocument {
        #[arg(long)]
        email: String,

        #[arg(long)]
        file: String,

        #[arg(long, default_value = "Holerite")]
        category: String,

        #[arg(long)]
        month: Option<u32>,

        #[arg(long)]
        year: Option<i32>,
    },

    /// Record an HR occurrence
    AddOccurrence {
        #[arg(long)]
        email: String,

        #[arg(long = "type", default_value = "ADVERTENCIA")]
        kind: String,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        date: String,

        #[arg(long, default_value_t = 1)]
        severity: i64,
    },

    /// Approve, reject or cancel a leave request
    SetLeaveStatus {
        id: String,

        status: String,
    },

    /// Review a punch (VALID, FLAGGED, ADJUSTED)
    SetPunchStatus {
        id: String,

        status: String,
    },
}
