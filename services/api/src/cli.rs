use crate::demo::{run_bootstrap_admin, run_demo, run_export, AdminArgs, DemoArgs, ExportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use lia_banken::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "LIA Banken",
    about = "Run and demonstrate the LIA Banken internship placement service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Seed an in-memory platform and print every role's dashboard
    Demo(DemoArgs),
    /// Export data from a database snapshot
    Export {
        #[command(subcommand)]
        command: ExportCommand,
    },
    /// Create an administrator account in a database snapshot
    BootstrapAdmin(AdminArgs),
}

#[derive(Subcommand, Debug)]
enum ExportCommand {
    /// Write every application, joined with posting, company, and student, as CSV
    Applications(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Export {
            command: ExportCommand::Applications(args),
        } => run_export(args),
        Command::BootstrapAdmin(args) => run_bootstrap_admin(args),
    }
}
