//! Maintenance commands that need direct database access.

use clap::{Parser, Subcommand};
use solo_registration_backend::changes::ChangeFeed;
use solo_registration_backend::error::AppError;
use solo_registration_backend::portal::Portal;
use solo_registration_config::get_config;
use solo_registration_database::PgGateway;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "solo-admin",
    about = "Maintenance of the solo registration portal",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inserts the performance weeks of the season. Existing weeks are kept.
    SeedWeeks,
    /// Deletes every registration together with its submissions.
    ResetRegistrations {
        /// Required, there is no undo.
        #[arg(long)]
        yes: bool,
    },
    /// Creates an administrator or sets a new password for it.
    AddAdmin {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SOLO_ADMIN_PASSWORD")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = get_config()?;
    let database_url = config.database_url().ok_or(AppError::MissingDatabaseUrl)?;
    let portal = Portal::new(
        PgGateway::connect(database_url)?,
        ChangeFeed::new(1),
        config.default_max_slots,
    );

    match cli.command {
        Command::SeedWeeks => {
            let report = portal.seed_weeks().await;
            if report.failed > 0 {
                warn!("{} weeks could not be seeded", report.failed);
            }
        }
        Command::ResetRegistrations { yes } => {
            if !yes {
                return Err(AppError::ConfirmationRequired);
            }
            let deleted = portal.reset_registrations().await?;
            info!("{deleted} registrations deleted");
        }
        Command::AddAdmin { email, password } => {
            let admin = portal.add_admin(&email, &password).await?;
            info!("admin {} is ready", admin.email);
        }
    }
    Ok(())
}
