use chrono::{Days, Utc};
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};

use importer::{
    ImportBatchResult, Importer,
    readers::{EmailReader, EmlDirStore, ImageReader, PdfReader},
};
use ledger::SqlLedger;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "spoglio")]
#[command(about = "Imports transactions from statements, receipts and mailboxes into the ledger")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./spoglio.db?mode=rwc"
    )]
    database_url: String,

    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a bank or card statement PDF.
    Pdf(FileArgs),
    /// Import a receipt photo or screenshot.
    Image(FileArgs),
    /// Scan a mailbox export for transaction notifications.
    Email(EmailArgs),
}

#[derive(Args, Debug)]
struct FileArgs {
    file: String,
}

#[derive(Args, Debug)]
struct EmailArgs {
    /// Directory of exported .eml files.
    #[arg(long)]
    dir: String,
    /// Only scan messages received in the last N days.
    #[arg(long, default_value_t = 30)]
    days: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "spoglio={level},importer={level},ledger={level}",
            level = settings.app.level
        ))
        .init();

    let database = sea_orm::Database::connect(&cli.database_url).await?;
    Migrator::up(&database, None).await?;

    let provider = importer::providers::build(&settings.import.provider)?;
    tracing::info!(provider = provider.name(), "starting import batch");

    let units = match &cli.command {
        Command::Pdf(args) => PdfReader::new(&args.file).read(),
        Command::Image(args) => ImageReader::new(&args.file, provider.multimodal()).read(),
        Command::Email(args) => {
            let today = Utc::now().date_naive();
            let since = today
                .checked_sub_days(Days::new(args.days))
                .unwrap_or(today);
            let store = EmlDirStore::connect(&args.dir)?;
            EmailReader::new(store, since).read().await
        }
    };

    let importer = Importer::new(provider, SqlLedger::new(database), settings.import.clone());
    let result = importer.run(units).await;
    print_result(&result);

    Ok(())
}

fn print_result(result: &ImportBatchResult) {
    println!("{result}");
    for warning in &result.warnings {
        println!("warning: {warning}");
    }

    if !result.unit_errors.is_empty() {
        println!("\nskipped units:");
        for error in &result.unit_errors {
            println!("  {}: {}", error.origin, error.message);
        }
    }

    if !result.rejected.is_empty() {
        println!("\nfor review:");
        for rejected in &result.rejected {
            println!(
                "  {} | {} | {} -> {}",
                rejected.candidate.date,
                rejected.candidate.amount,
                rejected.candidate.description,
                rejected.reason
            );
        }
    }
}
