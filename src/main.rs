use analytics::AnalyticsEngine;
use anyhow::Context;
use clap::{Parser, Subcommand};
use configuration::{LogFormat, Settings};
use core_types::Trade;
use database::DbRepository;
use importer::{ImportFile, Importer};
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

mod render;

/// The main entry point for the Tradelog application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if present.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let mut settings = configuration::load_config(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        settings.logging.format = format;
    }
    // Held until exit so buffered file logs are flushed.
    let _log_guard = configuration::init_tracing(&settings.logging)?;

    let engine = AnalyticsEngine::with_offset(settings.analytics.offset()?);

    // Execute the appropriate command
    match cli.command {
        Commands::Report(args) => handle_report(args, &settings, engine).await,
        Commands::Import(args) => handle_import(args, &settings).await,
        Commands::Challenges(args) => handle_challenges(args, &settings, engine).await,
        Commands::Serve(args) => handle_serve(args, &settings, engine).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A trading journal: analytics over journaled trades and broker fill import.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults to ./tradelog.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured console log format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the analytics snapshot for a set of trades.
    Report(ReportArgs),
    /// Import broker fills for a user into the journal.
    Import(ImportArgs),
    /// Show a user's prop-firm challenges against their rules.
    Challenges(ChallengesArgs),
    /// Run the HTTP API.
    Serve(ServeArgs),
}

#[derive(Parser)]
struct ReportArgs {
    /// A JSON file holding an array of trades.
    #[arg(long, conflicts_with = "user", required_unless_present = "user")]
    file: Option<PathBuf>,

    /// Read the trades of this user from the database instead.
    #[arg(long)]
    user: Option<Uuid>,

    /// Print the snapshot as JSON instead of tables.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ImportArgs {
    /// The user the trades belong to.
    #[arg(long)]
    user: Uuid,

    /// A JSON file of the form `{ "contracts": {id: name}, "fills": [...] }`.
    #[arg(long)]
    file: PathBuf,
}

#[derive(Parser)]
struct ChallengesArgs {
    #[arg(long)]
    user: Uuid,

    /// Print the challenges and their progress as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ServeArgs {
    /// Address to bind (defaults to server.host:server.port from the configuration).
    #[arg(long)]
    addr: Option<SocketAddr>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn connect_repository(settings: &Settings) -> anyhow::Result<DbRepository> {
    let pool = database::connect(settings.database.url.as_deref(), settings.database.max_connections)
        .await
        .context("Failed to connect to the database")?;
    database::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(DbRepository::new(pool))
}

async fn handle_report(
    args: ReportArgs,
    settings: &Settings,
    engine: AnalyticsEngine,
) -> anyhow::Result<()> {
    let trades: Vec<Trade> = match (&args.file, args.user) {
        (Some(path), _) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse trades in {}", path.display()))?
        }
        (None, Some(user_id)) => connect_repository(settings).await?.get_trades_for_user(user_id).await?,
        (None, None) => anyhow::bail!("either --file or --user is required"),
    };

    tracing::info!(trades = trades.len(), "Computing analytics.");
    let snapshot = engine.calculate(&trades);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{}", render::render_snapshot(&snapshot));
    }
    Ok(())
}

async fn handle_import(args: ImportArgs, settings: &Settings) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let import = ImportFile::from_json(&raw)?;

    let importer = Importer::new(connect_repository(settings).await?);
    let report = importer.run(args.user, import.fills, &import.contracts).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.success {
        anyhow::bail!("{} order(s) failed to import", report.errors.len());
    }
    Ok(())
}

async fn handle_challenges(
    args: ChallengesArgs,
    settings: &Settings,
    engine: AnalyticsEngine,
) -> anyhow::Result<()> {
    let repo = connect_repository(settings).await?;
    let challenges = repo.get_challenges_for_user(args.user).await?;
    let trades = repo.get_trades_for_user(args.user).await?;
    let now = chrono::Utc::now();

    let rows: Vec<_> = challenges
        .into_iter()
        .map(|challenge| {
            let progress = engine.challenge_progress(&challenge, &trades, now);
            (challenge, progress)
        })
        .collect();

    if args.json {
        let json: Vec<_> = rows
            .iter()
            .map(|(challenge, progress)| {
                serde_json::json!({ "challenge": challenge, "progress": progress })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else if rows.is_empty() {
        println!("No challenges for user {}.", args.user);
    } else {
        println!("{}", render::render_challenges(&rows));
    }
    Ok(())
}

async fn handle_serve(
    args: ServeArgs,
    settings: &Settings,
    engine: AnalyticsEngine,
) -> anyhow::Result<()> {
    let addr = match args.addr {
        Some(addr) => addr,
        None => format!("{}:{}", settings.server.host, settings.server.port)
            .parse()
            .context("Invalid server.host / server.port")?,
    };

    let db_repo = connect_repository(settings).await?;
    web_server::run_server(addr, web_server::AppState { db_repo, engine }).await
}
