use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use frcbom_api::{
    auth::hash_password,
    config::{self, AppConfig},
    db::{self, DbPool},
    services::admin::{AdminService, BomDict, RestoreReport, SettingsDict},
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::HashPassword(args) => handle_hash_password(args),
        Commands::Migrate => {
            let context = CliContext::initialize().await?;
            db::run_migrations(&context.db)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied to {}", redact_url(&context.config.database_url));
            Ok(())
        }
        Commands::ExportBom(args) => {
            let context = CliContext::initialize().await?;
            handle_export(&context, args).await
        }
        Commands::ImportBom(args) => {
            let context = CliContext::initialize().await?;
            handle_import(&context, args, cli.json).await
        }
    }
}

#[derive(Parser)]
#[command(
    name = "frcbom",
    about = "Maintenance commands for the FRC BOM tracker",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an Argon2 hash for APP__ADMIN_PASSWORD_HASH
    HashPassword(HashPasswordArgs),
    /// Apply pending database migrations
    Migrate,
    /// Write BOM snapshots (or system settings) to a JSON file
    ExportBom(TransferArgs),
    /// Restore BOM snapshots (or system settings) from a JSON file
    ImportBom(TransferArgs),
}

#[derive(Args)]
struct HashPasswordArgs {
    #[arg(help = "Password to hash")]
    password: String,
}

#[derive(Args)]
struct TransferArgs {
    #[arg(help = "JSON file to write or read")]
    file: PathBuf,
    #[arg(
        long,
        help = "Limit to one team; the file then holds robot -> system -> value for that team"
    )]
    team: Option<i32>,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Transfer Onshape settings instead of BOM snapshots"
    )]
    settings: bool,
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;

        Ok(Self {
            config,
            db: Arc::new(db_pool),
        })
    }

    fn admin_service(&self) -> AdminService {
        AdminService::new(self.db.clone())
    }
}

fn handle_hash_password(args: HashPasswordArgs) -> Result<()> {
    if args.password.len() < 8 {
        bail!("admin password must be at least 8 characters");
    }
    let hash = hash_password(&args.password).context("failed to hash password")?;
    println!("{hash}");
    Ok(())
}

async fn handle_export(context: &CliContext, args: TransferArgs) -> Result<()> {
    let service = context.admin_service();

    match (args.settings, args.team) {
        (false, None) => write_json(&args.file, &service.bom_dict().await?)?,
        (false, Some(team)) => write_json(&args.file, &service.team_bom(team).await?)?,
        (true, team) => {
            let mut dict = service.settings_dict().await?;
            if let Some(team) = team {
                dict.retain(|key, _| *key == team.to_string());
                if dict.is_empty() {
                    bail!("team {team} is not registered");
                }
            }
            write_json(&args.file, &dict)?
        }
    }

    println!("Wrote {}", args.file.display());
    Ok(())
}

async fn handle_import(context: &CliContext, args: TransferArgs, json: bool) -> Result<()> {
    let service = context.admin_service();

    let report = if args.settings {
        let dict: SettingsDict = read_dict(&args.file, args.team)?;
        service.restore_settings_dict(dict).await?
    } else {
        let dict: BomDict = read_dict(&args.file, args.team)?;
        service.restore_bom_dict(dict).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_report(&report);
    }
    Ok(())
}

/// Reads a full dictionary, or a single team's map wrapped under `team`.
fn read_dict<T: DeserializeOwned>(
    path: &Path,
    team: Option<i32>,
) -> Result<BTreeMap<String, T>> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    debug!(bytes = raw.len(), path = %path.display(), "read import file");

    match team {
        Some(team) => {
            let robots: T = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a robot map", path.display()))?;
            Ok(BTreeMap::from([(team.to_string(), robots)]))
        }
        None => serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a team dictionary", path.display())),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

fn render_report(report: &RestoreReport) {
    println!(
        "Restored {} team(s): {} robot(s) created, {} system(s) created, {} system(s) updated",
        report.teams_updated, report.robots_created, report.systems_created, report.systems_updated
    );
    for team in &report.skipped_teams {
        println!("- skipped unregistered team {team}");
    }
}

fn redact_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("****"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}
