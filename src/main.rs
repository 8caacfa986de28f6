//! mcresolve CLI
//!
//! Lists and searches catalog versions, installs or removes a version in the
//! data directory and launches it.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mcresolve::core::launch::{format_command_for_logs, spawn, MemoryPolicy};
use mcresolve::core::state::{default_data_dir, DATA_DIR_ENV};
use mcresolve::core::version::VersionKind;
use mcresolve::{init_logging, Launcher, LauncherResult, LauncherSettings, PreparedVersion};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Release,
    Snapshot,
    OldBeta,
    OldAlpha,
}

impl From<KindArg> for VersionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Release => VersionKind::Release,
            KindArg::Snapshot => VersionKind::Snapshot,
            KindArg::OldBeta => VersionKind::LegacyBeta,
            KindArg::OldAlpha => VersionKind::LegacyAlpha,
        }
    }
}

#[derive(Parser)]
#[command(name = "mcresolve", version)]
#[command(about = "Install and launch Minecraft versions", long_about = None)]
struct Cli {
    /// Store root for versions, libraries, assets and settings
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List versions from the catalog
    Versions {
        /// Only show one release channel
        #[arg(long, value_enum)]
        kind: Option<KindArg>,

        /// Ignore the cached catalog
        #[arg(long)]
        refresh: bool,

        /// Only show versions whose id or channel contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// List versions present in the data directory
    Installed,
    /// Delete an installed version (libraries and assets are kept)
    Remove { version: String },
    /// Download everything a version needs
    Install { version: String },
    /// Install if needed, then start the game
    Launch {
        version: String,

        /// Print the command instead of running it
        #[arg(long)]
        dry_run: bool,

        /// Player name for this launch only
        #[arg(long)]
        username: Option<String>,
    },
    /// Show or change persisted settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current settings as JSON
    Show,
    SetUsername { name: String },
    /// `auto`, or a size such as 4096, 4096M or 4G
    SetMemory { value: MemoryPolicy },
    SetJava { path: PathBuf },
    /// Game window size in pixels
    SetWindow { width: u32, height: u32 },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let data_dir = match std::path::absolute(&data_dir) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error: invalid data directory {:?}: {}", data_dir, e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, data_dir).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, data_dir: PathBuf) -> LauncherResult<ExitCode> {
    let mut settings = LauncherSettings::load(&data_dir);

    match command {
        Command::Versions {
            kind,
            refresh,
            search,
        } => {
            let launcher = Launcher::new(&data_dir, settings)?;
            let snapshot = launcher.versions(refresh).await?;
            if snapshot.is_stale() {
                warn!("Catalog is stale; showing the last cached copy");
            }
            let entries = match &search {
                Some(query) => snapshot.search(query),
                None => snapshot.entries.iter().collect(),
            };
            let kind = kind.map(VersionKind::from);
            for entry in entries.into_iter().filter(|e| kind.map_or(true, |k| e.kind == k)) {
                println!(
                    "{:<24} {:<10} {}",
                    entry.id,
                    entry.kind.to_string(),
                    entry.released_at.format("%Y-%m-%d")
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Installed => {
            let launcher = Launcher::new(&data_dir, settings)?;
            for id in launcher.installed_versions()? {
                println!("{}", id);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Remove { version } => {
            let launcher = Launcher::new(&data_dir, settings)?;
            launcher.remove_version(&version).await?;
            println!("Removed {}", version);
            Ok(ExitCode::SUCCESS)
        }
        Command::Install { version } => {
            let launcher = Launcher::new(&data_dir, settings)?;
            let prepared = prepare_with_ctrl_c(&launcher, &version).await?;
            report(&prepared);
            Ok(if prepared.is_complete() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Launch {
            version,
            dry_run,
            username,
        } => {
            if let Some(name) = username {
                settings.username = name;
            }
            let launcher = Launcher::new(&data_dir, settings)?;
            let prepared = prepare_with_ctrl_c(&launcher, &version).await?;
            report(&prepared);

            let env: BTreeMap<String, String> = std::env::vars().collect();
            let plan = launcher.launch_plan(&prepared, &env).await?;
            if dry_run {
                println!("{}", format_command_for_logs(&plan));
                return Ok(ExitCode::SUCCESS);
            }

            info!("Launching {}", version);
            let mut child = spawn(&plan)?;
            let status = child.wait().await?;
            info!("Game exited with {}", status);
            Ok(match status.code() {
                Some(0) => ExitCode::SUCCESS,
                Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
                None => ExitCode::FAILURE,
            })
        }
        Command::Config { action } => {
            match action {
                ConfigAction::Show => {
                    println!("{}", serde_json::to_string_pretty(&settings)?);
                    return Ok(ExitCode::SUCCESS);
                }
                ConfigAction::SetUsername { name } => settings.username = name,
                ConfigAction::SetMemory { value } => settings.memory = value,
                ConfigAction::SetJava { path } => settings.java_path = Some(path),
                ConfigAction::SetWindow { width, height } => {
                    settings.set_window_size(width, height)?
                }
            }
            settings.validate()?;
            settings.save(&data_dir)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run `prepare`, cancelling pending downloads on Ctrl-C.
async fn prepare_with_ctrl_c(launcher: &Launcher, version: &str) -> LauncherResult<PreparedVersion> {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; finishing in-flight downloads");
                cancel.cancel();
            }
        })
    };

    let result = launcher.prepare(version, &cancel).await;
    watcher.abort();
    result
}

fn report(prepared: &PreparedVersion) {
    println!(
        "{}: {} artifacts, {} fetched, {} failed, {} native files",
        prepared.descriptor.id,
        prepared.set.artifacts().len(),
        prepared.fetch.succeeded().count(),
        prepared.fetch.failed_count(),
        prepared.extraction.extracted.len()
    );
    for failure in prepared.failures() {
        let kind = failure
            .error_kind
            .map(|k| k.to_string())
            .unwrap_or_default();
        println!(
            "  failed {:?} ({}): {}",
            failure.target_path,
            kind,
            failure.message.as_deref().unwrap_or("")
        );
    }
    for failure in &prepared.extraction.failures {
        println!("  natives {:?}: {}", failure.archive, failure.reason);
    }
}
