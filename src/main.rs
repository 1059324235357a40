//! netvault CLI - Main entry point.

use netvault::cli::{Cli, Commands};
use netvault::config::{ConfigStore, Settings};
use netvault::observability;
use netvault::orchestrator::{BackupOrchestrator, BackupTask};
use netvault::report::{render_report, LogReportSink};
use netvault::schedule::engine::build_engine;
use netvault::store::ArtifactStore;
use netvault::transport::OpenSshTransport;
use std::sync::Arc;
use std::time::SystemTime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let config = Arc::new(ConfigStore::open(&cli.config_dir)?);
    let mut settings = config.load_settings()?;
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.clone();
    }
    observability::init(&settings.logging)?;

    match cli.command {
        Commands::Backup => {
            let task = build_task(config.clone(), &settings)?;
            let result = task.execute().await;

            let (subject, body) = render_report(&result);
            println!("{}\n\n{}", subject, body);
        }

        Commands::Schedule => {
            let task = build_task(config.clone(), &settings)?;
            let engine = build_engine(
                settings.backup.scheduler,
                settings.backup.schedule.clone(),
                Arc::new(task),
            );

            // Ctrl-C requests a stop; start() returns once the engine has
            // wound down.
            let signal_engine = engine.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    signal_engine.stop();
                }
            });

            engine.start().await?;
        }

        Commands::Test => {
            let devices = config.load_devices()?;
            let orchestrator = build_orchestrator(&settings)?;

            for report in orchestrator.test_devices(&devices).await {
                let status = if report.ok { "OK" } else { "FAIL" };
                println!("{}: {} - {}", report.device, status, report.message);
            }
        }

        Commands::Config => {
            let devices = config.load_devices()?;
            println!("Devices:");
            for device in &devices {
                println!(
                    "  {} ({}) type={} port={}",
                    device.display_name(),
                    device.ip,
                    device.device_type,
                    device.port
                );
            }

            println!("\nSettings:");
            print!("{}", serde_yaml::to_string(&redacted(&settings))?);
        }

        Commands::Stats => {
            let store = ArtifactStore::open(&settings.backup.directory)?;
            let stats = store.statistics()?;
            print!("{}", serde_yaml::to_string(&stats)?);
        }

        Commands::List => {
            let store = ArtifactStore::open(&settings.backup.directory)?;
            let mut artifacts = store.list_artifacts()?;
            artifacts.sort_by(|a, b| {
                b.modified
                    .cmp(&a.modified)
                    .then_with(|| a.file_name.cmp(&b.file_name))
            });

            if artifacts.is_empty() {
                println!("No artifacts stored");
            }
            let now = SystemTime::now();
            for artifact in artifacts {
                let age_days = artifact.age(now).as_secs() / 86_400;
                println!(
                    "{:<48} {:>10} B  {:>4}d",
                    artifact.file_name, artifact.size, age_days
                );
            }
        }
    }

    Ok(())
}

/// Wire an orchestrator from settings and the default transport.
fn build_orchestrator(settings: &Settings) -> anyhow::Result<BackupOrchestrator> {
    let transport = Arc::new(OpenSshTransport::new());
    let store = ArtifactStore::open(&settings.backup.directory)?;
    Ok(BackupOrchestrator::new(
        transport,
        store,
        settings.backup.retention_days,
    ))
}

/// Wire the full scheduled action: load, run, report.
fn build_task(config: Arc<ConfigStore>, settings: &Settings) -> anyhow::Result<BackupTask> {
    let orchestrator = Arc::new(build_orchestrator(settings)?);
    Ok(BackupTask::new(config, orchestrator, Arc::new(LogReportSink)))
}

/// Copy of the settings safe to print.
fn redacted(settings: &Settings) -> Settings {
    let mut copy = settings.clone();
    if !copy.email.sender_password.is_empty() {
        copy.email.sender_password = "<redacted>".to_string();
    }
    copy
}
