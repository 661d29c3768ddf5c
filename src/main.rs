use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use security_agent::AgentError;
use security_agent::configs::{AgentSettings, ConfigManager, HarvestConfig};
use security_agent::delivery::DeliveryClient;
use security_agent::events::convert_eve_to_text;
use security_agent::harvest::{LogNormalizer, SystemTag};
use security_agent::loggers::{FileTransport, LogLevel, Logger, LoggerBuilder};
use security_agent::scheduler::{HarvestProgress, HarvestScheduler};
use security_agent::services::{Daemon, ServiceController};

#[derive(Parser)]
#[command(name = "security_agent", version, about = "Security daemon control and log harvesting agent")]
struct Cli {
    /// Settings file (JSON or TOML). Defaults to ~/.security_agent_config.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Load settings from an encrypted remote document instead of a local file
    #[arg(long, global = true)]
    cloud_config: Option<String>,

    /// Write diagnostic entries to this file instead of stdout
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce and deliver batches on a timer until done or Ctrl-C
    Harvest {
        #[arg(long)]
        files: Option<usize>,
        /// Seconds between batches
        #[arg(long)]
        interval: Option<u64>,
        #[arg(long)]
        logs: Option<usize>,
        /// Comma-separated system tags
        #[arg(long, value_delimiter = ',')]
        systems: Option<Vec<String>>,
        #[arg(long)]
        url: Option<String>,
        /// Store these values in the settings file
        #[arg(long)]
        remember: bool,
    },
    /// Probe the endpoint origin
    TestConnection {
        #[arg(long)]
        url: Option<String>,
    },
    /// Deliver a batch of synthetic test records
    SendTest {
        #[arg(long)]
        url: Option<String>,
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Deliver an arbitrary file
    Send {
        file: PathBuf,
        #[arg(long)]
        url: Option<String>,
        /// Send structured event logs as-is
        #[arg(long)]
        no_convert: bool,
    },
    /// Render a structured event log as text
    Convert {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print one normalized batch as JSON
    Collect {
        #[arg(long, value_delimiter = ',')]
        systems: Option<Vec<String>>,
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Control one of the security daemons
    Service {
        action: ServiceAction,
        daemon: String,
    },
    /// Scan a path with the antivirus engine
    Scan { path: PathBuf },
    /// Status of every daemon and host load
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum ServiceAction {
    Install,
    Dependencies,
    Configure,
    Start,
    Stop,
    Update,
    Status,
}

fn parse_systems(raw: &[String]) -> BTreeSet<SystemTag> {
    raw.iter().filter(|s| !s.trim().is_empty()).map(|s| SystemTag::from(s.as_str())).collect()
}

async fn load_settings(cli: &Cli) -> Result<(ConfigManager, PathBuf), AgentError> {
    let path = cli.config.clone().unwrap_or_else(ConfigManager::default_path);
    let manager = match &cli.cloud_config {
        Some(url) => ConfigManager::get_cloud_config(url).await?,
        None => ConfigManager::load_or_default(&path)?,
    };
    Ok((manager, path))
}

fn build_logger(cli: &Cli) -> Result<Logger, AgentError> {
    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    let mut builder = LoggerBuilder::new("security_agent").with_level(level);
    if let Some(path) = &cli.log_file {
        builder = builder.with_transport(Box::new(FileTransport::open(path)?));
    }
    builder.build()
}

fn components(settings: &AgentSettings, logger: &Logger) -> Result<(Arc<LogNormalizer>, Arc<DeliveryClient>), AgentError> {
    let normalizer = Arc::new(LogNormalizer::new(settings.sources.clone(), logger.for_component("normalizer")));
    let delivery = Arc::new(DeliveryClient::new(
        settings.delivery.clone(),
        settings.sources.batch_dir.clone(),
        logger.for_component("delivery"),
    )?);
    Ok((normalizer, delivery))
}

fn print_progress(p: HarvestProgress) {
    if p.completed {
        println!("Harvest finished ({}/{})", p.current, p.total);
    } else if p.seconds_left > 0 {
        println!("Batch {}/{} sent, next in {} s", p.current, p.total, p.seconds_left);
    } else {
        println!("Batch {}/{} sent", p.current, p.total);
    }
}

#[tokio::main]
async fn main() -> Result<(), AgentError> {
    let cli = Cli::parse();
    let logger = build_logger(&cli)?;
    let (manager, config_path) = load_settings(&cli).await?;
    security_agent::info!(logger, "Settings loaded", "source" => manager.source_info());
    let settings = manager.get();

    match cli.command {
        Commands::Harvest { files, interval, logs, systems, url, remember } => {
            manager.update(|s| {
                if let Some(v) = files {
                    s.harvest.file_count = v;
                }
                if let Some(v) = interval {
                    s.harvest.send_interval = v;
                }
                if let Some(v) = logs {
                    s.harvest.logs_per_file = v;
                }
                if let Some(v) = &systems {
                    s.harvest.selected_systems = v.clone();
                }
                if let Some(v) = &url {
                    s.endpoint_url = v.clone();
                }
            });
            let settings = manager.get();
            if remember {
                manager.save(&config_path)?;
            }
            let config: HarvestConfig = settings.harvest_config()?;

            let (normalizer, delivery) = components(&settings, &logger)?;
            let scheduler = HarvestScheduler::new(normalizer, delivery, logger.for_component("scheduler"));
            if !scheduler.start(config, Arc::new(print_progress)) {
                println!("Harvest is already running");
                return Ok(());
            }

            tokio::select! {
                _ = scheduler.wait() => {}
                _ = tokio::signal::ctrl_c() => {
                    println!("Stopping after the current step...");
                    scheduler.stop();
                    scheduler.wait().await;
                }
            }
        }
        Commands::TestConnection { url } => {
            let (_, delivery) = components(&settings, &logger)?;
            let url = url.unwrap_or_else(|| settings.endpoint_url.clone());
            if delivery.test_connection(&url).await {
                println!("✅ Endpoint {} is reachable", url);
            } else {
                println!("❌ Endpoint {} is not reachable", url);
            }
        }
        Commands::SendTest { url, count } => {
            let (normalizer, delivery) = components(&settings, &logger)?;
            let url = url.unwrap_or_else(|| settings.endpoint_url.clone());
            if delivery.send_test_file(&normalizer, &url, count).await {
                println!("✅ Test file delivered");
            } else {
                println!("❌ Test file was not delivered");
            }
        }
        Commands::Send { file, url, no_convert } => {
            let (_, delivery) = components(&settings, &logger)?;
            let url = url.unwrap_or_else(|| settings.endpoint_url.clone());
            let outcome = delivery.deliver_detailed(&file, &url, !no_convert).await;
            let mark = if outcome.delivered { "✅" } else { "❌" };
            println!("{} {}", mark, outcome.message);
        }
        Commands::Convert { input, output } => {
            let doc = convert_eve_to_text(&input, output.as_deref(), &settings.sources.batch_dir).await?;
            println!("✅ {} events written to {}", doc.events, doc.path.display());
        }
        Commands::Collect { systems, count } => {
            let (normalizer, _) = components(&settings, &logger)?;
            let systems = match systems {
                Some(raw) => parse_systems(&raw),
                None => parse_systems(&settings.harvest.selected_systems),
            };
            let records = normalizer.collect(&systems, count).await;
            let json = serde_json::to_string_pretty(&records)
                .map_err(|e| AgentError::InternalError(format!("Serialization failed: {}", e)))?;
            println!("{}", json);
        }
        Commands::Service { action, daemon } => {
            let daemon: Daemon = daemon.parse()?;
            let controller = ServiceController::new(
                settings.services.clone(),
                settings.privilege.clone(),
                logger.for_component("services"),
            );
            match action {
                ServiceAction::Install => println!("{}", controller.install(daemon).await),
                ServiceAction::Dependencies => println!("{}", controller.install_dependencies(daemon).await),
                ServiceAction::Configure => println!("{}", controller.configure(daemon).await),
                ServiceAction::Start => println!("{}", controller.start(daemon).await),
                ServiceAction::Stop => println!("{}", controller.stop(daemon).await),
                ServiceAction::Update => println!("{}", controller.update(daemon).await),
                ServiceAction::Status => println!("{:<15} {}", daemon.name().to_uppercase(), controller.status(daemon).await),
            }
        }
        Commands::Scan { path } => {
            let controller = ServiceController::new(
                settings.services.clone(),
                settings.privilege.clone(),
                logger.for_component("services"),
            );
            println!("{}", controller.scan(&path).await);
        }
        Commands::Status => {
            let controller = ServiceController::new(
                settings.services.clone(),
                settings.privilege.clone(),
                logger.for_component("services"),
            );
            println!("{}", controller.status_report().await);
        }
    }

    Ok(())
}
