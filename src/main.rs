use anyhow::Context;
use clap::Parser;
use sec_digest::adapters::MySqlRepository;
use sec_digest::config::cli::{Args, Command};
use sec_digest::utils::error::{DigestError, ErrorSeverity};
use sec_digest::utils::{logger, monitor::SystemMonitor, validation::Validate};
use sec_digest::{build_scheduler, server, AppConfig, AppState, Services};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let verbose = args.verbose || config.logging.verbose;
    logger::init_logger(args.json_logs || config.logging.json, verbose);

    tracing::info!("Starting sec-digest");

    if let Command::Serve { host, port, .. } = args.command() {
        if let Some(host) = host {
            config.server.host = host;
        }
        if let Some(port) = port {
            config.server.port = port;
        }
    }

    if let Err(e) = config.validate() {
        exit_with(&e);
    }

    let monitor = Arc::new(SystemMonitor::new(args.monitor));
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    match args.command() {
        Command::Serve { no_scheduler, .. } => serve(config, monitor, no_scheduler).await,
        Command::Migrate { file } => migrate(&config, &file).await,
        Command::RunJob { name } => run_job(config, monitor, &name).await,
        Command::ListJobs => list_jobs(config, monitor).await,
    }
}

/// 依錯誤嚴重程度決定退出碼
fn exit_with(e: &DigestError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

async fn connect(config: &AppConfig) -> Services {
    match Services::connect(config).await {
        Ok(services) => services,
        Err(e) => exit_with(&e),
    }
}

async fn serve(config: AppConfig, monitor: Arc<SystemMonitor>, no_scheduler: bool) -> anyhow::Result<()> {
    let services = connect(&config).await;
    let scheduler = build_scheduler(&config, &services, monitor);
    let shutdown = CancellationToken::new();

    let handles = if no_scheduler {
        tracing::info!("⏸️ Scheduler disabled");
        Vec::new()
    } else {
        for job in scheduler.jobs() {
            tracing::info!("🗓️ {} - {}", job.name, job.schedule);
        }
        scheduler.start(shutdown.clone())
    };

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("🛑 Shutdown signal received");
        }
        signal.cancel();
    });

    let listener = server::bind(&config.server).await?;
    let state = AppState::new(services, scheduler, Arc::new(config));
    server::serve(listener, state, shutdown.clone()).await?;

    shutdown.cancel();
    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}

async fn migrate(config: &AppConfig, file: &str) -> anyhow::Result<()> {
    let path = Path::new(file);
    if !path.exists() {
        anyhow::bail!("Migration file not found: {}", file);
    }
    let repository = MySqlRepository::connect(config.database_url()?, &config.database).await?;
    let count = repository.run_migrations(path).await?;
    tracing::info!("✅ Applied {} migration statements", count);
    println!("✅ Applied {} migration statements from {}", count, file);
    Ok(())
}

async fn run_job(config: AppConfig, monitor: Arc<SystemMonitor>, name: &str) -> anyhow::Result<()> {
    let services = connect(&config).await;
    let scheduler = build_scheduler(&config, &services, monitor);

    match scheduler.run_now(name).await {
        Ok(report) => {
            tracing::info!(
                "✅ Job '{}' completed: {} stored, {} skipped, {} failed",
                name,
                report.stored,
                report.skipped,
                report.failed
            );
            println!(
                "✅ {}: {} stored, {} skipped, {} failed",
                name, report.stored, report.skipped, report.failed
            );
            Ok(())
        }
        Err(e) => exit_with(&e),
    }
}

async fn list_jobs(config: AppConfig, monitor: Arc<SystemMonitor>) -> anyhow::Result<()> {
    let repository = MySqlRepository::connect_lazy(config.database_url()?, &config.database)?;
    let services = Services::with_repository(&config, Arc::new(repository))?;
    let scheduler = build_scheduler(&config, &services, monitor);
    for job in scheduler.jobs() {
        println!("{:<22} {}", job.name, job.schedule);
    }
    Ok(())
}
