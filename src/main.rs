use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;
mod config;

use auditdash::App;
use auditdash::api::{JobId, JobStatus, ScanJob};
use auditdash::credentials::FileStore;
use auditdash::poll::PollKind;
use cli::Cli;
use cli::commands::Commands;
use config::Config;

const PASSWORD_ENV: &str = "AUDITDASH_PASSWORD";

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("auditdash")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("auditdash.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
        .target(env_logger::Target::Pipe(target))
        .init();
    if std::env::var_os("RUST_LOG").is_none() {
        log::set_max_level(log::LevelFilter::Info);
    }

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Apply the configured level unless RUST_LOG already decided.
fn apply_log_level(config: &Config) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    if let Some(level) = config.log_level.as_deref() {
        match level.parse::<log::LevelFilter>() {
            Ok(filter) => log::set_max_level(filter),
            Err(_) => log::warn!("Ignoring unknown log level '{}'", level),
        }
    }
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let backend = FileStore::open(&config.credentials.path).context("Failed to open credential store")?;
    let mut app = App::connect(config.app_config(), Arc::new(backend)).context("Failed to build client")?;

    let result = match &cli.command {
        Commands::Login { username, password } => handle_login(&app, username, password.as_deref()).await,
        Commands::Logout => handle_logout(&app),
        Commands::Whoami => handle_whoami(&app).await,
        Commands::Scan { url } => handle_scan(&app, url).await,
        Commands::Jobs => handle_jobs(&app).await,
        Commands::Job { id } => handle_job(&app, id).await,
        Commands::Watch { job } => handle_watch(&mut app, job.as_deref(), cli.is_verbose()).await,
    };

    app.shutdown();
    result
}

async fn handle_login(app: &App, username: &str, password: Option<&str>) -> Result<()> {
    info!("Logging in as {}", username);
    let password = match password {
        Some(p) => p.to_string(),
        None => std::env::var(PASSWORD_ENV)
            .map_err(|_| eyre!("No password given; pass --password or set {}", PASSWORD_ENV))?,
    };

    app.account().login(username, &password).await.context("Login failed")?;
    println!("{} {}", "Logged in as".green(), username.bold());
    Ok(())
}

fn handle_logout(app: &App) -> Result<()> {
    app.account().logout()?;
    println!("{}", "Logged out".green());
    Ok(())
}

async fn handle_whoami(app: &App) -> Result<()> {
    let profile = app.account().profile().await?;
    match profile.email {
        Some(email) => println!("{} <{}>", profile.username.bold(), email),
        None => println!("{}", profile.username.bold()),
    }
    Ok(())
}

async fn handle_scan(app: &App, url: &str) -> Result<()> {
    info!("Submitting scan for {}", url);
    let job = app.scans().submit_scan(url).await?;
    println!("{} {} ({})", "Submitted:".green(), job.id.to_string().bold(), job.url);
    Ok(())
}

async fn handle_jobs(app: &App) -> Result<()> {
    app.navigate("/jobs");
    let jobs = app.scans().list_jobs().await?;
    print_jobs(&jobs);
    Ok(())
}

async fn handle_job(app: &App, id: &str) -> Result<()> {
    let id = JobId::from(id);
    app.navigate(&format!("/jobs/{}", id));
    let job = app.scans().get_job(&id).await?;
    print_job(&job);
    Ok(())
}

async fn handle_watch(app: &mut App, job: Option<&str>, verbose: bool) -> Result<()> {
    let selected = job.map(JobId::from);

    app.navigate("/jobs");
    print_jobs(&app.scans().list_jobs().await?);
    if let Some(id) = &selected {
        app.navigate(&format!("/jobs/{}", id));
        print_job(&app.scans().get_job(id).await?);
    }

    let mut jobs_rx = app.scans().subscribe_jobs();
    let mut detail_rx = app.scans().subscribe_detail();
    let mut busy_rx = app.aggregator().subscribe();

    loop {
        app.reconcile_polling(selected.as_ref());
        if !app.poll().is_active(PollKind::List) && !app.poll().is_active(PollKind::Detail) {
            println!("{}", "No running jobs".green());
            break;
        }

        tokio::select! {
            changed = jobs_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                print_jobs(&jobs_rx.borrow_and_update());
            }
            changed = detail_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(job) = detail_rx.borrow_and_update().as_ref() {
                    print_job(job);
                }
            }
            changed = busy_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if verbose && *busy_rx.borrow_and_update() {
                    println!("{}", "refreshing...".dimmed());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Interrupted".yellow());
                break;
            }
        }
    }

    let stats = app.poll().stats();
    info!(
        "Watch finished: list timers {}/{}, detail timers {}/{}",
        stats.list_started, stats.list_cancelled, stats.detail_started, stats.detail_cancelled
    );
    Ok(())
}

fn colored_status(status: JobStatus) -> ColoredString {
    match status {
        JobStatus::Pending => status.to_string().yellow(),
        JobStatus::Processing => status.to_string().cyan(),
        JobStatus::Completed => status.to_string().green(),
        JobStatus::Failed => status.to_string().red(),
        JobStatus::Unknown => status.to_string().dimmed(),
    }
}

fn print_jobs(jobs: &[ScanJob]) {
    if jobs.is_empty() {
        println!("{}", "No scan jobs".dimmed());
        return;
    }
    for job in jobs {
        println!("{:>8}  {:<12}  {}", job.id.to_string().bold(), colored_status(job.status), job.url);
    }
}

fn print_job(job: &ScanJob) {
    println!("{} {}", "Job".bold(), job.id.to_string().bold());
    println!("  url:     {}", job.url);
    println!("  status:  {}", colored_status(job.status));
    if let Some(created) = job.created_at {
        println!("  created: {}", created.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(error) = &job.error {
        println!("  error:   {}", error.red());
    }
    for result in &job.results {
        let score = result
            .score
            .map(|s| format!("{:.0}", s))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<20} score {:>4}  {} violations  {} passes",
            result.category, score, result.violations, result.passes
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    apply_log_level(&config);

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
