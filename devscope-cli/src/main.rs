mod app;
mod command;
mod dashboard;
mod dbquery;
mod docker;
mod effects;
mod probes;
mod proc_ctl;
mod ui;
mod views;

use std::io;
use std::time::SystemTime;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::EnvFilter;

use devscope_core::config::DevscopeConfig;
use devscope_core::model::format_uptime;
use devscope_core::reconcile::{reconcile, ReconcileOptions};
use devscope_core::registry::Registry;

use app::App;
use docker::ContainerCtl;
use probes::Scanner;

#[derive(Parser)]
#[command(name = "devscope")]
#[command(about = "Dashboard for your local development environment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive dashboard (default)
    Tui,
    /// Run one discovery cycle and print the registry
    Scan {
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(interactive: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("devscope=info"));

    // The TUI owns the terminal, so interactive runs only log when a file
    // target is given.
    if let Ok(path) = std::env::var("DEVSCOPE_LOG") {
        if let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open(&path) {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .init();
        }
        return;
    }

    if !interactive {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}

fn load_config() -> anyhow::Result<DevscopeConfig> {
    let cwd = std::env::current_dir().context("resolve working directory")?;
    match DevscopeConfig::discover(&cwd).context("load devscope config")? {
        Some((path, config)) => {
            tracing::info!(path = %path.display(), "loaded config");
            Ok(config)
        }
        None => Ok(DevscopeConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Scan { json }) => {
            init_tracing(false);
            let config = load_config()?;
            run_scan(config, json).await
        }
        Some(Commands::Tui) | None => {
            init_tracing(true);
            let config = load_config()?;
            run_tui(config).await
        }
    }
}

async fn run_scan(config: DevscopeConfig, json: bool) -> anyhow::Result<()> {
    let docker = match ContainerCtl::connect().await {
        Ok(ctl) => Some(ctl),
        Err(e) => {
            tracing::warn!(error = %e, "container runtime unavailable");
            None
        }
    };

    let scanner = Scanner::new(&config, docker);
    let outcome = scanner.scan().await;
    let now = SystemTime::now();

    let mut registry = Registry::new();
    reconcile(
        &mut registry,
        &outcome,
        now,
        ReconcileOptions {
            correlate_ports: config.correlate_ports,
        },
    );

    if json {
        let services: Vec<serde_json::Value> = registry
            .sorted()
            .iter()
            .map(|s| {
                serde_json::json!({
                    "id": s.id,
                    "name": s.name,
                    "kind": s.kind.label(),
                    "status": s.status.label(),
                    "port": s.port,
                    "pid": s.pid,
                    "container_id": s.container_id,
                    "image": s.image,
                    "db": s.db.map(|d| d.label()),
                    "project": s.project,
                    "uptime_secs": s.uptime(now).as_secs(),
                })
            })
            .collect();
        let warnings: Vec<serde_json::Value> = outcome
            .warnings
            .iter()
            .map(|w| serde_json::json!({ "probe": w.source.label(), "message": w.message }))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "services": services,
                "warnings": warnings,
            }))?
        );
        return Ok(());
    }

    for w in &outcome.warnings {
        eprintln!("warning: {} probe: {}", w.source.label(), w.message);
    }
    println!(
        "{:<6} {:<40} {:<10} {:<8} {:<10}",
        "STATUS", "NAME", "TYPE", "PORT", "UPTIME"
    );
    for s in registry.sorted() {
        println!(
            "{:<6} {:<40} {:<10} {:<8} {:<10}",
            s.status.label(),
            s.name,
            s.kind.label(),
            s.port.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            format_uptime(s.uptime(now)),
        );
    }
    Ok(())
}

async fn run_tui(config: DevscopeConfig) -> anyhow::Result<()> {
    let docker = match ContainerCtl::connect().await {
        Ok(ctl) => Some(ctl),
        Err(e) => {
            tracing::warn!(error = %e, "container runtime unavailable, scanning without it");
            None
        }
    };

    let scanner = Scanner::new(&config, docker.clone());
    let mut app = App::new(config, scanner, docker);

    let mut terminal = setup_terminal().context("initialize terminal")?;
    let result = app.run(&mut terminal).await;
    restore_terminal(terminal).context("restore terminal")?;

    result.context("run dashboard")?;
    Ok(())
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
