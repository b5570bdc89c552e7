use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use engine::{Confirmation, ControlAction, DashboardPage, FixedConfirmation, GateOutcome};
use events::{DashboardEvent, Section};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

mod render;

/// The main entry point for the grid bot console.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; settings also come from gridpilot.toml
    // and the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let settings = configuration::load_settings(cli.config.as_deref()).context("Failed to load settings")?;
    let _log_guard = configuration::init_tracing(&settings.logging).context("Failed to initialise logging")?;

    let spinner = ProgressBar::new_spinner();
    let confirmation: Arc<dyn Confirmation> = match &cli.command {
        Commands::Liquidate { yes: true } => Arc::new(FixedConfirmation(true)),
        _ => Arc::new(StdinConfirmation {
            spinner: spinner.clone(),
        }),
    };
    let mut page = DashboardPage::connect(&settings, confirmation).context("Failed to build the API client")?;

    // Execute the appropriate command
    match cli.command {
        Commands::Watch => handle_watch(page).await,
        Commands::Overview => handle_overview(&mut page).await,
        Commands::Start => handle_control(&mut page, ControlAction::Start, spinner).await,
        Commands::Stop => handle_control(&mut page, ControlAction::Stop, spinner).await,
        Commands::Liquidate { .. } => handle_control(&mut page, ControlAction::Liquidate, spinner).await,
        Commands::Config(ConfigCommand::Show) => handle_config_show(&mut page).await,
        Commands::Config(ConfigCommand::Set(args)) => handle_config_set(&mut page, args, spinner).await,
        Commands::Orders => handle_orders(&mut page).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Live view and controls for the grid trading bot.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file. Defaults to ./gridpilot.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the live dashboard until Ctrl-C.
    Watch,
    /// Load portfolio, bot status, grid config and recent orders once.
    Overview,
    /// Start the bot.
    Start,
    /// Stop the bot.
    Stop,
    /// Sell every holding at market price.
    Liquidate {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Show or edit the grid configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Show recent fills.
    Orders,
}

#[derive(Subcommand)]
enum ConfigCommand {
    Show,
    /// Stage edits over the current grid and save them.
    Set(GridArgs),
}

/// Values are taken as typed and validated before anything is sent.
#[derive(Parser)]
struct GridArgs {
    /// Target coin, e.g. BTC or KRW-BTC.
    #[arg(long)]
    coin: Option<String>,

    #[arg(long)]
    lower: Option<String>,

    #[arg(long)]
    upper: Option<String>,

    /// Order size in KRW.
    #[arg(long)]
    order_krw: Option<String>,

    /// Share of the holding sold per grid step, 0 to 100.
    #[arg(long)]
    sell_pct: Option<String>,

    /// Seconds between orders, at least 1.
    #[arg(long)]
    cooldown: Option<String>,
}

// ==============================================================================
// Confirmation
// ==============================================================================

/// Asks on stdin, hiding the spinner while the operator answers.
struct StdinConfirmation {
    spinner: ProgressBar,
}

#[async_trait]
impl Confirmation for StdinConfirmation {
    async fn confirm(&self, prompt: &str) -> bool {
        let spinner = self.spinner.clone();
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            spinner.suspend(|| {
                print!("{prompt} [y/N] ");
                std::io::stdout().flush().ok();
                let mut line = String::new();
                std::io::stdin().lock().read_line(&mut line).map(|_| line)
            })
        })
        .await;

        match answer {
            Ok(Ok(line)) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
            Ok(Err(e)) => {
                warn!(error = %e, "Could not read confirmation");
                false
            }
            Err(e) => {
                warn!(error = %e, "Confirmation task failed");
                false
            }
        }
    }
}

fn start_spinner(spinner: &ProgressBar, message: String) {
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
}

fn print_banners(page: &DashboardPage) {
    let banners = page.surface().banners();
    if !banners.is_empty() {
        println!("{}", render::banners(&banners));
    }
}

fn print_section_banner(page: &DashboardPage, section: Section) {
    if let Some(banner) = page.surface().banner(section) {
        println!("{}", render::banner_line(&banner));
    }
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_watch(mut page: DashboardPage) -> anyhow::Result<()> {
    let mut frames = page.subscribe_frames();
    let mut events = page.subscribe_events();

    for failure in page.mount().await {
        debug!(error = %failure, "Section unavailable at mount");
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Ctrl-C received, shutting down");
                break;
            }
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = frames.borrow_and_update().clone();
                if let Some(frame) = frame {
                    println!("{}\n", render::frame(&frame));
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    match event.to_json() {
                        Ok(json) => debug!(event = %json, "Dashboard event"),
                        Err(e) => warn!(error = %e, "Could not encode dashboard event"),
                    }
                    if let DashboardEvent::BannerRaised(banner) = &event {
                        // The snapshot banner is already part of every failed frame.
                        if banner.section != Section::Snapshot {
                            println!("{}", render::banner_line(banner));
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Dashboard events dropped"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    page.unmount().await;
    Ok(())
}

async fn handle_overview(page: &mut DashboardPage) -> anyhow::Result<()> {
    page.load_all().await;

    if let Some(summary) = page.portfolio() {
        println!("{}\n", render::portfolio(summary));
    }
    if let Some(status) = page.status() {
        println!("{}\n", render::status(status));
    }
    println!("{}\n", render::grid(&page.config_form().current_grid()));
    println!("{}", render::orders(page.orders()));
    print_banners(page);
    Ok(())
}

async fn handle_control(page: &mut DashboardPage, action: ControlAction, spinner: ProgressBar) -> anyhow::Result<()> {
    // The run state decides which controls are enabled.
    page.load_all().await;

    start_spinner(&spinner, format!("{}...", action.label()));
    let outcome = page.control(action).await;
    spinner.finish_and_clear();

    match outcome {
        GateOutcome::Completed(status) => {
            print_section_banner(page, Section::Control);
            if let Some(status) = status {
                println!("{}", render::status(&status));
            }
            Ok(())
        }
        GateOutcome::Declined => {
            println!("Liquidation cancelled.");
            Ok(())
        }
        GateOutcome::Disabled => {
            let state = if page.running() { "running" } else { "stopped" };
            bail!("{action} is not available while the bot is {state}")
        }
        GateOutcome::Ignored => bail!("Another control action is in progress"),
        GateOutcome::Failed(err) => {
            print_section_banner(page, Section::Control);
            Err(err.into())
        }
    }
}

async fn handle_config_show(page: &mut DashboardPage) -> anyhow::Result<()> {
    page.load_all().await;
    println!("{}", render::grid(&page.config_form().current_grid()));

    if let Some(config) = page.config_form().last_good() {
        if !config.extra.is_empty() {
            println!("\nOther sections (kept as-is on save):");
            println!("{}", serde_json::to_string_pretty(&config.extra)?);
        }
    }
    print_section_banner(page, Section::Config);
    Ok(())
}

async fn handle_config_set(page: &mut DashboardPage, args: GridArgs, spinner: ProgressBar) -> anyhow::Result<()> {
    page.load_all().await;
    if page.config_form().last_good().is_none() {
        print_section_banner(page, Section::Config);
    }

    let form = page.config_form_mut().form_mut();
    if let Some(coin) = args.coin {
        form.target_coin = coin;
    }
    if let Some(lower) = args.lower {
        form.lower_bound = lower;
    }
    if let Some(upper) = args.upper {
        form.upper_bound = upper;
    }
    if let Some(order_krw) = args.order_krw {
        form.order_krw = order_krw;
    }
    if let Some(sell_pct) = args.sell_pct {
        form.sell_pct = sell_pct;
    }
    if let Some(cooldown) = args.cooldown {
        form.cooldown_seconds = cooldown;
    }

    start_spinner(&spinner, "Saving grid configuration...".to_string());
    let result = page.save_config().await;
    spinner.finish_and_clear();

    print_section_banner(page, Section::Config);
    match result {
        Ok(_) => {
            println!("{}", render::grid(&page.config_form().current_grid()));
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn handle_orders(page: &mut DashboardPage) -> anyhow::Result<()> {
    page.load_all().await;
    println!("{}", render::orders(page.orders()));
    print_section_banner(page, Section::Orders);
    Ok(())
}
