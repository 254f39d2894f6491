use std::io::BufRead;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

use deckmaster::events::{NoticeLevel, SessionEvent};
use deckmaster::models::admin::format_time_remaining;
use deckmaster::models::generation::GenerationRequest;
use deckmaster::models::plan::PlanId;
use deckmaster::services::quota::PlanSwitch;
use deckmaster::{Config, DeckClient};

#[derive(Parser)]
#[command(name = "deckmaster", version, about = "DeckMaster presentation client")]
struct Cli {
    /// Base URL of the DeckMaster API.
    #[arg(long, env = "DECKMASTER_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current plan and usage.
    Status,
    /// List the available plans.
    Plans,
    /// List the available design styles.
    Designs,
    /// Move to another plan.
    SwitchPlan {
        /// free, elite, pro or premium.
        plan: PlanId,
    },
    /// Manage the admin session.
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Generate a presentation.
    Generate {
        /// Topic or instructions (10 to 500 characters).
        #[arg(long)]
        task: String,
        /// Optional page to extract content from.
        #[arg(long, default_value = "")]
        url: String,
        #[arg(long, default_value = GenerationRequest::DEFAULT_DESIGN_STYLE)]
        design: String,
        #[arg(long, default_value_t = GenerationRequest::DEFAULT_SLIDE_COUNT)]
        slides: u32,
        #[arg(long)]
        graphs: bool,
        #[arg(long)]
        tables: bool,
        #[arg(long)]
        pie_charts: bool,
        #[arg(long)]
        images: bool,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Activate admin mode; the password is read from stdin.
    Activate {
        /// Keep the session running in the foreground until it expires.
        #[arg(long)]
        watch: bool,
    },
    Deactivate,
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    tracing::info!("✅ Configuration loaded successfully");

    let client = DeckClient::connect(&config)
        .await
        .context("Failed to initialize DeckMaster client")?;

    let renderer = tokio::spawn(render_events(client.subscribe()));

    client.bootstrap().await;

    let outcome = run(&client, cli.command).await;

    renderer.abort();

    if let Err(e) = outcome {
        let (_, message) = e.report();
        eprintln!("❌ {}", message);
        if e.suggests_retry() {
            eprintln!("   Please try again in a moment.");
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(client: &DeckClient, command: Command) -> deckmaster::Result<()> {
    match command {
        Command::Status => print_status(client).await,
        Command::Plans => {
            let current = client.quota().user().await.plan;
            for plan in client.quota().load_plan_catalog().await.plans() {
                let marker = if plan.id == current { "*" } else { " " };
                let limits = match plan.total_limit {
                    Some(total) => format!("{} lifetime", total),
                    None => format!("{}/day", plan.daily_limit.unwrap_or_default()),
                };
                println!(
                    "{} {:<8} {:<10} ${:>5.2}/mo  {:<12} max {} slides{}",
                    marker,
                    plan.id,
                    plan.name,
                    plan.price_monthly,
                    limits,
                    plan.max_slides,
                    if plan.visual_elements_allowed { ", visuals" } else { "" }
                );
            }
        }
        Command::Designs => {
            for design in client.designs().await {
                println!("{:<14} {}", design.id, design.name);
            }
        }
        Command::SwitchPlan { plan } => match client.quota().switch_plan(plan).await? {
            PlanSwitch::AlreadyUnlocked => println!("👑 Admin mode already unlocks every plan"),
            PlanSwitch::Unchanged => println!("Already on the {} plan", plan),
            PlanSwitch::Switched(user) => println!("✅ Now on the {} plan", user.plan),
        },
        Command::Admin { action } => match action {
            AdminAction::Activate { watch } => {
                let password = read_password()?;
                let session = client.admin().activate(&password).await?;
                println!(
                    "👑 Admin mode active ({} remaining)",
                    format_time_remaining(session.seconds_remaining())
                );
                if watch {
                    while client.admin().is_active().await {
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    }
                }
            }
            AdminAction::Deactivate => client.admin().deactivate().await?,
            AdminAction::Status => {
                let session = client.admin().session().await;
                if session.is_active() {
                    println!(
                        "👑 Admin mode active ({} remaining)",
                        format_time_remaining(session.seconds_remaining())
                    );
                } else {
                    println!("Admin mode inactive");
                }
            }
        },
        Command::Generate {
            task,
            url,
            design,
            slides,
            graphs,
            tables,
            pie_charts,
            images,
        } => {
            let request = GenerationRequest {
                task,
                url,
                design_style: design,
                slide_count: slides,
                graphs,
                tables,
                pie_charts,
                images,
            };
            let deck = client.generate(request).await?;
            println!(
                "✅ {} ready",
                deck.filename.as_deref().unwrap_or("Presentation")
            );
            if let Some(url) = &deck.download_url {
                println!("   Download: {}", url);
            }
            print_status(client).await;
        }
    }

    Ok(())
}

async fn print_status(client: &DeckClient) {
    let usage = client.quota().usage().await;
    let user = client.quota().user().await;

    println!("User:   {}", user.id);
    println!("Plan:   {}", usage.plan.name);
    if usage.admin {
        println!("Usage:  unlimited (admin)");
        return;
    }

    match usage.total_limit {
        Some(total) => println!(
            "Usage:  {}/{} lifetime ({}%)",
            usage.total_usage, total, usage.usage_percent
        ),
        None => println!(
            "Usage:  {}/{} today ({}%)",
            usage.daily_usage,
            usage.daily_limit.unwrap_or_default(),
            usage.usage_percent
        ),
    }
}

fn read_password() -> deckmaster::Result<Zeroizing<String>> {
    eprint!("Admin password: ");
    let mut line = Zeroizing::new(String::new());
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| deckmaster::AppError::Storage(format!("Failed to read password: {}", e)))?;
    Ok(Zeroizing::new(line.trim_end_matches(['\r', '\n']).to_string()))
}

async fn render_events(mut events: tokio::sync::broadcast::Receiver<SessionEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Event renderer skipped {} events", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match event {
            SessionEvent::Notice { level, message } => {
                let icon = match level {
                    NoticeLevel::Info => "ℹ️ ",
                    NoticeLevel::Success => "✅",
                    NoticeLevel::Warning => "⚠️ ",
                    NoticeLevel::Error => "❌",
                };
                eprintln!("{} {}", icon, message);
            }
            SessionEvent::Degraded { reason } => {
                eprintln!("⚠️  Working offline: {}", reason);
            }
            SessionEvent::GenerationStarted {
                slide_count,
                design_style,
                ..
            } => {
                eprintln!(
                    "⚙️  Generating {} slides with {} design...",
                    slide_count, design_style
                );
            }
            SessionEvent::GenerationProgress { message, percent } => {
                eprintln!("{} ({}%)", message, percent);
            }
            SessionEvent::AdminTick { seconds_remaining } if seconds_remaining % 60 == 0 => {
                eprintln!("👑 {} left", format_time_remaining(seconds_remaining));
            }
            SessionEvent::AdminExpired => eprintln!("⏰ Admin session expired"),
            _ => {}
        }
    }
}
