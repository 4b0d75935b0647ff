// vbox command-line entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout is for command output)
// 2. Load config
// 3. Open database, build credential store and marketplace client
// 4. Run the requested command

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info};

use vbox_api::MarketplaceClient;
use vbox_app::QuotePoller;
use vbox_core::{config, CredentialStore, Database};

#[derive(Debug, Parser)]
#[command(name = "vbox", version, about = "Marketplace client and quotation watcher")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Watch quotation statuses and print every change (default).
    Watch,
    /// Store a bearer token for authenticated calls.
    Token { value: String },
    /// Forget the stored token.
    Logout,
    /// List your quotations.
    Quotations {
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// List the payment-term master data.
    PaymentTerms,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize tracing
    init_tracing()?;
    info!("vbox starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: primary={}, fallback={}, poll every {}s",
        config.api.primary_url, config.api.fallback_url, config.poller.interval_secs
    );

    // 3. Open database and build the client
    let db = Arc::new(Database::open(&config.db_path).context("failed to open database")?);
    info!("Database opened at {}", config.db_path);

    let credentials = CredentialStore::new(db.clone());
    let client = Arc::new(MarketplaceClient::from_config(&config, credentials.clone()));

    // 4. Run the command
    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => watch(client, db, &config).await?,
        Command::Token { value } => {
            credentials.set(&value);
            if credentials.is_authenticated() {
                println!("Token stored.");
            } else {
                anyhow::bail!("token was not stored (blank or storage unavailable)");
            }
        }
        Command::Logout => {
            client.logout();
            println!("Logged out.");
        }
        Command::Quotations { limit, offset } => {
            let page = client.fetch_quotations(limit, offset).await?;
            for quotation in &page.quotations {
                println!(
                    "{:<16} {:<20} {} {}",
                    quotation.quotation_number,
                    quotation.status.label(),
                    quotation.commodity_name,
                    quotation.variety_name
                );
            }
            println!("{} of {} quotations", page.quotations.len(), page.total);
        }
        Command::PaymentTerms => {
            for term in client.fetch_payment_terms().await? {
                match &term.description {
                    Some(description) => println!("{:>4}  {} ({description})", term.id, term.name),
                    None => println!("{:>4}  {}", term.id, term.name),
                }
            }
        }
    }

    info!("vbox shut down cleanly");
    Ok(())
}

/// Arm the poller and print notifications until Ctrl+C.
async fn watch(
    client: Arc<MarketplaceClient>,
    db: Arc<Database>,
    config: &config::Config,
) -> anyhow::Result<()> {
    if !client.credentials().is_authenticated() {
        anyhow::bail!("not logged in; store a token with `vbox token <value>` first");
    }

    let (events_tx, mut events_rx) = mpsc::channel(64);
    let poller = Arc::new(QuotePoller::new(client, db, events_tx, &config.poller));
    poller.arm();
    println!(
        "Watching quotations every {}s. Press Ctrl+C to stop.",
        config.poller.interval_secs
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, stopping watcher");
                break;
            }
            change = events_rx.recv() => match change {
                Some(change) => {
                    println!("{}", change.title());
                    println!("  {}", change.description());
                    println!("  View: {}", change.link());
                }
                None => {
                    error!("notification channel closed unexpectedly");
                    break;
                }
            },
        }
    }

    poller.disarm();
    Ok(())
}

/// Initialize tracing to log to a file, keeping stdout for command output.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("vbox.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("vbox_app=info,vbox_api=info,vbox_core=info,warn")
            }),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
