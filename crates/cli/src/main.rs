//! Shopdesk CLI - Migrations, checkout runs and order inspection.
//!
//! # Usage
//!
//! ```bash
//! # Create the checkout tables
//! shopdesk migrate
//!
//! # Place an order through every checkout step
//! shopdesk checkout --store 1 --user 1 --line 1:99.99:1 \
//!     --name "Maria Silva" --email maria@example.com --address "Rua A, 123" \
//!     --card "4242 4242 4242 4242" --expiry 12/29 --cvc 123
//!
//! # Same, without a database
//! shopdesk checkout --dry-run ...
//!
//! # Inspect placed orders
//! shopdesk orders list --store 1
//! shopdesk orders show 42 --json
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run checkout database migrations
//! - `checkout` - Drive a checkout from the command line
//! - `orders` - List and show placed orders

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use shopdesk_checkout::CheckoutConfig;
use shopdesk_core::{OrderId, StoreId};

mod commands;

#[derive(Parser)]
#[command(name = "shopdesk")]
#[command(author, version, about = "Shopdesk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run checkout database migrations
    Migrate,
    /// Place an order through the checkout flow
    Checkout(commands::checkout::CheckoutArgs),
    /// Inspect placed orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List a store's orders, newest first
    List {
        /// Store ID
        #[arg(long)]
        store: StoreId,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Show one order with its items
    Show {
        /// Order ID
        id: OrderId,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopdesk_cli=info,shopdesk_checkout=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CheckoutConfig::from_env()?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&config).await?,
        Commands::Checkout(args) => commands::checkout::run(&config, args).await?,
        Commands::Orders { action } => match action {
            OrdersAction::List { store, json } => commands::orders::list(&config, store, json).await?,
            OrdersAction::Show { id, json } => commands::orders::show(&config, id, json).await?,
        },
    }
    Ok(())
}
