//! Cellshop CLI - Storefront and admin operations from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog with facets
//! cellshop products ram="8GB - 12GB" storage=256GB --page 2
//!
//! # Work with the cart and wishlist (works signed out)
//! cellshop cart add iphone-15 iphone-15-black-256 --name "iPhone 15" --price 22990000
//! cellshop wishlist add iphone-15
//!
//! # Sign in; anything saved on this device is merged into the account
//! CELLSHOP_PASSWORD=... cellshop login an@shop.vn
//!
//! # Cancel an order
//! cellshop orders cancel 65f0c2 --reason no_longer_needed
//!
//! # Admin (needs CELLSHOP_ADMIN_TOKEN)
//! cellshop admin set-status 65f0c2 shipping
//! cellshop admin revenue
//! ```
//!
//! # Commands
//!
//! - `products` / `product` - Catalog listing and detail
//! - `cart` / `wishlist` - Local-first cart and wishlist
//! - `login` / `logout` - Account session
//! - `orders` - Order history and cancellation
//! - `checkout` - Totals with coupon and payment method
//! - `admin` - Catalog management, order review and analytics

#![cfg_attr(not(test), forbid(unsafe_code))]

use cellshop_storefront::StorefrontConfig;
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "cellshop")]
#[command(author, version, about = "Cellshop storefront and admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Shop(ShopCommand),
    /// Admin dashboard operations
    Admin {
        #[command(subcommand)]
        action: commands::admin::AdminAction,
    },
}

/// Buyer-side commands; these open a session in the state directory.
#[derive(Subcommand)]
enum ShopCommand {
    /// List products, filtered by `key=value` facets
    Products {
        /// Facets such as `storage=256GB` or `brand=apple`
        facets: Vec<String>,

        /// Page to show (1-based)
        #[arg(short, long)]
        page: Option<u32>,
    },
    /// Show one product by slug
    Product { slug: String },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: commands::cart::CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: commands::wishlist::WishlistAction,
    },
    /// Sign in and merge this device's cart and wishlist
    Login {
        email: String,

        /// Account password
        #[arg(long, env = "CELLSHOP_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget this device's cart and wishlist
    Logout,
    /// Order history and cancellation
    Orders {
        #[command(subcommand)]
        action: commands::orders::OrdersAction,
    },
    /// Show checkout totals
    Checkout {
        /// Coupon code to apply
        #[arg(short, long)]
        coupon: Option<String>,

        /// Payment method (`cod`, `bank_transfer`, `vnpay`, `momo`)
        #[arg(short = 'm', long, default_value = "cod")]
        payment: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Failed to load configuration: {e}");
            }
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cellshop_storefront=info,cellshop_admin=info,cellshop_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, &config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Admin { action } => commands::admin::run(action).await?,
        Commands::Shop(command) => {
            let session = cellshop_storefront::Session::from_config(config).await?;
            match command {
                ShopCommand::Products { facets, page } => {
                    commands::catalog::list(&session, &facets, page).await?;
                }
                ShopCommand::Product { slug } => commands::catalog::show(&session, &slug).await?,
                ShopCommand::Cart { action } => commands::cart::run(&session, action).await?,
                ShopCommand::Wishlist { action } => {
                    commands::wishlist::run(&session, action).await?;
                }
                ShopCommand::Login { email, password } => {
                    commands::account::login(&session, &email, password).await?;
                }
                ShopCommand::Logout => commands::account::logout(&session)?,
                ShopCommand::Orders { action } => commands::orders::run(&session, action).await?,
                ShopCommand::Checkout { coupon, payment } => {
                    commands::checkout::run(&session, coupon.as_deref(), &payment).await?;
                }
            }
        }
    }
    Ok(())
}
