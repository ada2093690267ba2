//! Bazaar CLI - browse the catalog and drive a buyer or seller session.
//!
//! # Usage
//!
//! ```bash
//! # Search products with filters
//! bazaar search phone --min-price 100 --max-price 900 --min-rating 4
//!
//! # Product detail (gallery, stock, reviews)
//! bazaar product 7
//!
//! # Pick a role, create an account, sign in
//! bazaar role buyer
//! bazaar sign-up -e buyer@example.com -p hunter22 -n "Ann"
//! bazaar sign-in -e buyer@example.com -p hunter22
//!
//! # Wishlist (credentials sign in for the duration of the command)
//! bazaar wishlist -e buyer@example.com -p hunter22 add 7
//! bazaar wishlist -e buyer@example.com -p hunter22 list
//! ```
//!
//! # Commands
//!
//! - `search`, `categories`, `product` - Catalog browsing (no Firebase needed)
//! - `role`, `sign-up`, `sign-in`, `sign-out`, `enter`, `account` - Session
//! - `wishlist` - Buyer wishlist

#![cfg_attr(not(test), forbid(unsafe_code))]

use bazaar_client::ClientConfig;
use bazaar_core::{ProductId, Role};
use clap::{Args, Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog by title with optional filters
    Search {
        /// Title query (case-insensitive substring)
        #[arg(default_value = "")]
        query: String,

        /// Minimum price (inclusive)
        #[arg(long, default_value = "")]
        min_price: String,

        /// Maximum price (inclusive)
        #[arg(long, default_value = "")]
        max_price: String,

        /// Minimum rating (0 disables)
        #[arg(long, default_value_t = 0.0)]
        min_rating: f64,

        /// Exact category label
        #[arg(long, default_value = "")]
        category: String,
    },
    /// List catalog categories
    Categories,
    /// Show one product in detail
    Product {
        /// Product ID
        id: ProductId,
    },
    /// Select the role used for the next sign-in or sign-up
    Role {
        /// `buyer` or `seller`
        role: Role,
    },
    /// Create an account for the selected role
    SignUp {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "BAZAAR_PASSWORD", hide_env_values = true)]
        password: String,

        /// Display name
        #[arg(short = 'n', long)]
        user_name: String,
    },
    /// Sign in with the selected role
    SignIn {
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Sign out and forget the selected role
    SignOut,
    /// Resolve where navigating to an area path ends up
    Enter {
        /// Area path (`/buyer/...` or `/seller/...`)
        path: String,

        /// Sign in first with this email
        #[arg(short, long, requires = "password")]
        email: Option<String>,

        /// Password for `--email`
        #[arg(short, long, env = "BAZAAR_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Show the signed-in user's profile
    Account {
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Manage the buyer wishlist
    Wishlist {
        #[command(flatten)]
        credentials: Credentials,

        #[command(subcommand)]
        action: WishlistAction,
    },
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Add a product
    Add {
        /// Product ID
        id: ProductId,
    },
    /// Remove a product
    Remove {
        /// Product ID
        id: ProductId,
    },
    /// List wishlisted products
    List,
}

/// Email and password for commands that act as a signed-in user.
#[derive(Args)]
struct Credentials {
    /// Account email
    #[arg(short, long)]
    email: String,

    /// Account password
    #[arg(short, long, env = "BAZAAR_PASSWORD", hide_env_values = true)]
    password: String,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
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
#[allow(clippy::print_stderr)]
async fn main() {
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar_client=info,bazaar_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli, &config).await {
        e.report();
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> bazaar_client::Result<()> {
    match cli.command {
        Commands::Search {
            query,
            min_price,
            max_price,
            min_rating,
            category,
        } => {
            let filters = bazaar_client::FilterState {
                min_price,
                max_price,
                min_rating,
                category,
            };
            commands::catalog::search(config, &query, &filters).await
        }
        Commands::Categories => commands::catalog::categories(config).await,
        Commands::Product { id } => commands::catalog::product(config, id).await,
        Commands::Role { role } => commands::session::select_role(config, role).await,
        Commands::SignUp {
            email,
            password,
            user_name,
        } => commands::session::sign_up(config, &email, &password, &user_name).await,
        Commands::SignIn { credentials } => {
            commands::session::sign_in(config, &credentials.email, &credentials.password).await
        }
        Commands::SignOut => commands::session::sign_out(config).await,
        Commands::Enter {
            path,
            email,
            password,
        } => {
            let credentials = email.zip(password);
            commands::session::enter(
                config,
                &path,
                credentials.as_ref().map(|(e, p)| (e.as_str(), p.as_str())),
            )
            .await
        }
        Commands::Account { credentials } => {
            commands::session::account(config, &credentials.email, &credentials.password).await
        }
        Commands::Wishlist {
            credentials,
            action,
        } => {
            let mut engine =
                commands::signed_in(config, &credentials.email, &credentials.password).await?;
            match action {
                WishlistAction::Add { id } => commands::wishlist::add(&mut engine, id).await,
                WishlistAction::Remove { id } => commands::wishlist::remove(&mut engine, id).await,
                WishlistAction::List => commands::wishlist::list(&mut engine).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search_filters() {
        let cli = Cli::try_parse_from([
            "bazaar",
            "search",
            "phone",
            "--min-price",
            "20",
            "--category",
            "smartphones",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        let Commands::Search {
            query,
            min_price,
            max_price,
            category,
            ..
        } = cli.command
        else {
            panic!("expected search");
        };
        assert_eq!(query, "phone");
        assert_eq!(min_price, "20");
        assert_eq!(max_price, "");
        assert_eq!(category, "smartphones");
    }

    #[test]
    fn test_parse_role_rejects_unknown() {
        assert!(Cli::try_parse_from(["bazaar", "role", "admin"]).is_err());
        assert!(Cli::try_parse_from(["bazaar", "role", "seller"]).is_ok());
    }

    #[test]
    fn test_parse_wishlist_add() {
        let cli = Cli::try_parse_from([
            "bazaar", "wishlist", "-e", "a@b.c", "-p", "pw", "add", "7",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        let Commands::Wishlist { action, .. } = cli.command else {
            panic!("expected wishlist");
        };
        assert!(matches!(action, WishlistAction::Add { id } if id == ProductId::new(7)));
    }
}
