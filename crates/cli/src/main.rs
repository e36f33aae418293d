//! Customer Desk CLI - manage customers from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password is read from stdin)
//! cdesk login -u admin
//!
//! # Interactive dashboard
//! cdesk dashboard
//!
//! # One-shot listing, sorted and filtered
//! cdesk customers list --sort credit_limit --desc --filter kandy
//!
//! # Open a page by path
//! cdesk open /addcustomer
//! ```
//!
//! # Commands
//!
//! - `login` / `logout` / `profile` - Session management
//! - `dashboard` - Interactive customer table
//! - `customers list|add|edit|delete` - One-shot customer operations
//! - `open <path>` - Open the page at a route path
//!
//! # Environment Variables
//!
//! - `CUSTOMER_DESK_API_BASE_URL` - Customer API base URL
//! - `CUSTOMER_DESK_SESSION_FILE` - Session file location
//! - `CUSTOMER_DESK_THEME` - Table theme (`plain` or `compact`)
//! - `CUSTOMER_DESK_LOG_FORMAT` - `json` for structured logs
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::Write;

use clap::{Parser, Subcommand};
use customer_desk_client::{ClientConfig, Route};
use customer_desk_core::{CustomerId, SortKey};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod prompt;
mod render;

use commands::customers::CustomerArgs;
use commands::{CliError, Context};
use render::Theme;

#[derive(Parser)]
#[command(name = "cdesk")]
#[command(author, version, about = "Customer Desk - manage customers from the terminal")]
struct Cli {
    /// Customer API base URL (overrides `CUSTOMER_DESK_API_BASE_URL`)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Table theme
    #[arg(long, global = true, value_enum, env = "CUSTOMER_DESK_THEME", default_value_t = Theme::Plain)]
    theme: Theme,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        /// Username
        #[arg(short, long)]
        username: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Profile,
    /// Interactive customer dashboard
    Dashboard,
    /// One-shot customer operations
    Customers {
        #[command(subcommand)]
        action: CustomerAction,
    },
    /// Open the page at a route path (`/login`, `/profile`, `/dashboard`, `/addcustomer`)
    Open {
        path: String,
    },
}

#[derive(Subcommand)]
enum CustomerAction {
    /// Print the customer table
    List {
        /// Column to sort by (e.g. `name`, `city`, `credit_limit`)
        #[arg(short, long)]
        sort: Option<SortKey>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,

        /// Only show customers matching this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Add a customer
    Add {
        #[command(flatten)]
        fields: CustomerArgs,
    },
    /// Edit a customer
    Edit {
        id: CustomerId,

        #[command(flatten)]
        fields: CustomerArgs,
    },
    /// Delete a customer
    Delete {
        id: CustomerId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: std::env::var("SENTRY_ENVIRONMENT")
                .ok()
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

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "customer_desk_cli=info,customer_desk_client=info".into());

    // Logs go to stderr; stdout carries command output
    let is_json = std::env::var("CUSTOMER_DESK_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let json_layer = is_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!is_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env before Sentry reads its DSN (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry();
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        let _ = writeln!(std::io::stderr().lock(), "error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    let ctx = Context::new(&config, cli.theme)?;

    match cli.command {
        Commands::Login { username } => commands::auth::login(&ctx, &username).await,
        Commands::Logout => commands::auth::logout(&ctx),
        Commands::Profile => commands::auth::profile(&ctx).await,
        Commands::Dashboard => commands::dashboard::run(&ctx).await,
        Commands::Customers { action } => match action {
            CustomerAction::List { sort, desc, filter } => {
                commands::customers::list(&ctx, sort, desc, filter.as_deref()).await
            }
            CustomerAction::Add { fields } => commands::customers::add(&ctx, &fields).await,
            CustomerAction::Edit { id, fields } => {
                commands::customers::edit(&ctx, id, &fields).await
            }
            CustomerAction::Delete { id, yes } => commands::customers::delete(&ctx, id, yes).await,
        },
        Commands::Open { path } => open(&ctx, &path).await,
    }
}

/// Resolve `path` through the router and show the resulting page.
async fn open(ctx: &Context, path: &str) -> Result<(), CliError> {
    match Route::from_path(path).guard(&ctx.session) {
        Route::Login => {
            writeln!(std::io::stdout().lock(), "Log in with `cdesk login -u <username>`.")?;
            Ok(())
        }
        Route::Profile => commands::auth::profile(ctx).await,
        Route::Dashboard => commands::dashboard::run(ctx).await,
        Route::AddCustomer => commands::customers::add_interactive(ctx).await,
    }
}
