use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use venuedesk::auth::{NewAccount, create_account};
use venuedesk::config::{ServerConfig, ServiceConfig};
use venuedesk::server::{AppState, create_router};
use venuedesk::store::{SqliteStore, Store};
use venuedesk::types::{Role, Tenant};

#[derive(Parser)]
#[command(name = "venuedesk")]
#[command(about = "Multi-tenant venue booking backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8787")]
        port: u16,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Create the database and the default admin for a tenant
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Tenant (project) identifier
        #[arg(long)]
        tenant: String,

        /// Username for the default admin
        #[arg(long, default_value = "admin")]
        username: String,

        /// Password for the default admin
        #[arg(long)]
        password: String,
    },
}

fn open_store(data_dir: PathBuf) -> anyhow::Result<(ServerConfig, SqliteStore)> {
    let config = ServerConfig {
        data_dir,
        ..ServerConfig::default()
    };
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    Ok((config, store))
}

fn run_init(data_dir: String, tenant: String, username: String, password: String) -> anyhow::Result<()> {
    let tenant = Tenant::new(tenant).context("Tenant identifier cannot be blank")?;
    if username.trim().is_empty() || password.is_empty() {
        bail!("Username and password are required");
    }

    let (config, store) = open_store(data_dir.into())?;

    if store.has_default_admin(&tenant)? {
        bail!("Tenant '{tenant}' already has a default admin");
    }

    let admin = create_account(
        &store,
        &ServiceConfig::default(),
        &tenant,
        NewAccount {
            username: &username,
            password: &password,
            role: Role::Admin,
            first_name: "Default",
            last_name: "Admin",
            phone: "",
            email: "",
            is_default_admin: true,
        },
    )?;

    println!();
    println!("========================================");
    println!("Created default admin '{}' ({}) for tenant '{tenant}'", admin.username, admin.id);
    println!("Database: {}", config.db_path().display());
    println!("========================================");
    println!();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("venuedesk=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                tenant,
                username,
                password,
            } => {
                run_init(data_dir, tenant, username, password)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let (mut config, store) = open_store(data_dir.into())?;
            config.host = host;
            config.port = port;

            info!("Using database at {}", config.db_path().display());

            let state = Arc::new(AppState::new(Arc::new(store), ServiceConfig::default()));
            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
