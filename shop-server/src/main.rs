use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use shop_core::storage::AccessStore;
use shop_core::{BlobStore, DatabaseStorage, LocalBlobStore, NewAdminUser, Storage};
use shop_server::observability::{logging, metrics};
use shop_server::{start_server, AppState, Config};

#[derive(Parser)]
#[command(name = "shop-server")]
#[command(about = "HTTP API server for the shop backend")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Port to run the server on, overriding the config file
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations and exit
    Migrate,
    /// Create a super admin account
    CreateAdmin {
        #[arg(long)]
        login: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables before the config so overrides apply
    dotenv::dotenv().ok();

    let mut config = Config::load(&cli.config)?;
    logging::init_logging(&config.logging);

    let storage = DatabaseStorage::open(&config.database.url, config.database.auth_token.as_deref()).await?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Migrate => {
            info!("Migrations applied to {}", config.database.url);
        }
        Command::CreateAdmin {
            login,
            password,
            full_name,
        } => {
            let input = NewAdminUser {
                login,
                full_name,
                password,
                is_super: true,
            };
            validator::Validate::validate(&input)?;
            let admin = storage.create_admin(input).await?;
            info!("Created super admin '{}' with id {}", admin.login, admin.id);
        }
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            metrics::init();

            let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(&config.media.dir).await?);
            let storage: Arc<dyn Storage> = Arc::new(storage);
            let state = AppState::new(storage, blobs, config);
            if state.reporter.is_enabled() {
                info!("Server errors will be forwarded to the error tracker");
            }

            start_server(state).await?;
        }
    }

    Ok(())
}
