//! `bugtrackerd`: the bug tracker server binary.
//!
//! Usage:
//!   bugtrackerd [--db <connection-string>] [--listen <addr>] [--port <port>]
//!
//! Every flag can also come from the environment (`BUGTRACKER_DB`,
//! `BUGTRACKER_DATA_DIR`, `BUGTRACKER_LISTEN`, `PORT`).

mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use bugtracker_core::{Module, ServiceConfig};
use tracing::info;

/// Bug tracker server.
#[derive(Parser, Debug)]
#[command(name = "bugtrackerd", about = "Bug tracker server", version)]
struct Cli {
    /// Database connection string: `redb:///path/to/bugs.redb` or a plain path.
    #[arg(long = "db", env = "BUGTRACKER_DB")]
    db: Option<String>,

    /// Directory for the database file when `--db` is relative or unset.
    #[arg(long = "data-dir", env = "BUGTRACKER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Listen address.
    #[arg(long = "listen", env = "BUGTRACKER_LISTEN", default_value = "0.0.0.0:5000")]
    listen: String,

    /// Port override; keeps the host part of `--listen`.
    #[arg(long = "port", env = "PORT")]
    port: Option<u16>,
}

impl Cli {
    fn service_config(&self) -> ServiceConfig {
        let mut config = ServiceConfig {
            data_dir: self.data_dir.clone(),
            listen: self.listen.clone(),
            ..Default::default()
        };
        if let Some(db) = &self.db {
            config = config.with_connection_string(db);
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Cli::parse().service_config();

    // Open the document store once; every request shares this handle.
    let db_path = config.resolve_db_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let kv: Arc<dyn bugtracker_kv::KVStore> = Arc::new(
        bugtracker_kv::RedbStore::open(&db_path)
            .map_err(|e| anyhow::anyhow!("failed to open store {}: {}", db_path.display(), e))?,
    );
    info!("Database: {}", db_path.display());

    let bugs_module = bugs::BugsModule::new(Arc::clone(&kv));
    let existing = bugs_module.store().count()?;
    info!("Bugs module initialized ({} bugs)", existing);

    let module_routes = vec![(bugs_module.name().to_string(), bugs_module.routes())];
    let app = routes::build_router(module_routes);

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    info!("Bug tracker listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(routes::shutdown_signal())
        .await?;

    // Routers (and their store clones) are gone once serve returns.
    drop(bugs_module);
    drop(kv);
    info!("Store closed, bye");

    Ok(())
}
