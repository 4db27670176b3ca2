//! `bugtracker`: command-line client for a bugtrackerd server.

mod commands;

use bugtracker_client::{BugClient, BugPatch, BugStatus};
use clap::{Parser, Subcommand};

use commands::Output;

/// Bug tracker CLI.
#[derive(Parser, Debug)]
#[command(name = "bugtracker", about = "Bug tracker CLI client", version)]
struct Cli {
    /// Server URL.
    #[arg(
        long = "server",
        global = true,
        env = "BUGTRACKER_SERVER",
        default_value = "http://localhost:5000"
    )]
    server: String,

    /// Output format.
    #[arg(long = "output", short = 'o', global = true, value_enum, default_value = "table")]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all bugs.
    List,

    /// Report a new bug.
    Report {
        /// Short title.
        title: String,
        /// Longer description.
        #[arg(long, short = 'd')]
        description: Option<String>,
        /// Initial status (default: open).
        #[arg(long)]
        status: Option<BugStatus>,
    },

    /// Change title, description or status of a bug.
    Update {
        /// Bug ID.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, short = 'd')]
        description: Option<String>,
        /// Remove the description.
        #[arg(long, conflicts_with = "description")]
        clear_description: bool,
        #[arg(long)]
        status: Option<BugStatus>,
    },

    /// Delete a bug.
    Delete {
        /// Bug ID.
        id: String,
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },

    /// Check server status.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = BugClient::new(&cli.server)?;

    match cli.command {
        Commands::List => commands::bugs::list(&client, cli.output).await?,
        Commands::Report {
            title,
            description,
            status,
        } => commands::bugs::report(&client, title, description, status, cli.output).await?,
        Commands::Update {
            id,
            title,
            description,
            clear_description,
            status,
        } => {
            let description = if clear_description {
                Some(None)
            } else {
                description.map(Some)
            };
            let patch = BugPatch {
                title,
                description,
                status,
            };
            commands::bugs::update(&client, &id, patch, cli.output).await?
        }
        Commands::Delete { id, yes } => commands::bugs::delete(&client, &id, yes).await?,
        Commands::Status => commands::status::status(&client).await?,
    }

    Ok(())
}
