use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use shelf_app::modules;
use shelf_app::scripts::query::{self, QueryOp};
use shelf_app::scripts::seed;
use shelf_db::with_connection;
use shelf_kernel::settings::Settings;

/// Seed and query the book and publisher collections.
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the collections and install their validators
    Migrate,
    /// Populate reference data
    #[command(subcommand)]
    Seed(SeedCommand),
    /// Run one ad-hoc book operation
    #[command(subcommand)]
    Query(QueryCommand),
}

#[derive(Debug, Subcommand)]
enum SeedCommand {
    /// Insert the reference publishers that are missing
    Publishers,
    /// Bulk-insert the five reference books
    Books,
}

#[derive(Debug, Subcommand)]
enum QueryCommand {
    /// List every book
    Find,
    /// Create a book referencing the first publisher found
    Create {
        #[arg(long, default_value = query::DEFAULT_CREATE_TITLE)]
        title: String,
        #[arg(long, default_value = query::DEFAULT_CREATE_AUTHOR)]
        author: String,
        #[arg(long, default_value = query::DEFAULT_CREATE_PUBLISHED_DATE)]
        published_date: String,
    },
    /// Retitle the first book with an exactly matching title
    Update {
        #[arg(long, default_value = query::DEFAULT_UPDATE_TITLE)]
        title: String,
        #[arg(long, default_value = query::DEFAULT_UPDATE_NEW_TITLE)]
        new_title: String,
    },
    /// Delete the first book with an exactly matching title
    Delete {
        #[arg(long, default_value = query::DEFAULT_DELETE_TITLE)]
        title: String,
    },
}

impl From<QueryCommand> for QueryOp {
    fn from(command: QueryCommand) -> Self {
        match command {
            QueryCommand::Find => QueryOp::FindAll,
            QueryCommand::Create {
                title,
                author,
                published_date,
            } => QueryOp::Create {
                title,
                author,
                published_date,
            },
            QueryCommand::Update { title, new_title } => QueryOp::Update { title, new_title },
            QueryCommand::Delete { title } => QueryOp::Delete { title },
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered =
        serde_json::to_string_pretty(value).with_context(|| "failed to render result")?;
    println!("{rendered}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load shelf settings")?;
    shelf_telemetry::init(&settings.telemetry)
        .with_context(|| "failed to initialize telemetry")?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.name,
        "shelf starting"
    );

    match cli.command {
        Command::Migrate => {
            with_connection(&settings.database, |db| async move {
                modules::prepare(&db).await
            })
            .await?;
            tracing::info!("collections migrated");
        }
        Command::Seed(SeedCommand::Publishers) => {
            let publishers = with_connection(&settings.database, |db| async move {
                modules::prepare(&db).await?;
                seed::seed_publishers(&db).await
            })
            .await?;
            print_json(&publishers)?;
        }
        Command::Seed(SeedCommand::Books) => {
            let books = with_connection(&settings.database, |db| async move {
                modules::prepare(&db).await?;
                seed::seed_books(&db).await
            })
            .await?;
            print_json(&books)?;
        }
        Command::Query(command) => {
            let op = QueryOp::from(command);
            let result = with_connection(&settings.database, |db| async move {
                modules::prepare(&db).await?;
                query::run(&db, op).await
            })
            .await;

            // Query failures are reported, not propagated.
            match result {
                Ok(outcome) => print_json(&outcome)?,
                Err(err) => tracing::error!(error = %format!("{err:#}"), "query failed"),
            }
        }
    }

    Ok(())
}
