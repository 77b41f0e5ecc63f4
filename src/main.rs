use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use review_console::config::Config;
use review_console::db::{self, PgRecordStore};
use review_console::notify::{EmailJsClient, NotificationGateway};
use review_console::report;
use review_console::store::RecordStore;
use review_console::view::{self, SortKey, SortOrder};
use review_console::{Command, Participant, ParticipantId, Pool, ReviewEngine, ReviewSession};

#[derive(Parser)]
#[command(name = "review-console")]
#[command(about = "Review, approve and check in event participants", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Target {
    #[arg(long, value_enum)]
    pool: Pool,
    #[arg(long)]
    id: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample participants into every pool
    Seed,
    /// Import participants from a CSV file
    Import {
        #[arg(long, value_enum)]
        pool: Pool,
        #[arg(long)]
        csv: PathBuf,
    },
    /// List the participants of a pool
    List {
        #[arg(long, value_enum)]
        pool: Pool,
        /// Filter by name, email or company
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, value_enum, default_value_t = SortKey::Name)]
        sort: SortKey,
        #[arg(long)]
        desc: bool,
        /// Print the rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one participant
    Show(Target),
    /// Send the approval email, then mark the participant approved
    Approve(Target),
    /// Mark the participant rejected
    Reject(Target),
    /// Record the participant's arrival (onsite pools)
    CheckIn(Target),
    /// Record the participant's departure (onsite pools)
    CheckOut(Target),
}

async fn review(
    config: &Config,
    store: Arc<dyn RecordStore>,
    target: Target,
    build: fn(ParticipantId) -> Command,
) -> anyhow::Result<()> {
    let notifications = match config.emailjs.clone() {
        Some(emailjs) => {
            NotificationGateway::new(Arc::new(EmailJsClient::new(emailjs)), config.templates.clone())
        }
        None => {
            warn!("EMAILJS_SERVICE_ID or EMAILJS_USER_ID not set, approvals will be refused");
            NotificationGateway::unconfigured()
        }
    };
    let engine = ReviewEngine::new(store.clone(), notifications)
        .with_approval_dwell(config.approval_dwell)
        .with_display_offset(config.display_offset);

    let mut session = ReviewSession::open(store, engine, target.pool).await;
    let participant_id = ParticipantId(target.id);
    if session.select(&participant_id).is_none() {
        anyhow::bail!("participant {} not found in {}", participant_id, target.pool);
    }

    let command = build(participant_id.clone());
    let name = command.name();
    let participant = session
        .dispatch(command)
        .await
        .with_context(|| format!("{name} failed for participant {participant_id}"))?;
    print!("{}", report::build_detail(&participant));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(pool.clone()));

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { pool: target, csv } => {
            let inserted = db::import_csv(&pool, target, &csv).await?;
            println!("Inserted {inserted} participants into {target} from {}.", csv.display());
        }
        Commands::List {
            pool: target,
            search,
            sort,
            desc,
            json,
        } => {
            let records = store
                .list(target)
                .await
                .with_context(|| format!("failed to list {target}"))?;
            let collection: Vec<_> = records
                .into_iter()
                .map(|record| Participant::stamp(record, target))
                .collect();
            let mut visible = view::project(&collection, &search);
            let order = if desc {
                SortOrder::Descending
            } else {
                SortOrder::Ascending
            };
            view::sort(&mut visible, sort, order);
            if json {
                println!("{}", serde_json::to_string_pretty(&visible)?);
            } else {
                print!("{}", report::build_listing(target, &collection, &visible));
            }
        }
        Commands::Show(target) => {
            let records = store
                .list(target.pool)
                .await
                .with_context(|| format!("failed to list {}", target.pool))?;
            let record = records
                .into_iter()
                .find(|record| record.id.0 == target.id)
                .with_context(|| format!("participant {} not found in {}", target.id, target.pool))?;
            let participant = Participant::stamp(record, target.pool);
            print!("{}", report::build_detail(&participant));
        }
        Commands::Approve(target) => {
            review(&config, store, target, |participant_id| Command::Approve { participant_id })
                .await?;
        }
        Commands::Reject(target) => {
            review(&config, store, target, |participant_id| Command::Reject { participant_id })
                .await?;
        }
        Commands::CheckIn(target) => {
            review(&config, store, target, |participant_id| Command::CheckIn { participant_id })
                .await?;
        }
        Commands::CheckOut(target) => {
            review(&config, store, target, |participant_id| Command::CheckOut { participant_id })
                .await?;
        }
    }

    Ok(())
}
