//! itemflow CLI - migrate items between record store apps, or import CSV
//!
//! Two workflows:
//! - `migrate`: fetch, dedupe, filter, clone each item into a destination
//!   app, and attach a derived follow-up task.
//! - `import`: seed an app from a CSV export, mapped by field display label.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use itemflow::config::{
    ImportSpec, MigrateSpec, Settings, DEFAULT_BASE_URL, DEFAULT_TASK_DATE_FIELD,
    DEFAULT_TITLE_FIELD,
};
use itemflow::gateway::RecordStoreGateway;
use itemflow::import::CsvImporter;
use itemflow::pipeline::types::{FilterSpec, ImportReport, MigrationReport};
use itemflow::pipeline::Migrator;
use itemflow::session::Credentials;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "itemflow", version, about = "Item migration and CSV import tool")]
struct Cli {
    #[command(flatten)]
    auth: AuthArgs,

    /// Record store endpoint
    #[arg(long, env = "ITEMFLOW_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct AuthArgs {
    /// Account email/username
    #[arg(long, env = "ITEMFLOW_USERNAME", default_value = "", global = true)]
    username: String,

    /// Account password
    #[arg(long, env = "ITEMFLOW_PASSWORD", default_value = "", global = true)]
    password: String,

    /// API client id
    #[arg(long, env = "ITEMFLOW_CLIENT_ID", default_value = "", global = true)]
    client_id: String,

    /// API client secret
    #[arg(long, env = "ITEMFLOW_CLIENT_SECRET", default_value = "", global = true)]
    client_secret: String,
}

#[derive(Subcommand)]
enum Command {
    /// Migrate items from a source app into a destination app
    Migrate {
        /// App id to extract items from
        #[arg(long)]
        source_app: u64,

        /// App id to receive cloned items
        #[arg(long)]
        dest_app: u64,

        /// Field whose value identifies duplicate items
        #[arg(long, default_value = DEFAULT_TITLE_FIELD)]
        dedupe_field: String,

        /// Client-side predicate, `Label=Value` (repeatable, all must match)
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Server-side filter, `fieldId=v1,v2` (repeatable)
        #[arg(long = "remote-filter")]
        remote_filters: Vec<String>,

        /// Field feeding the follow-up task title
        #[arg(long, default_value = DEFAULT_TITLE_FIELD)]
        task_title_field: String,

        /// Date field driving the follow-up task due date
        #[arg(long, default_value = DEFAULT_TASK_DATE_FIELD)]
        task_date_field: String,
    },

    /// Import items into an app from a CSV file
    Import {
        /// App id to receive imported items
        #[arg(long)]
        app: u64,

        /// Path to the CSV file (header row = field display labels)
        #[arg(long)]
        csv: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env before clap so env-backed flags see it
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let credentials = Credentials {
        username: cli.auth.username,
        password: cli.auth.password,
        client_id: cli.auth.client_id,
        client_secret: cli.auth.client_secret,
    };
    let settings = Settings::new(&cli.base_url, credentials)?;

    let gateway = RecordStoreGateway::connect(settings.base_url, &settings.credentials).await?;

    match cli.command {
        Command::Migrate {
            source_app,
            dest_app,
            dedupe_field,
            filters,
            remote_filters,
            task_title_field,
            task_date_field,
        } => {
            let spec = MigrateSpec {
                source_app,
                dest_app,
                dedupe_field,
                filters: FilterSpec::parse(&filters)?,
                remote_filters: MigrateSpec::parse_remote_filters(&remote_filters)?,
                task_title_field,
                task_date_field,
            };

            let report = Migrator::new(&gateway, spec).run().await?;
            render_migration_report(&report);
        }
        Command::Import { app, csv } => {
            let spec = ImportSpec { app, csv_path: csv };
            let report = CsvImporter::new(&gateway, spec).run().await?;
            render_import_report(&report);
        }
    }

    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,itemflow=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact())
        .init();
}

fn render_migration_report(report: &MigrationReport) {
    info!(
        "migration finished: {} fetched, {} attempted, {} succeeded, {} failed",
        report.fetched, report.attempted, report.succeeded, report.failed
    );

    for outcome in &report.outcomes {
        let label = outcome
            .title
            .clone()
            .or_else(|| outcome.item_id.map(|id| format!("item {}", id)))
            .unwrap_or_else(|| "(unidentified item)".to_string());

        match &outcome.error {
            None => info!("  ok: {}", label),
            Some(reason) => error!("  failed ({:?}): {} - {}", outcome.status, label, reason),
        }
    }
}

fn render_import_report(report: &ImportReport) {
    info!(
        "import finished: {} attempted, {} succeeded, {} failed, {} empty rows skipped",
        report.attempted, report.succeeded, report.failed, report.skipped
    );

    for outcome in &report.outcomes {
        if let Some(reason) = &outcome.error {
            error!("  row {} failed: {}", outcome.row, reason);
        }
    }
}
