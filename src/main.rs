use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

use records_authz::authz::AuthzMode;
use records_authz::snapshot::{load_principal, load_records};
use records_authz::PermissionChecker;

/// Used when `RUST_LOG` is unset: engine decisions at info, dependencies at warn.
const DEFAULT_LOG_FILTER: &str = "warn,records_authz=info";

#[derive(Parser, Debug)]
#[command(author, version, about = "evaluate access policies against a principal snapshot", long_about = None)]
struct Cli {
    /// Enforcement mode; defaults to AUTHZ_MODE
    #[arg(long, global = true)]
    mode: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Target {
    /// Principal snapshot (JSON)
    #[arg(long)]
    principal: PathBuf,
    #[arg(long)]
    action: String,
    #[arg(long)]
    entity: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print action, field and record decisions
    Check {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        field: Option<String>,
        /// Record file to test
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Print records with inaccessible fields removed
    Fields {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        records: PathBuf,
    },
    /// Print the records the principal may see, field-filtered
    Records {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        records: PathBuf,
    },
    /// Print the query predicate
    Where {
        #[command(flatten)]
        target: Target,
    },
    /// Print the storage field selection for a comma-separated schema
    Select {
        #[command(flatten)]
        target: Target,
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let mode = match cli.mode.as_deref() {
        Some(value) => AuthzMode::parse(value)?,
        None => AuthzMode::from_env(),
    };

    let output = match cli.command {
        Commands::Check { target, field, record } => {
            let checker = checker_for(&target)?;
            checker.require(&target.action, &target.entity, mode)?;

            let mut report = json!({ "can": checker.can(&target.action, &target.entity) });
            if let Some(field) = field {
                let accessible = checker.can_access_field(&target.action, &target.entity, &field);
                report["field"] = json!({ "name": field, "accessible": accessible });
            }
            if let Some(path) = record {
                let records = load_records(&path)?;
                let decisions: Vec<Value> = records
                    .iter()
                    .map(|r| {
                        json!({
                            "accessible": checker.can_access_record(&target.action, &target.entity, r),
                            "visible": checker.filter_fields(&target.action, &target.entity, r),
                        })
                    })
                    .collect();
                report["records"] = Value::Array(decisions);
            }
            report
        }
        Commands::Fields { target, records } => {
            let checker = checker_for(&target)?;
            let records = load_records(&records)?;
            serde_json::to_value(checker.filter_fields_all(&target.action, &target.entity, &records))?
        }
        Commands::Records { target, records } => {
            let checker = checker_for(&target)?;
            let records = load_records(&records)?;
            let visible = checker.filter_records(&target.action, &target.entity, records);
            serde_json::to_value(checker.filter_fields_all(&target.action, &target.entity, &visible))?
        }
        Commands::Where { target } => checker_for(&target)?
            .query_predicate(&target.action, &target.entity)
            .to_json(),
        Commands::Select { target, fields } => {
            let checker = checker_for(&target)?;
            serde_json::to_value(checker.field_selection(&target.action, &target.entity, &fields))?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn checker_for(target: &Target) -> anyhow::Result<PermissionChecker> {
    let principal = load_principal(&target.principal)
        .with_context(|| format!("failed to load principal {}", target.principal.display()))?;
    Ok(PermissionChecker::new(principal))
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
