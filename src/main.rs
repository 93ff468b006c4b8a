use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use planboard::config::Config;
use planboard::error::{ErrorBody, PlanboardError, Result};
use planboard::resort::{ResortItem, ResortRequest};
use planboard::services::{ListQuery, PlanShape};
use planboard::Planboard;

#[derive(Parser, Debug)]
#[command(name = "planboard")]
#[command(about = "Plans, task lists and tasks over a document store")]
#[command(version = planboard::build_version())]
struct Cli {
    /// JSON config file; defaults to config.json in the app data directory.
    #[arg(long, env = "PLANBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite file, overriding the configured path.
    #[arg(long)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List plans, newest first.
    Plans {
        #[arg(long, default_value_t = planboard::services::DEFAULT_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long)]
        search: Option<String>,
        /// Embed task lists and tasks.
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    /// Show one plan.
    Plan {
        id: String,
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    DeletePlan {
        id: String,
    },
    DeleteTaskList {
        id: String,
    },
    /// Apply a batch of task moves read from a JSON file.
    Resort {
        file: PathBuf,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResortBody {
    Wrapped(ResortRequest),
    Bare(Vec<ResortItem>),
}

impl ResortBody {
    fn into_items(self) -> Vec<ResortItem> {
        match self {
            Self::Wrapped(request) => request.tasks,
            Self::Bare(items) => items,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    planboard::logging::init_tracing("planboard_cli");
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err.is_client_fault() {
                tracing::warn!(error = %err, "Request rejected");
            } else {
                tracing::error!(error = %err, "Request failed");
            }
            let body = ErrorBody::from(&err);
            match serde_json::to_string_pretty(&body) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{err}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref(), cli.db.as_deref())?;
    let board = Planboard::from_config(&config).await?;

    match cli.command {
        Command::Plans {
            limit,
            skip,
            search,
            all,
        } => {
            let mut query = ListQuery::default().with_limit(limit).with_skip(skip);
            if let Some(search) = search {
                query = query.with_search(search);
            }
            let page = board
                .plans
                .find_all(&query, PlanShape::from_flag(all))
                .await?;
            print_json(&page)
        }
        Command::Plan { id, all } => {
            let view = board
                .plans
                .find_by_id(&id, PlanShape::from_flag(all))
                .await?;
            print_json(&view)
        }
        Command::DeletePlan { id } => print_json(&board.plans.delete(&id).await?),
        Command::DeleteTaskList { id } => print_json(&board.task_lists.delete(&id).await?),
        Command::Resort { file } => {
            let raw = std::fs::read_to_string(&file).map_err(|e| {
                PlanboardError::InvalidInput(format!("failed to read {}: {e}", file.display()))
            })?;
            let items = serde_json::from_str::<ResortBody>(&raw)
                .map_err(|e| PlanboardError::InvalidInput(format!("invalid resort body: {e}")))?
                .into_items();
            print_json(&board.tasks.bulk_resort(&items).await?)
        }
    }
}

fn load_config(path: Option<&PathBuf>, db_override: Option<&str>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => {
            let default_path = planboard::runtime_paths::default_config_path();
            if default_path.exists() {
                Config::from_file(&default_path)?
            } else {
                Config::convention_defaults(&planboard::runtime_paths::default_db_path())
            }
        }
    };
    Ok(match db_override {
        Some(db) => config.with_sqlite_override(db),
        None => config,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
