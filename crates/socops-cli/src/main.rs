mod copy;
mod db;
mod gate;
mod manifest;
mod plan;
mod posts;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use socops_core::AppConfig;
use socops_db::PgStore;
use socops_pipeline::PipelineSettings;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::copy::CopyCommands;
use crate::db::DbCommands;
use crate::gate::GateCommands;
use crate::manifest::ManifestCommands;
use crate::plan::PlanCommands;
use crate::posts::PostsCommands;

#[derive(Debug, Parser)]
#[command(name = "socops")]
#[command(about = "Weekly social content pipeline: plan, generate, gate, approve, export")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Weekly editorial plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Copy generation for a planned week
    Copy {
        #[command(subcommand)]
        command: CopyCommands,
    },
    /// Brand and compliance gates
    Gate {
        #[command(subcommand)]
        command: GateCommands,
    },
    /// Review queue
    Posts {
        #[command(subcommand)]
        command: PostsCommands,
    },
    /// Publication manifests
    Manifest {
        #[command(subcommand)]
        command: ManifestCommands,
    },
    /// Record posts that went live
    Publish {
        #[command(subcommand)]
        command: PublishCommands,
    },
}

#[derive(Debug, Subcommand)]
enum PublishCommands {
    /// Mark approved posts as published
    Mark {
        /// Post ids
        #[arg(required = true, num_args = 1..)]
        ids: Vec<Uuid>,
    },
}

/// Everything a pipeline command needs once config and pool are up.
pub(crate) struct Runtime {
    pub config: AppConfig,
    pub store: Arc<PgStore>,
    pub settings: PipelineSettings,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("socops: run `socops --help` for available commands");
        return Ok(());
    };

    let config = socops_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = socops_db::PoolConfig::from_app_config(&config);
    let pool = socops_db::connect_pool(&config.database_url, pool_config).await?;

    let runtime = Runtime {
        settings: PipelineSettings::from_app_config(&config),
        store: Arc::new(PgStore::new(pool)),
        config,
    };

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => db::run_db_ping(runtime.store.pool()).await?,
            DbCommands::Migrate => db::run_db_migrate(runtime.store.pool()).await?,
            DbCommands::SeedRules { rules } => {
                let path = rules.unwrap_or_else(|| runtime.config.rules_path.clone());
                db::run_db_seed_rules(runtime.store.pool(), &path).await?;
            }
        },
        Commands::Plan { command } => match command {
            PlanCommands::Generate {
                week,
                topics,
                calendar,
            } => {
                plan::run_plan_generate(&runtime, &week, &topics, calendar.as_deref()).await?;
            }
            PlanCommands::Show { week, json } => plan::run_plan_show(&runtime, &week, json).await?,
        },
        Commands::Copy { command } => match command {
            CopyCommands::Generate { week, dry_run } => {
                let cancel = cancel_on_ctrl_c();
                copy::run_copy_generate(&runtime, &week, dry_run, &cancel).await?;
            }
        },
        Commands::Gate { command } => match command {
            GateCommands::Run { week, post } => {
                gate::run_gate(&runtime, week.as_deref(), post).await?;
            }
        },
        Commands::Posts { command } => match command {
            PostsCommands::List { week, status } => {
                posts::run_posts_list(&runtime, &week, status.as_deref()).await?;
            }
            PostsCommands::Approve { id, by } => posts::run_posts_approve(&runtime, id, &by).await?,
            PostsCommands::Reject { id } => posts::run_posts_reject(&runtime, id).await?,
            PostsCommands::BulkApprove { ids, by } => {
                posts::run_posts_bulk_approve(&runtime, &ids, &by).await?;
            }
        },
        Commands::Manifest { command } => match command {
            ManifestCommands::Export {
                week,
                channels,
                out_dir,
            } => manifest::run_manifest_export(&runtime, &week, &channels, &out_dir).await?,
        },
        Commands::Publish { command } => match command {
            PublishCommands::Mark { ids } => posts::run_publish_mark(&runtime, &ids).await?,
        },
    }

    Ok(())
}

/// A token cancelled on the first Ctrl-C. In-flight work finishes; nothing
/// new starts.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("received ctrl-c, finishing in-flight work");
            child.cancel();
        }
    });
    token
}
