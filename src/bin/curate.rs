use anyhow::{Context as AnyhowContext, Result, bail};
use clap::{Parser, Subcommand};
use curate::curator::context::{Actor, Context, CurationObject, InMemoryObjectStore};
use curate::curator::session::Session;
use curate::curator::{Curator, status};
use curate::descriptor::RecorderConfig;
use curate::descriptor::factory::TaskFactory;
use curate::descriptor::loader::load_descriptor_from_yaml;
use curate::plugin::{PluginRegistry, RECORDER_CATEGORY};
use curate::task::Invoked;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run curation tasks over an object
    Run {
        /// Task descriptor YAML
        #[arg(long)]
        descriptor: PathBuf,
        /// YAML list of repository objects
        #[arg(long)]
        objects: PathBuf,
        /// Task to run; repeat for several
        #[arg(long = "task", required = true)]
        tasks: Vec<String>,
        /// Object id to curate
        #[arg(long)]
        id: String,
        /// Name of the acting user
        #[arg(long)]
        user: Option<String>,
        /// Write records to this JSON lines file instead of the configured recorder
        #[arg(long)]
        records: Option<PathBuf>,
        /// Run as a batch invocation instead of interactive
        #[arg(long)]
        batch: bool,
    },
    /// List the tasks of a descriptor with their policy
    Tasks {
        #[arg(long)]
        descriptor: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { descriptor, objects, tasks, id, user, records, batch } => {
            let descriptor = load_descriptor_from_yaml(&descriptor)?;
            let catalog = TaskFactory::with_builtins().build_catalog(&descriptor)?;
            info!("Loaded {} task(s)", catalog.len());

            let recorder = match records {
                Some(path) => RecorderConfig::Jsonl { path },
                None => descriptor.recorder.clone().unwrap_or(RecorderConfig::Log),
            };
            let mut plugins = PluginRegistry::new();
            plugins.register_recorder(RECORDER_CATEGORY, recorder.build())?;

            let store: InMemoryObjectStore = load_objects(&objects)?.into_iter().collect();
            let mut ctx = Context::new(Arc::new(store));
            if let Some(name) = user {
                ctx = ctx.with_user(Actor::new(&name));
            }

            let invoked = if batch { Invoked::Batch } else { Invoked::Interactive };
            let mut curator = Curator::new(Session::new(Arc::new(plugins)), Arc::new(catalog), invoked);
            for name in &tasks {
                curator.add_task(name).await?;
            }

            // Tear down even when curation failed so closeable recorders are flushed.
            let runs = curator.curate(&ctx, &id).await;
            curator.shutdown().await?;

            for run in runs? {
                println!(
                    "{}\t{}\t{}\t{}",
                    run.task,
                    status::label(run.status),
                    run.performed,
                    run.result.unwrap_or_default()
                );
            }
        }
        Commands::Tasks { descriptor } => {
            let descriptor = load_descriptor_from_yaml(&descriptor)?;
            let catalog = TaskFactory::with_builtins().build_catalog(&descriptor)?;
            for name in catalog.names() {
                let task = catalog.resolve(&name)?;
                println!(
                    "{}\tdistributive={}\tmutative={}\tsuspend={:?}\trecords={}",
                    name,
                    task.is_distributive(),
                    task.is_mutative(),
                    task.mode(),
                    task.policy().record_specs.len()
                );
            }
        }
    }

    Ok(())
}

fn load_objects(path: &Path) -> Result<Vec<CurationObject>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read objects from {}", path.display()))?;
    let objects: Vec<CurationObject> = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to deserialize objects from {}", path.display()))?;
    if objects.is_empty() {
        bail!("no objects in {}", path.display());
    }
    Ok(objects)
}
