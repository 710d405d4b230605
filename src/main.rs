use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use spinneret_config::WorkflowDef;
use spinneret_engine::ExecutionEngine;
use spinneret_store::{Json, SqliteStore, Store, WorkflowRecord};
use spinneret_tasks::{builtin_definitions, builtin_executors};
use spinneret_workflow::{CompileError, Edge, Node, compile};

/// Spinneret - browser-automation workflows compiled into phased execution plans
#[derive(Parser)]
#[command(name = "spinneret")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.spinneret)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Compile a workflow and print its phase structure
  Plan {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Compile a workflow and run it to completion
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// The user the run is billed to
    #[arg(long)]
    user: String,

    /// Trigger label recorded on the execution
    #[arg(long, default_value = "manual")]
    trigger: String,
  },

  /// Show or top up a user's credit balance
  Credits {
    user: String,

    /// Credits to add
    #[arg(long)]
    add: Option<i64>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .init();

  let cli = Cli::parse();

  let data_dir = cli.data_dir.unwrap_or_else(|| {
    dirs::home_dir()
      .expect("could not determine home directory")
      .join(".spinneret")
  });

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    match cli.command {
      Commands::Plan { workflow_file } => plan_workflow(workflow_file).await,
      Commands::Run {
        workflow_file,
        user,
        trigger,
      } => run_workflow(workflow_file, user, trigger, data_dir).await,
      Commands::Credits { user, add } => credits(user, add, data_dir).await,
    }
  })
}

async fn load_workflow(workflow_file: &Path) -> Result<(WorkflowDef, Vec<Node>, Vec<Edge>)> {
  let content = tokio::fs::read_to_string(workflow_file)
    .await
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;

  let def: WorkflowDef = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))?;

  let nodes: Vec<Node> = def.nodes.iter().cloned().map(Node::from).collect();
  let edges: Vec<Edge> = def.edges.iter().cloned().map(Edge::from).collect();
  Ok((def, nodes, edges))
}

async fn plan_workflow(workflow_file: PathBuf) -> Result<()> {
  let (def, nodes, edges) = load_workflow(&workflow_file).await?;
  let definitions = builtin_definitions();

  match compile(&definitions, &nodes, &edges) {
    Ok(plan) => {
      eprintln!(
        "Workflow '{}' compiles into {} phase(s)",
        def.name,
        plan.phases.len()
      );
      for phase in &plan.phases {
        let nodes: Vec<String> = phase
          .nodes
          .iter()
          .map(|n| format!("{} ({})", n.id, n.task_type))
          .collect();
        println!("phase {}: {}", phase.number, nodes.join(", "));
      }
      Ok(())
    }
    Err(CompileError::NoEntryPoint) => {
      anyhow::bail!("workflow has no entry point node")
    }
    Err(CompileError::InvalidInputs(invalid)) => {
      for entry in &invalid {
        eprintln!("node '{}': {:?}", entry.node_id, entry.reason);
      }
      anyhow::bail!("workflow has invalid inputs on {} node(s)", invalid.len())
    }
  }
}

async fn open_store(data_dir: &Path) -> Result<Arc<SqliteStore>> {
  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data dir: {}", data_dir.display()))?;

  let url = format!("sqlite://{}", data_dir.join("spinneret.db").display());
  let store = SqliteStore::connect(&url)
    .await
    .context("failed to open store")?;
  store.migrate().await.context("migrations failed")?;
  Ok(Arc::new(store))
}

async fn run_workflow(
  workflow_file: PathBuf,
  user: String,
  trigger: String,
  data_dir: PathBuf,
) -> Result<()> {
  let (def, nodes, edges) = load_workflow(&workflow_file).await?;

  let definitions = builtin_definitions();
  let plan = compile(&definitions, &nodes, &edges)
    .map_err(|e| anyhow::anyhow!("workflow does not compile: {e}"))?;

  let store = open_store(&data_dir).await?;
  store
    .create_workflow(&WorkflowRecord {
      workflow_id: def.id.clone(),
      name: def.name.clone(),
      definition: Json(serde_json::to_value(&def)?),
      last_run_id: None,
      last_run_status: None,
      last_run_at: None,
    })
    .await?;

  let engine = ExecutionEngine::new(store.clone(), Arc::new(definitions), builtin_executors());
  let execution_id = engine
    .create_execution(&def.id, &user, &trigger, &plan, &edges)
    .await?;
  eprintln!("Created execution {execution_id}");

  let summary = engine.run(&execution_id, CancellationToken::new()).await?;

  for phase in store.list_phases(&execution_id).await? {
    println!(
      "phase {} {} [{:?}] credits={}",
      phase.number, phase.name, phase.status, phase.credits_consumed
    );
    for log in store.list_logs(&phase.phase_id).await? {
      println!("  [{:?}] {}", log.level, log.message);
    }
  }
  println!(
    "status: {:?}, credits consumed: {}",
    summary.status, summary.credits_consumed
  );

  Ok(())
}

async fn credits(user: String, add: Option<i64>, data_dir: PathBuf) -> Result<()> {
  let store = open_store(&data_dir).await?;

  let current = match store.get_balance(&user).await {
    Ok(balance) => balance,
    Err(spinneret_store::Error::NotFound(_)) => 0,
    Err(e) => return Err(e.into()),
  };

  match add {
    Some(amount) => {
      let updated = current + amount;
      store.set_balance(&user, updated).await?;
      println!("{user}: {updated} credits");
    }
    None => println!("{user}: {current} credits"),
  }

  Ok(())
}
