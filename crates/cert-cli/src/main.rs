use anyhow::Result;
use cert_core::dashboard::Dashboard;
use cert_core::{CertificationRequest, Workflow};
use cert_storage::Collection;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cert;
mod context;
mod dashboard;
mod output;
mod task;
mod workflow;

use context::Context;

#[derive(Parser)]
#[command(name = "certdash")]
#[command(about = "Certification tracking dashboard", long_about = None)]
struct Cli {
    /// Log at debug level (overrides CERTDASH_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage certification requests
    Cert {
        #[command(subcommand)]
        action: cert::CertCommand,
    },
    /// Manage the tasks of one certification request
    Task {
        #[command(subcommand)]
        action: task::TaskCommand,
    },
    /// Manage workflow templates
    Workflow {
        #[command(subcommand)]
        action: workflow::WorkflowCommand,
    },
    /// Manage custom dashboards
    Dashboard {
        #[command(subcommand)]
        action: dashboard::DashboardCommand,
    },
    /// Replace a stored collection with its built-in data
    Reset(ResetArgs),
}

#[derive(Args, Debug)]
struct ResetArgs {
    /// certifications, workflows or dashboards
    collection: Collection,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut ctx = Context::load()?;
    match cli.command {
        Commands::Cert { action } => cert::handle_cert_command(&mut ctx, action),
        Commands::Task { action } => task::handle_task_command(&mut ctx, action),
        Commands::Workflow { action } => workflow::handle_workflow_command(&mut ctx, action),
        Commands::Dashboard { action } => dashboard::handle_dashboard_command(&mut ctx, action),
        Commands::Reset(args) => reset_collection(&mut ctx, &args),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        "debug".to_string()
    } else if let Ok(level) = std::env::var("CERTDASH_LOG") {
        level
    } else {
        "warn".to_string()
    };
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn reset_collection(ctx: &mut Context, args: &ResetArgs) -> Result<()> {
    let count = match args.collection {
        Collection::Certifications => ctx.store.reset::<CertificationRequest>()?,
        Collection::Workflows => {
            let count = ctx.store.reset::<Workflow>()?;
            ctx.sync_workflows()?;
            count
        }
        Collection::Dashboards => ctx.store.reset::<Dashboard>()?,
    };
    println!("Reset {} to {count} built-in record(s).", args.collection);
    Ok(())
}
