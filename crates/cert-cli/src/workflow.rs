use crate::context::Context;
use crate::output::print_json;
use anyhow::{bail, Context as _, Result};
use cert_core::app_state::Action;
use cert_core::lifecycle::stage_label;
use cert_core::Workflow;
use clap::{Args, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum WorkflowCommand {
    List(WorkflowListArgs),
    Show(WorkflowShowArgs),
    /// Make a workflow the default for new certifications
    Select(WorkflowSelectArgs),
    /// Load workflows from a JSON file (one object or an array)
    Import(WorkflowImportArgs),
    Export(WorkflowExportArgs),
    #[command(alias = "rm")]
    Remove(WorkflowTargetArgs),
    /// Task names offered when adding tasks by hand
    Predefined {
        #[command(subcommand)]
        action: PredefinedCommand,
    },
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum PredefinedCommand {
    List(PredefinedListArgs),
    Add(PredefinedAddArgs),
}

#[derive(Args, Debug)]
pub struct WorkflowListArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct WorkflowShowArgs {
    pub id: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct WorkflowSelectArgs {
    #[arg(required_unless_present = "clear")]
    pub id: Option<String>,
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args, Debug)]
pub struct WorkflowImportArgs {
    pub path: PathBuf,
    /// Select the imported workflow afterwards
    #[arg(long)]
    pub select: bool,
}

#[derive(Args, Debug)]
pub struct WorkflowExportArgs {
    pub id: String,
    /// Write to a file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct WorkflowTargetArgs {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct PredefinedListArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PredefinedAddArgs {
    pub category: String,
    pub task: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WorkflowFile {
    Many(Vec<Workflow>),
    One(Box<Workflow>),
}

pub fn handle_workflow_command(ctx: &mut Context, command: WorkflowCommand) -> Result<()> {
    ctx.sync_workflows()?;
    match command {
        WorkflowCommand::List(args) => list_workflows(ctx, &args),
        WorkflowCommand::Show(args) => show_workflow(ctx, &args),
        WorkflowCommand::Select(args) => select_workflow(ctx, &args),
        WorkflowCommand::Import(args) => import_workflows(ctx, &args),
        WorkflowCommand::Export(args) => export_workflow(ctx, &args),
        WorkflowCommand::Remove(args) => remove_workflow(ctx, &args),
        WorkflowCommand::Predefined { action } => match action {
            PredefinedCommand::List(args) => list_predefined(ctx, &args),
            PredefinedCommand::Add(args) => add_predefined(ctx, &args),
        },
    }
}

fn list_workflows(ctx: &mut Context, args: &WorkflowListArgs) -> Result<()> {
    if args.json {
        return print_json(&ctx.state.workflows);
    }
    if ctx.state.workflows.is_empty() {
        println!("No workflows stored. Run `certdash reset workflows` to restore the default.");
        return Ok(());
    }
    let selected = ctx.state.selected_workflow.as_deref();
    for workflow in &ctx.state.workflows {
        let marker = if Some(workflow.id.as_str()) == selected { "*" } else { " " };
        println!(
            "{marker} {} - {} (v{}, {}, {} stage(s))",
            workflow.id,
            workflow.name,
            workflow.version,
            workflow.status,
            workflow.stages.len()
        );
    }
    Ok(())
}

fn show_workflow(ctx: &mut Context, args: &WorkflowShowArgs) -> Result<()> {
    let workflow = ctx.store.get_workflow(&args.id)?;
    if args.json {
        return print_json(&workflow);
    }
    println!("{} ({})", workflow.name, workflow.id);
    if !workflow.description.is_empty() {
        println!("  {}", workflow.description);
    }
    println!("  status {} | version {}", workflow.status, workflow.version);
    for stage in &workflow.stages {
        println!("\n{}", stage_label(stage.name));
        for template in &stage.tasks {
            let required = if template.required { "" } else { " (optional)" };
            println!("  - {} [{}]{required}", template.title, template.kind);
        }
    }
    Ok(())
}

fn select_workflow(ctx: &mut Context, args: &WorkflowSelectArgs) -> Result<()> {
    if args.clear {
        ctx.dispatch(Action::SelectWorkflow(None))?;
        println!("Cleared the selected workflow.");
        return Ok(());
    }
    let Some(id) = args.id.as_deref() else {
        bail!("Workflow id required");
    };
    let workflow = ctx.store.get_workflow(id)?;
    ctx.dispatch(Action::SelectWorkflow(Some(workflow.id.clone())))?;
    println!("Selected workflow '{}'.", workflow.name);
    Ok(())
}

fn import_workflows(ctx: &mut Context, args: &WorkflowImportArgs) -> Result<()> {
    let path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        ctx.paths.root.join(&args.path)
    };
    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let workflows = match serde_json::from_str::<WorkflowFile>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?
    {
        WorkflowFile::Many(workflows) => workflows,
        WorkflowFile::One(workflow) => vec![*workflow],
    };
    if workflows.is_empty() {
        bail!("{} contains no workflows", path.display());
    }

    let mut last_id = None;
    for workflow in workflows {
        let id = workflow.id.clone();
        let replaced = ctx.store.save_workflow(workflow)?;
        let stored = ctx.store.get_workflow(&id)?;
        if replaced {
            ctx.dispatch(Action::UpdateWorkflow(stored))?;
            println!("Updated workflow '{id}'.");
        } else {
            ctx.dispatch(Action::AddWorkflow(stored))?;
            println!("Imported workflow '{id}'.");
        }
        last_id = Some(id);
    }
    if args.select {
        ctx.dispatch(Action::SelectWorkflow(last_id))?;
    }
    Ok(())
}

fn export_workflow(ctx: &mut Context, args: &WorkflowExportArgs) -> Result<()> {
    let workflow = ctx.store.get_workflow(&args.id)?;
    match &args.output {
        Some(path) => {
            let payload = serde_json::to_string_pretty(&workflow)?;
            fs::write(path, payload)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported '{}' to {}.", workflow.id, path.display());
            Ok(())
        }
        None => print_json(&workflow),
    }
}

fn remove_workflow(ctx: &mut Context, args: &WorkflowTargetArgs) -> Result<()> {
    let removed = ctx.store.remove_workflow(&args.id)?;
    ctx.dispatch(Action::DeleteWorkflow(removed.id.clone()))?;
    let still_used = ctx
        .store
        .list_certifications()?
        .iter()
        .filter(|request| request.workflow == removed.id)
        .count();
    println!("Removed workflow '{}'.", removed.id);
    if still_used > 0 {
        println!("{still_used} certification(s) still reference it and will advance without new tasks.");
    }
    Ok(())
}

fn list_predefined(ctx: &mut Context, args: &PredefinedListArgs) -> Result<()> {
    if args.json {
        return print_json(&ctx.state.predefined_tasks);
    }
    if ctx.state.predefined_tasks.is_empty() {
        println!("No predefined tasks.");
        return Ok(());
    }
    for (category, tasks) in &ctx.state.predefined_tasks {
        println!("{category}");
        for task in tasks {
            println!("  - {task}");
        }
    }
    Ok(())
}

fn add_predefined(ctx: &mut Context, args: &PredefinedAddArgs) -> Result<()> {
    let category = args.category.trim();
    let task = args.task.trim();
    if category.is_empty() || task.is_empty() {
        bail!("Category and task cannot be empty");
    }
    ctx.dispatch(Action::AddPredefinedTask {
        category: category.to_string(),
        task: task.to_string(),
    })?;
    println!("Added '{task}' under '{category}'.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cert_core::catalog::default_workflow;

    #[test]
    fn import_file_accepts_object_or_array() {
        let one = serde_json::to_string(&default_workflow()).expect("encode");
        assert!(matches!(
            serde_json::from_str::<WorkflowFile>(&one).expect("one"),
            WorkflowFile::One(_)
        ));
        let many = serde_json::to_string(&vec![default_workflow()]).expect("encode");
        match serde_json::from_str::<WorkflowFile>(&many).expect("many") {
            WorkflowFile::Many(workflows) => assert_eq!(workflows.len(), 1),
            WorkflowFile::One(_) => panic!("array decoded as single workflow"),
        }
    }
}
