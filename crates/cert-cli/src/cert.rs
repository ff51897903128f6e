use crate::context::Context;
use crate::output::{print_json, progress_bar, request_line};
use anyhow::{anyhow, bail, Result};
use cert_core::lifecycle::{
    progress_percent, stage_label, summarize_by_stage, CertificationDraft,
};
use cert_core::{CertificationIssue, CertificationStage, IssueKind};
use cert_storage::CertificationFilter;
use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum CertCommand {
    List(CertListArgs),
    Show(CertShowArgs),
    #[command(alias = "create")]
    New(CertNewArgs),
    /// Move to the next stage and create that stage's tasks
    Advance(CertTargetArgs),
    /// Set the stage directly without creating tasks
    SetStatus(CertSetStatusArgs),
    #[command(alias = "rm")]
    Remove(CertTargetArgs),
    /// Per-stage counts broken down by certification type
    Summary(CertSummaryArgs),
    /// Record an issue against a request
    Issue(CertIssueArgs),
}

#[derive(Args, Debug)]
pub struct CertListArgs {
    #[arg(long)]
    pub stage: Option<CertificationStage>,
    #[arg(long = "type")]
    pub kind: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CertShowArgs {
    /// Request id or DARP key
    pub id: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CertNewArgs {
    pub darp_key: String,
    pub project_name: String,
    #[arg(long = "type")]
    pub kind: String,
    #[arg(long)]
    pub target_date: String,
    #[arg(long, default_value = "")]
    pub software_version: String,
    #[arg(long)]
    pub assignee: Option<String>,
    #[arg(long)]
    pub estimated_completion: Option<String>,
    /// Defaults to the selected workflow
    #[arg(long)]
    pub workflow: Option<String>,
}

#[derive(Args, Debug)]
pub struct CertTargetArgs {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct CertSetStatusArgs {
    pub id: String,
    pub stage: CertificationStage,
}

#[derive(Args, Debug)]
pub struct CertSummaryArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CertIssueArgs {
    pub id: String,
    #[arg(required_unless_present = "clear")]
    pub title: Option<String>,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long = "type", default_value = "warning")]
    pub kind: IssueKind,
    /// Remove every recorded issue instead of adding one
    #[arg(long, conflicts_with_all = ["description", "kind"])]
    pub clear: bool,
}

pub fn handle_cert_command(ctx: &mut Context, command: CertCommand) -> Result<()> {
    match command {
        CertCommand::List(args) => list_certifications(ctx, &args),
        CertCommand::Show(args) => show_certification(ctx, &args),
        CertCommand::New(args) => new_certification(ctx, args),
        CertCommand::Advance(args) => advance_certification(ctx, &args),
        CertCommand::SetStatus(args) => set_status(ctx, &args),
        CertCommand::Remove(args) => remove_certification(ctx, &args),
        CertCommand::Summary(args) => summary(ctx, &args),
        CertCommand::Issue(args) => record_issue(ctx, &args),
    }
}

/// Accepts either the record id or its DARP key.
pub fn resolve_request_id(ctx: &mut Context, key: &str) -> Result<String> {
    let requests = ctx.store.list_certifications()?;
    if let Some(request) = requests.iter().find(|request| request.id == key) {
        return Ok(request.id.clone());
    }
    let by_key: Vec<_> = requests
        .iter()
        .filter(|request| request.darp_key.eq_ignore_ascii_case(key))
        .collect();
    match by_key.as_slice() {
        [request] => Ok(request.id.clone()),
        [] => Err(anyhow!("Certification '{key}' not found.")),
        _ => bail!("DARP key '{key}' matches {} requests; use the id.", by_key.len()),
    }
}

fn list_certifications(ctx: &mut Context, args: &CertListArgs) -> Result<()> {
    let filter = CertificationFilter {
        stage: args.stage,
        kind: args.kind.clone(),
    };
    let requests = ctx.store.filter_certifications(&filter)?;
    if args.json {
        return print_json(&requests);
    }
    if requests.is_empty() {
        println!("No certifications match.");
        return Ok(());
    }
    for request in &requests {
        println!("{}", request_line(request));
    }
    Ok(())
}

fn show_certification(ctx: &mut Context, args: &CertShowArgs) -> Result<()> {
    let id = resolve_request_id(ctx, &args.id)?;
    let request = ctx.store.get_certification(&id)?;
    if args.json {
        return print_json(&request);
    }

    println!("{} {}", request.darp_key, request.project_name);
    println!("  id:        {}", request.id);
    println!("  type:      {}", request.kind);
    println!("  stage:     {}", stage_label(request.status));
    println!("  target:    {}", request.target_date);
    if !request.software_version.is_empty() {
        println!("  version:   {}", request.software_version);
    }
    if let Some(assignee) = &request.assignee {
        println!("  assignee:  {assignee}");
    }
    if let Some(eta) = &request.estimated_completion_date {
        println!("  estimated: {eta}");
    }
    println!("  workflow:  {}", request.workflow);
    println!("  updated:   {}", request.last_updated);
    println!("  progress:  {}", progress_bar(progress_percent(&request)));
    let minutes = request.time_spent();
    if minutes > 0 {
        println!("  logged:    {}h {:02}m", minutes / 60, minutes % 60);
    }

    for stage in CertificationStage::ALL {
        let tasks: Vec<_> = request.tasks_in_stage(stage).collect();
        if tasks.is_empty() {
            continue;
        }
        println!("\n{}", stage_label(stage));
        for task in tasks {
            println!(
                "  {} [{}] {} {}",
                task.priority.icon(),
                task.status.title(),
                task.name,
                short_id(&task.id)
            );
        }
    }

    if !request.issues.is_empty() {
        println!("\nIssues");
        for issue in &request.issues {
            println!("  ({}) {}: {}", issue.kind, issue.title, issue.description);
        }
    }
    Ok(())
}

fn new_certification(ctx: &mut Context, args: CertNewArgs) -> Result<()> {
    let workflow_id = ctx.resolve_workflow(args.workflow.as_deref());
    if !ctx.certification_types().iter().any(|kind| kind == &args.kind) {
        tracing::warn!(kind = %args.kind, "type is not one of the configured certification types");
    }
    let draft = CertificationDraft {
        darp_key: args.darp_key,
        project_name: args.project_name,
        kind: args.kind,
        target_date: args.target_date,
        software_version: args.software_version,
        assignee: args.assignee,
        estimated_completion_date: args.estimated_completion,
    };
    let request = ctx.store.create_certification(draft, &workflow_id)?;
    println!(
        "Created {} [{}] in {} with {} task(s).",
        request.darp_key,
        request.id,
        stage_label(request.status),
        request.tasks.len()
    );
    Ok(())
}

fn advance_certification(ctx: &mut Context, args: &CertTargetArgs) -> Result<()> {
    let id = resolve_request_id(ctx, &args.id)?;
    let outcome = ctx.store.advance_certification(&id)?;
    println!(
        "Advanced {} from {} to {} ({} new task(s)).",
        args.id,
        stage_label(outcome.from),
        stage_label(outcome.to),
        outcome.created_task_ids.len()
    );
    Ok(())
}

fn set_status(ctx: &mut Context, args: &CertSetStatusArgs) -> Result<()> {
    let id = resolve_request_id(ctx, &args.id)?;
    ctx.store.override_certification_status(&id, args.stage)?;
    println!("Set {} to {}.", args.id, stage_label(args.stage));
    Ok(())
}

fn remove_certification(ctx: &mut Context, args: &CertTargetArgs) -> Result<()> {
    let id = resolve_request_id(ctx, &args.id)?;
    let removed = ctx.store.remove_certification(&id)?;
    println!("Removed {} ({}).", removed.darp_key, removed.project_name);
    Ok(())
}

fn summary(ctx: &mut Context, args: &CertSummaryArgs) -> Result<()> {
    let types = ctx.certification_types();
    let requests = ctx.store.list_certifications()?;
    let summary = summarize_by_stage(&requests, &types);
    if args.json {
        return print_json(&summary);
    }

    print!("{:<20} {:>5}", "Stage", "Total");
    for kind in &types {
        print!(" {:>8}", kind);
    }
    println!();
    for entry in &summary {
        print!("{:<20} {:>5}", stage_label(entry.stage), entry.total);
        for kind in &types {
            print!(" {:>8}", entry.by_type.get(kind).copied().unwrap_or_default());
        }
        println!();
    }
    println!("{:<20} {:>5}", "All", requests.len());
    Ok(())
}

fn record_issue(ctx: &mut Context, args: &CertIssueArgs) -> Result<()> {
    let id = resolve_request_id(ctx, &args.id)?;
    let mut request = ctx.store.get_certification(&id)?;
    if args.clear {
        let cleared = request.issues.len();
        request.issues.clear();
        ctx.store.replace_certification(request)?;
        println!("Cleared {cleared} issue(s) on {}.", args.id);
        return Ok(());
    }

    let title = args.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        bail!("Issue title cannot be empty");
    }
    request.issues.push(CertificationIssue {
        title: title.to_string(),
        description: args.description.clone(),
        kind: args.kind,
    });
    ctx.store.replace_certification(request)?;
    println!("Recorded {} issue on {}.", args.kind, args.id);
    Ok(())
}

pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}
