use crate::cert::{resolve_request_id, short_id};
use crate::context::Context;
use crate::output::{print_json, truncate};
use anyhow::{anyhow, bail, Context as _, Result};
use cert_core::lifecycle::{self, stage_label, AttachmentInput};
use cert_core::{
    new_id, now_timestamp, CertificationRequest, CertificationStage, CertificationTask,
    TaskPriority, TaskStatus,
};
use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};
use std::path::Path;

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum TaskCommand {
    List(TaskListArgs),
    Show(TaskShowArgs),
    Add(TaskAddArgs),
    #[command(alias = "set-status")]
    Status(TaskStatusArgs),
    /// Move a task one board column left or right
    Move(TaskMoveArgs),
    /// Set the priority, or cycle it when none is given
    Priority(TaskPriorityArgs),
    Assign(TaskAssignArgs),
    Due(TaskDueArgs),
    /// Log minutes against a task
    Time(TaskTimeArgs),
    Comment(TaskCommentArgs),
    Attach(TaskAttachArgs),
    #[command(alias = "rm")]
    Remove(TaskTargetArgs),
}

#[derive(Args, Debug)]
pub struct TaskListArgs {
    /// Request id or DARP key
    pub cert: String,
    #[arg(long)]
    pub stage: Option<CertificationStage>,
    #[arg(long)]
    pub status: Option<TaskStatus>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TaskShowArgs {
    pub cert: String,
    /// Task id or unique id prefix
    pub task: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TaskAddArgs {
    pub cert: String,
    pub name: String,
    #[arg(long, alias = "desc")]
    pub description: Option<String>,
    #[arg(long)]
    pub priority: Option<TaskPriority>,
    #[arg(long = "label", value_delimiter = ',')]
    pub labels: Vec<String>,
    /// Defaults to the request's current stage
    #[arg(long)]
    pub stage: Option<CertificationStage>,
    #[arg(long)]
    pub assignee: Option<String>,
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args, Debug)]
pub struct TaskTargetArgs {
    pub cert: String,
    pub task: String,
}

#[derive(Args, Debug)]
pub struct TaskStatusArgs {
    pub cert: String,
    pub task: String,
    pub status: TaskStatus,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Direction {
    Left,
    Right,
}

#[derive(Args, Debug)]
pub struct TaskMoveArgs {
    pub cert: String,
    pub task: String,
    #[arg(value_enum)]
    pub direction: Direction,
}

#[derive(Args, Debug)]
pub struct TaskPriorityArgs {
    pub cert: String,
    pub task: String,
    pub priority: Option<TaskPriority>,
}

#[derive(Args, Debug)]
pub struct TaskAssignArgs {
    pub cert: String,
    pub task: String,
    #[arg(required_unless_present = "clear")]
    pub assignee: Option<String>,
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args, Debug)]
pub struct TaskDueArgs {
    pub cert: String,
    pub task: String,
    /// YYYY-MM-DD
    #[arg(required_unless_present = "clear")]
    pub date: Option<String>,
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args, Debug)]
pub struct TaskTimeArgs {
    pub cert: String,
    pub task: String,
    pub minutes: u32,
    /// Replace the logged total instead of adding to it
    #[arg(long)]
    pub set: bool,
}

#[derive(Args, Debug)]
pub struct TaskCommentArgs {
    pub cert: String,
    pub task: String,
    pub content: String,
}

#[derive(Args, Debug)]
pub struct TaskAttachArgs {
    pub cert: String,
    pub task: String,
    /// Local path or URL
    pub location: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long = "type")]
    pub mime_type: Option<String>,
}

pub fn handle_task_command(ctx: &mut Context, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::List(args) => list_tasks(ctx, &args),
        TaskCommand::Show(args) => show_task(ctx, &args),
        TaskCommand::Add(args) => add_task(ctx, args),
        TaskCommand::Status(args) => {
            let status = args.status;
            edit_task(ctx, &args.cert, &args.task, |task| {
                task.status = status;
                Ok(format!("status {}", status.title()))
            })
        }
        TaskCommand::Move(args) => move_task(ctx, &args),
        TaskCommand::Priority(args) => {
            let explicit = args.priority;
            edit_task(ctx, &args.cert, &args.task, |task| {
                task.priority = explicit.unwrap_or_else(|| task.priority.cycle());
                Ok(format!("priority {}", task.priority))
            })
        }
        TaskCommand::Assign(args) => {
            let assignee = if args.clear { None } else { args.assignee.clone() };
            edit_task(ctx, &args.cert, &args.task, |task| {
                task.assignee = assignee.filter(|value| !value.trim().is_empty());
                Ok(match &task.assignee {
                    Some(who) => format!("assignee {who}"),
                    None => "no assignee".to_string(),
                })
            })
        }
        TaskCommand::Due(args) => {
            let due = if args.clear {
                None
            } else {
                args.date.as_deref().map(parse_due_date).transpose()?
            };
            edit_task(ctx, &args.cert, &args.task, |task| {
                task.due_date = due;
                Ok(match &task.due_date {
                    Some(date) => format!("due {date}"),
                    None => "no due date".to_string(),
                })
            })
        }
        TaskCommand::Time(args) => {
            let (minutes, set) = (args.minutes, args.set);
            edit_task(ctx, &args.cert, &args.task, |task| {
                let total = if set {
                    minutes
                } else {
                    task.time_spent.unwrap_or_default().saturating_add(minutes)
                };
                task.time_spent = Some(total);
                Ok(format!("{total} minute(s) logged"))
            })
        }
        TaskCommand::Comment(args) => comment_task(ctx, &args),
        TaskCommand::Attach(args) => attach_file(ctx, &args),
        TaskCommand::Remove(args) => remove_task(ctx, &args),
    }
}

/// Matches a full task id, or a prefix shared by exactly one task.
pub fn resolve_task_id(request: &CertificationRequest, key: &str) -> Result<String> {
    if let Some(task) = request.find_task(key) {
        return Ok(task.id.clone());
    }
    let matches: Vec<&CertificationTask> = request
        .tasks
        .iter()
        .filter(|task| task.id.starts_with(key))
        .collect();
    match matches.as_slice() {
        [task] => Ok(task.id.clone()),
        [] => Err(anyhow!("Task '{key}' not found on {}.", request.darp_key)),
        _ => bail!("Task id '{key}' is ambiguous ({} matches).", matches.len()),
    }
}

fn load_request(ctx: &mut Context, cert: &str) -> Result<CertificationRequest> {
    let id = resolve_request_id(ctx, cert)?;
    Ok(ctx.store.get_certification(&id)?)
}

/// Loads the task, applies `mutate`, and writes the whole task back.
fn edit_task(
    ctx: &mut Context,
    cert: &str,
    task_key: &str,
    mutate: impl FnOnce(&mut CertificationTask) -> Result<String>,
) -> Result<()> {
    let request = load_request(ctx, cert)?;
    let task_id = resolve_task_id(&request, task_key)?;
    let mut task = request
        .find_task(&task_id)
        .cloned()
        .ok_or_else(|| anyhow!("Task '{task_key}' not found."))?;
    let summary = mutate(&mut task)?;
    let name = task.name.clone();
    ctx.store.replace_task(&request.id, task)?;
    println!("Updated '{name}': {summary}.");
    Ok(())
}

fn parse_due_date(input: &str) -> Result<String> {
    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid due date '{input}', expected YYYY-MM-DD"))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

fn list_tasks(ctx: &mut Context, args: &TaskListArgs) -> Result<()> {
    let request = load_request(ctx, &args.cert)?;
    let tasks: Vec<&CertificationTask> = request
        .tasks
        .iter()
        .filter(|task| args.stage.map_or(true, |stage| task.stage == stage))
        .filter(|task| args.status.map_or(true, |status| task.status == status))
        .collect();
    if args.json {
        return print_json(&tasks);
    }
    if tasks.is_empty() {
        println!("No tasks on {}.", request.darp_key);
        return Ok(());
    }
    for status in TaskStatus::ALL {
        let column: Vec<_> = tasks.iter().filter(|task| task.status == status).collect();
        if column.is_empty() {
            continue;
        }
        println!("{} ({})", status.title(), column.len());
        for task in column {
            let mut line = format!(
                "  {} {} {} [{}]",
                task.priority.icon(),
                short_id(&task.id),
                truncate(&task.name, 48),
                stage_label(task.stage)
            );
            if !task.labels.is_empty() {
                line.push_str(&format!(" #{}", task.labels.join(" #")));
            }
            if let Some(assignee) = &task.assignee {
                line.push_str(&format!(" @{assignee}"));
            }
            if let Some(due) = &task.due_date {
                line.push_str(&format!(" due {due}"));
            }
            println!("{line}");
        }
    }
    Ok(())
}

fn show_task(ctx: &mut Context, args: &TaskShowArgs) -> Result<()> {
    let request = load_request(ctx, &args.cert)?;
    let task_id = resolve_task_id(&request, &args.task)?;
    let task = request
        .find_task(&task_id)
        .ok_or_else(|| anyhow!("Task '{}' not found.", args.task))?;
    if args.json {
        return print_json(task);
    }

    println!("{} {}", task.priority.icon(), task.name);
    println!("  id:       {}", task.id);
    println!("  status:   {}", task.status.title());
    println!("  priority: {}", task.priority);
    println!("  stage:    {}", stage_label(task.stage));
    if let Some(description) = &task.description {
        println!("  about:    {description}");
    }
    if !task.labels.is_empty() {
        println!("  labels:   {}", task.labels.join(", "));
    }
    if let Some(assignee) = &task.assignee {
        println!("  assignee: {assignee}");
    }
    if let Some(due) = &task.due_date {
        println!("  due:      {due}");
    }
    if let Some(minutes) = task.time_spent {
        println!("  logged:   {minutes} min");
    }
    if !task.attachments.is_empty() {
        println!("\nAttachments");
        for attachment in &task.attachments {
            println!(
                "  {} ({}, {} bytes) {} by {}",
                attachment.name,
                attachment.mime_type,
                attachment.size,
                attachment.url,
                attachment.uploaded_by
            );
        }
    }
    if !task.comments.is_empty() {
        println!("\nComments");
        for comment in &task.comments {
            println!("  {} {}: {}", comment.created_at, comment.created_by, comment.content);
        }
    }
    Ok(())
}

fn add_task(ctx: &mut Context, args: TaskAddArgs) -> Result<()> {
    let mut request = load_request(ctx, &args.cert)?;
    let name = args.name.trim().to_string();
    if name.is_empty() {
        bail!("Task name cannot be empty");
    }
    let due_date = args.due.as_deref().map(parse_due_date).transpose()?;
    let task = CertificationTask {
        id: new_id(),
        name,
        description: args.description,
        status: TaskStatus::Todo,
        priority: args.priority.unwrap_or_default(),
        labels: args
            .labels
            .into_iter()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect(),
        stage: args.stage.unwrap_or(request.status),
        attachments: Vec::new(),
        comments: Vec::new(),
        assignee: args.assignee,
        due_date,
        time_spent: None,
        extra: Default::default(),
    };
    let id = task.id.clone();
    request.tasks.push(task);
    request.last_updated = now_timestamp();
    ctx.store.replace_certification(request)?;
    println!("Added task [{}] to {}.", short_id(&id), args.cert);
    Ok(())
}

fn move_task(ctx: &mut Context, args: &TaskMoveArgs) -> Result<()> {
    let direction = args.direction;
    edit_task(ctx, &args.cert, &args.task, |task| {
        let target = match direction {
            Direction::Left => task.status.previous(),
            Direction::Right => task.status.next(),
        }
        .ok_or_else(|| anyhow!("'{}' is already in the {} column.", task.name, task.status.title()))?;
        task.status = target;
        Ok(format!("moved to {}", target.title()))
    })
}

fn comment_task(ctx: &mut Context, args: &TaskCommentArgs) -> Result<()> {
    if args.content.trim().is_empty() {
        bail!("Comment cannot be empty");
    }
    let author = ctx.user();
    let mut request = load_request(ctx, &args.cert)?;
    let task_id = resolve_task_id(&request, &args.task)?;
    lifecycle::add_comment(&mut request, &task_id, args.content.trim(), &author, &now_timestamp())?;
    ctx.store.replace_certification(request)?;
    println!("Comment added by {author}.");
    Ok(())
}

fn attach_file(ctx: &mut Context, args: &TaskAttachArgs) -> Result<()> {
    let author = ctx.user();
    let mut request = load_request(ctx, &args.cert)?;
    let task_id = resolve_task_id(&request, &args.task)?;

    let local = Path::new(&args.location);
    let size = if local.exists() {
        local
            .metadata()
            .with_context(|| format!("Failed to stat {}", local.display()))?
            .len()
    } else {
        0
    };
    let name = args.name.clone().unwrap_or_else(|| attachment_name(&args.location));
    let mime_type = args
        .mime_type
        .clone()
        .unwrap_or_else(|| guess_mime_type(&args.location).to_string());

    let attachment = lifecycle::add_attachment(
        &mut request,
        &task_id,
        AttachmentInput {
            name: &name,
            url: &args.location,
            size,
            mime_type: &mime_type,
        },
        &author,
        &now_timestamp(),
    )?;
    ctx.store.replace_certification(request)?;
    println!("Attached {} ({} bytes).", attachment.name, attachment.size);
    Ok(())
}

fn remove_task(ctx: &mut Context, args: &TaskTargetArgs) -> Result<()> {
    let mut request = load_request(ctx, &args.cert)?;
    let task_id = resolve_task_id(&request, &args.task)?;
    let removed = lifecycle::remove_task(&mut request, &task_id, &now_timestamp())?;
    ctx.store.replace_certification(request)?;
    println!("Removed task '{}'.", removed.name);
    Ok(())
}

fn attachment_name(location: &str) -> String {
    location
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(location)
        .to_string()
}

fn guess_mime_type(location: &str) -> &'static str {
    let extension = location
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" | "log" => "text/plain",
        "csv" => "text/csv",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "zip" => "application/zip",
        "doc" | "docx" => "application/msword",
        "xls" | "xlsx" => "application/vnd.ms-excel",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cert_core::catalog::seed_certifications;

    #[test]
    fn task_ids_resolve_by_unique_prefix() {
        let mut request = seed_certifications().remove(0);
        request.tasks[0].id = "abc-111".to_string();
        request.tasks[1].id = "abc-222".to_string();
        request.tasks[2].id = "xyz-333".to_string();
        assert_eq!(resolve_task_id(&request, "xyz").expect("prefix"), "xyz-333");
        assert_eq!(resolve_task_id(&request, "abc-222").expect("exact"), "abc-222");
        assert!(resolve_task_id(&request, "abc").is_err());
        assert!(resolve_task_id(&request, "nope").is_err());
    }

    #[test]
    fn due_dates_are_normalized() {
        assert_eq!(parse_due_date(" 2026-03-01 ").expect("date"), "2026-03-01");
        assert!(parse_due_date("03/01/2026").is_err());
    }

    #[test]
    fn attachment_metadata_from_location() {
        assert_eq!(attachment_name("docs/specs/cert-plan.pdf"), "cert-plan.pdf");
        assert_eq!(attachment_name("https://example.com/report.csv"), "report.csv");
        assert_eq!(guess_mime_type("cert-plan.PDF"), "application/pdf");
        assert_eq!(guess_mime_type("no-extension"), "application/octet-stream");
    }
}
