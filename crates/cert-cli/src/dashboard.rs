use crate::context::Context;
use crate::output::{print_json, truncate};
use anyhow::Result;
use cert_core::dashboard::{
    ChartKind, Dashboard, DashboardKind, DashboardLayout, ViewKind, WidgetConfig, WidgetKind,
    WidgetSpec,
};
use cert_core::widgets::{activity, stage_series, task_feed};
use cert_core::CertificationRequest;
use clap::{Args, Subcommand};

const FEED_PREVIEW: usize = 5;

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum DashboardCommand {
    List(DashboardListArgs),
    /// Show a dashboard with the data behind each widget
    Show(DashboardShowArgs),
    #[command(alias = "create")]
    New(DashboardNewArgs),
    /// Change title or description
    Rename(DashboardRenameArgs),
    #[command(alias = "rm")]
    Remove(DashboardTargetArgs),
    Share(DashboardShareArgs),
    Unshare(DashboardShareArgs),
    Widget {
        #[command(subcommand)]
        action: WidgetCommand,
    },
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum WidgetCommand {
    Add(WidgetAddArgs),
    #[command(alias = "rm")]
    Remove(WidgetTargetArgs),
    /// Change position and size on the 12-column grid
    Move(WidgetMoveArgs),
}

#[derive(Args, Debug)]
pub struct DashboardListArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DashboardShowArgs {
    pub id: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DashboardNewArgs {
    pub title: String,
    #[arg(long, alias = "desc")]
    pub description: Option<String>,
    #[arg(long = "type", default_value = "custom")]
    pub kind: DashboardKind,
}

#[derive(Args, Debug)]
pub struct DashboardRenameArgs {
    pub id: String,
    pub title: String,
    #[arg(long, alias = "desc")]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct DashboardTargetArgs {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct DashboardShareArgs {
    pub id: String,
    pub user: String,
}

#[derive(Args, Debug)]
pub struct WidgetAddArgs {
    pub dashboard: String,
    /// activity, chart, tasks or custom
    pub kind: WidgetKind,
    pub title: String,
    #[arg(long)]
    pub width: Option<u32>,
    #[arg(long)]
    pub height: Option<u32>,
    #[arg(long)]
    pub chart: Option<ChartKind>,
    #[arg(long)]
    pub view: Option<ViewKind>,
    #[arg(long)]
    pub data_source: Option<String>,
    #[arg(long)]
    pub show_completed: bool,
    #[arg(long)]
    pub sort_by: Option<String>,
    #[arg(long)]
    pub group_by: Option<String>,
}

#[derive(Args, Debug)]
pub struct WidgetTargetArgs {
    pub dashboard: String,
    pub widget: String,
}

#[derive(Args, Debug)]
pub struct WidgetMoveArgs {
    pub dashboard: String,
    pub widget: String,
    pub x: u32,
    pub y: u32,
    #[arg(long)]
    pub width: Option<u32>,
    #[arg(long)]
    pub height: Option<u32>,
}

pub fn handle_dashboard_command(ctx: &mut Context, command: DashboardCommand) -> Result<()> {
    match command {
        DashboardCommand::List(args) => list_dashboards(ctx, &args),
        DashboardCommand::Show(args) => show_dashboard(ctx, &args),
        DashboardCommand::New(args) => new_dashboard(ctx, args),
        DashboardCommand::Rename(args) => {
            let title = args.title.trim();
            if title.is_empty() {
                anyhow::bail!("Dashboard title cannot be empty");
            }
            let mut dashboard = ctx.store.get_dashboard(&args.id)?;
            dashboard.title = title.to_string();
            if args.description.is_some() {
                dashboard.description = args.description;
            }
            ctx.store.replace_dashboard(dashboard)?;
            println!("Renamed dashboard to '{title}'.");
            Ok(())
        }
        DashboardCommand::Remove(args) => {
            let removed = ctx.store.remove_dashboard(&args.id)?;
            println!("Removed dashboard '{}'.", removed.title);
            Ok(())
        }
        DashboardCommand::Share(args) => {
            if ctx.store.share_dashboard(&args.id, &args.user)? {
                println!("Shared with {}.", args.user.trim());
            } else {
                println!("Already shared with {}.", args.user.trim());
            }
            Ok(())
        }
        DashboardCommand::Unshare(args) => {
            if ctx.store.unshare_dashboard(&args.id, &args.user)? {
                println!("No longer shared with {}.", args.user.trim());
            } else {
                println!("Was not shared with {}.", args.user.trim());
            }
            Ok(())
        }
        DashboardCommand::Widget { action } => match action {
            WidgetCommand::Add(args) => add_widget(ctx, args),
            WidgetCommand::Remove(args) => {
                let removed = ctx.store.remove_widget(&args.dashboard, &args.widget)?;
                println!("Removed widget '{}'.", removed.title);
                Ok(())
            }
            WidgetCommand::Move(args) => move_widget(ctx, &args),
        },
    }
}

fn list_dashboards(ctx: &mut Context, args: &DashboardListArgs) -> Result<()> {
    let dashboards = ctx.store.list_dashboards()?;
    if args.json {
        return print_json(&dashboards);
    }
    for dashboard in &dashboards {
        let shared = if dashboard.shared_with.is_empty() {
            String::new()
        } else {
            format!(", shared with {}", dashboard.shared_with.join(", "))
        };
        println!(
            "- {} {} [{}] {} widget(s){shared}",
            dashboard.id,
            dashboard.title,
            dashboard.kind,
            dashboard.layout.len()
        );
    }
    Ok(())
}

fn show_dashboard(ctx: &mut Context, args: &DashboardShowArgs) -> Result<()> {
    let dashboard = ctx.store.get_dashboard(&args.id)?;
    if args.json {
        return print_json(&dashboard);
    }
    let requests = ctx.store.list_certifications()?;

    println!("{} [{}]", dashboard.title, dashboard.kind);
    if let Some(description) = &dashboard.description {
        println!("  {description}");
    }
    println!("  created by {} at {}", dashboard.created_by, dashboard.created_at);
    if dashboard.layout.is_empty() {
        println!("\nNo widgets yet. Add one with `certdash dashboard widget add`.");
        return Ok(());
    }

    let mut widgets: Vec<&DashboardLayout> = dashboard.layout.iter().collect();
    widgets.sort_by_key(|widget| (widget.y, widget.x));
    for widget in widgets {
        println!(
            "\n{} ({}) at {},{} size {}x{} [{}]",
            widget.title, widget.kind, widget.x, widget.y, widget.width, widget.height, widget.id
        );
        render_widget(widget, &requests);
    }
    Ok(())
}

fn render_widget(widget: &DashboardLayout, requests: &[CertificationRequest]) {
    match widget.kind {
        WidgetKind::Tasks => {
            let feed = task_feed(requests, widget.config.as_ref());
            for item in feed.iter().take(FEED_PREVIEW) {
                println!(
                    "  {} {} [{}] {}",
                    item.task.priority.icon(),
                    item.darp_key,
                    item.task.status.title(),
                    truncate(&item.task.name, 48)
                );
            }
            if feed.len() > FEED_PREVIEW {
                println!("  … {} more", feed.len() - FEED_PREVIEW);
            }
        }
        WidgetKind::Chart => {
            let series = stage_series(requests);
            let peak = series.iter().map(|point| point.value).max().unwrap_or(0).max(1);
            for point in series {
                let bar = "█".repeat(point.value * 20 / peak);
                println!("  {:<18} {:>3} {bar}", point.label, point.value);
            }
        }
        WidgetKind::Activity => {
            let entries = activity(requests, Some(FEED_PREVIEW));
            if entries.is_empty() {
                println!("  No recent activity.");
            }
            for entry in entries {
                println!(
                    "  {} {} on {} ({}): {}",
                    entry.comment.created_at,
                    entry.comment.created_by,
                    entry.darp_key,
                    truncate(entry.task_name, 32),
                    truncate(&entry.comment.content, 60)
                );
            }
        }
        WidgetKind::Custom => {
            let source = widget
                .config
                .as_ref()
                .and_then(|config| config.data_source.as_deref())
                .unwrap_or("none");
            println!("  custom widget, data source: {source}");
        }
    }
}

fn new_dashboard(ctx: &mut Context, args: DashboardNewArgs) -> Result<()> {
    let user = ctx.user();
    let dashboard: Dashboard = ctx.store.create_dashboard(
        args.title.trim(),
        args.description,
        args.kind,
        &user,
    )?;
    println!("Created dashboard '{}' [{}].", dashboard.title, dashboard.id);
    Ok(())
}

fn add_widget(ctx: &mut Context, args: WidgetAddArgs) -> Result<()> {
    let config = WidgetConfig {
        chart_type: args.chart,
        data_source: args.data_source,
        filters: None,
        view_type: args.view,
        show_completed: args.show_completed.then_some(true),
        sort_by: args.sort_by,
        group_by: args.group_by,
    };
    let config = (config != WidgetConfig::default()).then_some(config);
    let widget = ctx.store.add_widget(
        &args.dashboard,
        WidgetSpec {
            kind: args.kind,
            title: args.title,
            width: args.width,
            height: args.height,
            config,
        },
    )?;
    println!(
        "Added {} widget [{}] at {},{}.",
        widget.kind, widget.id, widget.x, widget.y
    );
    Ok(())
}

fn move_widget(ctx: &mut Context, args: &WidgetMoveArgs) -> Result<()> {
    let dashboard = ctx.store.get_dashboard(&args.dashboard)?;
    let current = dashboard
        .widget(&args.widget)
        .ok_or_else(|| anyhow::anyhow!("Widget '{}' not found.", args.widget))?;
    let width = args.width.unwrap_or(current.width);
    let height = args.height.unwrap_or(current.height);
    ctx.store
        .place_widget(&args.dashboard, &args.widget, (args.x, args.y, width, height))?;
    println!("Moved widget to {},{} size {width}x{height}.", args.x, args.y);
    Ok(())
}
