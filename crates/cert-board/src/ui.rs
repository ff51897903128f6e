use crate::state::{App, COLUMNS};
use crate::theme::{self, icons};
use cert_core::lifecycle::{progress_percent, stage_label, stage_tone, task_status_tone};
use cert_core::{CertificationRequest, CertificationTask, TaskStatus};
use cert_storage::KeyValueStore;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

pub fn render<B: KeyValueStore>(f: &mut Frame, app: &App<B>) {
    let area = f.size();

    let Some(request) = &app.request else {
        render_empty(f, app, area);
        return;
    };

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);
    render_header(f, request, outer[0]);

    if app.show_help || app.show_detail {
        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(outer[1]);
        render_board(f, app, main[0]);
        if app.show_help {
            render_help(f, main[1]);
        } else {
            render_details(f, app, main[1]);
        }
    } else {
        render_board(f, app, outer[1]);
    }
}

fn render_empty<B: KeyValueStore>(f: &mut Frame, app: &App<B>, area: Rect) {
    let message = app
        .last_error
        .clone()
        .unwrap_or_else(|| "No certification loaded".to_string());

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Tasks")
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let text = vec![
        Line::from(Span::styled(message, Color::Yellow)),
        Line::from(""),
        Line::from("Press r to retry, q to quit."),
    ];
    let p = Paragraph::new(text).wrap(Wrap { trim: true });
    f.render_widget(p, inner);
}

fn render_header(f: &mut Frame, request: &CertificationRequest, area: Rect) {
    let block = Block::default().borders(Borders::BOTTOM);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let stage = Span::styled(
        format!(" {} ", stage_label(request.status)),
        Style::default()
            .fg(Color::Black)
            .bg(theme::tone_color(stage_tone(request.status))),
    );
    let lines = vec![
        Line::from(vec![
            Span::styled(format!("{} ", request.darp_key), theme::HEADER_STYLE),
            Span::raw(format!("{} ", request.project_name)),
            stage,
        ]),
        Line::from(vec![
            Span::styled(
                format!("{} | target {}", request.kind, request.target_date),
                Style::default().fg(theme::MUTED),
            ),
            Span::raw(format!("  {}% done", progress_percent(request))),
        ]),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

fn render_board<B: KeyValueStore>(f: &mut Frame, app: &App<B>, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, COLUMNS as u32); COLUMNS])
        .split(area);

    for (idx, status) in TaskStatus::ALL.iter().enumerate() {
        let tasks = app.column_tasks(idx);
        let focused = idx == app.column;
        let tone = theme::tone_color(task_status_tone(*status));
        let mut border_style = Style::default().fg(tone);
        if focused {
            border_style = border_style.add_modifier(Modifier::BOLD);
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{} ({})", status.title(), tasks.len()))
            .border_style(border_style);

        let items: Vec<ListItem> = tasks
            .iter()
            .enumerate()
            .map(|(row, task)| card(task).style(theme::zebra_row_style(row)))
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(theme::SELECTED_STYLE);

        let mut state = ListState::default();
        if focused {
            state.select(app.selected_row(idx));
        }
        f.render_stateful_widget(list, columns[idx], &mut state);
    }
}

fn card(task: &CertificationTask) -> ListItem<'static> {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("{} ", task.priority.icon()),
            theme::tone_style(task.priority.tone()).add_modifier(Modifier::BOLD),
        ),
        Span::raw(task.name.clone()),
    ])];

    if !task.labels.is_empty() {
        lines.push(Line::from(Span::styled(
            task.labels.join(", "),
            Style::default().fg(theme::MUTED),
        )));
    }

    let mut meta = Vec::new();
    if let Some(assignee) = &task.assignee {
        meta.push(format!("{}{assignee}", icons::ASSIGNEE));
    }
    if let Some(due) = &task.due_date {
        meta.push(format!("{} {due}", icons::DUE));
    }
    if !task.comments.is_empty() {
        meta.push(format!("{} {}", icons::COMMENTS, task.comments.len()));
    }
    if !task.attachments.is_empty() {
        meta.push(format!("{} {}", icons::ATTACHMENTS, task.attachments.len()));
    }
    if !meta.is_empty() {
        lines.push(Line::from(Span::styled(
            meta.join("  "),
            Style::default().fg(Color::DarkGray),
        )));
    }
    ListItem::new(lines)
}

fn render_details<B: KeyValueStore>(f: &mut Frame, app: &App<B>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Details")
        .border_style(Style::default().fg(Color::Cyan));
    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let Some(task) = app.selected_task() else {
        f.render_widget(Paragraph::new("No task selected."), inner_area);
        return;
    };

    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let mut lines = vec![
        Line::from(Span::styled(
            task.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            label("Status: "),
            Span::styled(
                task.status.title(),
                theme::tone_style(task_status_tone(task.status)),
            ),
        ]),
        Line::from(vec![
            label("Priority: "),
            Span::styled(
                format!("{} {}", task.priority.icon(), task.priority),
                theme::tone_style(task.priority.tone()),
            ),
        ]),
        Line::from(vec![label("Stage: "), Span::raw(stage_label(task.stage))]),
    ];
    if !task.labels.is_empty() {
        lines.push(Line::from(vec![
            label("Labels: "),
            Span::raw(task.labels.join(", ")),
        ]));
    }
    if let Some(assignee) = &task.assignee {
        lines.push(Line::from(vec![label("Assignee: "), Span::raw(assignee.clone())]));
    }
    if let Some(due) = &task.due_date {
        lines.push(Line::from(vec![label("Due: "), Span::raw(due.clone())]));
    }
    if let Some(minutes) = task.time_spent.filter(|minutes| *minutes > 0) {
        lines.push(Line::from(vec![
            label("Time: "),
            Span::raw(format!("{}h {:02}m", minutes / 60, minutes % 60)),
        ]));
    }

    if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(Line::from(""));
        lines.push(Line::from(label("Description:")));
        lines.push(Line::from(description.to_string()));
    }

    if !task.comments.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(label("Comments:")));
        for comment in &task.comments {
            lines.push(Line::from(vec![
                Span::styled(format!("{} ", comment.created_by), theme::HEADER_STYLE),
                Span::styled(comment.created_at.clone(), Style::default().fg(theme::MUTED)),
            ]));
            lines.push(Line::from(format!("  {}", comment.content)));
        }
    }

    if !task.attachments.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(label("Attachments:")));
        for attachment in &task.attachments {
            lines.push(Line::from(format!(
                "  {} {} ({}, {} bytes)",
                icons::ATTACHMENTS,
                attachment.name,
                attachment.mime_type,
                attachment.size
            )));
        }
    }

    let p = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(p, inner_area);
}

fn render_help(f: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .border_style(Style::default().fg(Color::Yellow));
    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let bindings = [
        ("h l / Left Right", "Previous / next column"),
        ("j k / Down Up", "Next / previous card"),
        ("H L / < >", "Move card to adjacent column"),
        ("p", "Cycle priority"),
        ("x", "Toggle done"),
        ("Enter", "Toggle details pane"),
        ("r", "Reload from disk"),
        ("?", "Toggle help"),
        ("Esc", "Close pane"),
        ("q", "Quit"),
    ];
    let mut text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    text.extend(bindings.iter().map(|(keys, action)| {
        Line::from(vec![
            Span::styled(format!("{keys:<18}"), Color::Cyan),
            Span::raw(*action),
        ])
    }));
    let p = Paragraph::new(text).wrap(Wrap { trim: true });
    f.render_widget(p, inner_area);
}
