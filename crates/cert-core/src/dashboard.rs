//! Custom dashboards: a titled grid of widgets, unrelated to certification data.

use crate::new_id;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_WIDGET_WIDTH: u32 = 6;
pub const DEFAULT_WIDGET_HEIGHT: u32 = 4;
pub const GRID_COLUMNS: u32 = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("widget {0} not found")]
    WidgetNotFound(String),
    #[error("widget does not fit the {GRID_COLUMNS}-column grid (x={x}, width={width})")]
    OutOfGrid { x: u32, width: u32 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DashboardKind {
    Empty,
    Default,
    Custom,
}

impl DashboardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DashboardKind::Empty => "empty",
            DashboardKind::Default => "default",
            DashboardKind::Custom => "custom",
        }
    }
}

impl fmt::Display for DashboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DashboardKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "empty" => Ok(DashboardKind::Empty),
            "default" => Ok(DashboardKind::Default),
            "custom" => Ok(DashboardKind::Custom),
            other => Err(format!("Unknown dashboard type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Activity,
    Chart,
    Tasks,
    Custom,
}

impl WidgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::Activity => "activity",
            WidgetKind::Chart => "chart",
            WidgetKind::Tasks => "tasks",
            WidgetKind::Custom => "custom",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "activity" => Ok(WidgetKind::Activity),
            "chart" => Ok(WidgetKind::Chart),
            "tasks" => Ok(WidgetKind::Tasks),
            "custom" => Ok(WidgetKind::Custom),
            other => Err(format!("Unknown widget type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "line" => Ok(ChartKind::Line),
            "bar" => Ok(ChartKind::Bar),
            "pie" => Ok(ChartKind::Pie),
            other => Err(format!("Unknown chart type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    List,
    Board,
    Timeline,
}

impl FromStr for ViewKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "list" => Ok(ViewKind::List),
            "board" => Ok(ViewKind::Board),
            "timeline" => Ok(ViewKind::Timeline),
            other => Err(format!("Unknown view type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<ChartKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_type: Option<ViewKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardLayout {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    pub title: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<WidgetConfig>,
}

impl DashboardLayout {
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: DashboardKind,
    #[serde(default)]
    pub shared_with: Vec<String>,
    #[serde(default)]
    pub layout: Vec<DashboardLayout>,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: String,
}

pub struct WidgetSpec {
    pub kind: WidgetKind,
    pub title: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub config: Option<WidgetConfig>,
}

impl Dashboard {
    pub fn new(
        title: &str,
        description: Option<String>,
        kind: DashboardKind,
        created_by: &str,
        now: &str,
    ) -> Self {
        Self {
            id: new_id(),
            title: title.to_string(),
            description,
            kind,
            shared_with: Vec::new(),
            layout: Vec::new(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
            created_by: created_by.to_string(),
        }
    }

    /// Row just below the lowest widget.
    pub fn next_free_row(&self) -> u32 {
        self.layout.iter().map(DashboardLayout::bottom).max().unwrap_or(0)
    }

    pub fn widget(&self, id: &str) -> Option<&DashboardLayout> {
        self.layout.iter().find(|widget| widget.id == id)
    }

    pub fn add_widget(&mut self, spec: WidgetSpec, now: &str) -> Result<&DashboardLayout, LayoutError> {
        let width = spec.width.unwrap_or(DEFAULT_WIDGET_WIDTH).max(1);
        let height = spec.height.unwrap_or(DEFAULT_WIDGET_HEIGHT).max(1);
        check_grid(0, width)?;
        let widget = DashboardLayout {
            id: new_id(),
            kind: spec.kind,
            title: spec.title,
            x: 0,
            y: self.next_free_row(),
            width,
            height,
            config: spec.config,
        };
        self.layout.push(widget);
        self.updated_at = now.to_string();
        Ok(&self.layout[self.layout.len() - 1])
    }

    pub fn remove_widget(&mut self, id: &str, now: &str) -> Result<DashboardLayout, LayoutError> {
        let idx = self
            .layout
            .iter()
            .position(|widget| widget.id == id)
            .ok_or_else(|| LayoutError::WidgetNotFound(id.to_string()))?;
        self.updated_at = now.to_string();
        Ok(self.layout.remove(idx))
    }

    /// Applies a layout change from the grid: position and size of one widget.
    pub fn place_widget(
        &mut self,
        id: &str,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        now: &str,
    ) -> Result<(), LayoutError> {
        let width = width.max(1);
        check_grid(x, width)?;
        let widget = self
            .layout
            .iter_mut()
            .find(|widget| widget.id == id)
            .ok_or_else(|| LayoutError::WidgetNotFound(id.to_string()))?;
        widget.x = x;
        widget.y = y;
        widget.width = width;
        widget.height = height.max(1);
        self.updated_at = now.to_string();
        Ok(())
    }

    /// Returns false when the user was already on the list.
    pub fn share_with(&mut self, user: &str, now: &str) -> bool {
        let user = user.trim();
        if user.is_empty() || self.shared_with.iter().any(|existing| existing == user) {
            return false;
        }
        self.shared_with.push(user.to_string());
        self.updated_at = now.to_string();
        true
    }

    pub fn unshare(&mut self, user: &str, now: &str) -> bool {
        let before = self.shared_with.len();
        self.shared_with.retain(|existing| existing != user.trim());
        let changed = self.shared_with.len() != before;
        if changed {
            self.updated_at = now.to_string();
        }
        changed
    }
}

fn check_grid(x: u32, width: u32) -> Result<(), LayoutError> {
    if x.saturating_add(width) > GRID_COLUMNS {
        return Err(LayoutError::OutOfGrid { x, width });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2026-02-23T14:00:00.000Z";

    fn spec(kind: WidgetKind, height: Option<u32>) -> WidgetSpec {
        WidgetSpec {
            kind,
            title: format!("{kind} widget"),
            width: None,
            height,
            config: None,
        }
    }

    #[test]
    fn new_widgets_stack_below_lowest_widget() {
        let mut dashboard = Dashboard::new("Ops", None, DashboardKind::Custom, "alex", "t0");
        let first = dashboard
            .add_widget(spec(WidgetKind::Activity, None), NOW)
            .expect("add")
            .clone();
        assert_eq!((first.x, first.y, first.width, first.height), (0, 0, 6, 4));

        let second = dashboard
            .add_widget(spec(WidgetKind::Chart, Some(2)), NOW)
            .expect("add")
            .clone();
        assert_eq!(second.y, 4);

        dashboard
            .place_widget(&first.id, 6, 10, 6, 3, NOW)
            .expect("move");
        let third = dashboard
            .add_widget(spec(WidgetKind::Tasks, None), NOW)
            .expect("add");
        assert_eq!(third.y, 13);
        assert_eq!(dashboard.updated_at, NOW);
    }

    #[test]
    fn placement_stays_inside_grid() {
        let mut dashboard = Dashboard::new("Ops", None, DashboardKind::Custom, "alex", "t0");
        let id = dashboard
            .add_widget(spec(WidgetKind::Activity, None), NOW)
            .expect("add")
            .id
            .clone();
        assert_eq!(
            dashboard.place_widget(&id, 8, 0, 6, 4, NOW),
            Err(LayoutError::OutOfGrid { x: 8, width: 6 })
        );
        assert_eq!(
            dashboard.remove_widget("nope", NOW),
            Err(LayoutError::WidgetNotFound("nope".to_string()))
        );
        assert!(dashboard.remove_widget(&id, NOW).is_ok());
        assert_eq!(dashboard.next_free_row(), 0);
    }

    #[test]
    fn zero_width_cannot_land_past_last_column() {
        let mut dashboard = Dashboard::new("Ops", None, DashboardKind::Custom, "alex", "t0");
        let id = dashboard
            .add_widget(spec(WidgetKind::Chart, None), NOW)
            .expect("add")
            .id
            .clone();
        assert_eq!(
            dashboard.place_widget(&id, 12, 0, 0, 4, NOW),
            Err(LayoutError::OutOfGrid { x: 12, width: 1 })
        );
        dashboard
            .place_widget(&id, 11, 0, 0, 0, NOW)
            .expect("last column");
        let widget = dashboard.widget(&id).expect("widget");
        assert_eq!((widget.x, widget.width, widget.height), (11, 1, 1));
        assert!(widget.x + widget.width <= GRID_COLUMNS);
    }

    #[test]
    fn sharing_ignores_duplicates() {
        let mut dashboard = Dashboard::new("Ops", None, DashboardKind::Empty, "alex", "t0");
        assert!(dashboard.share_with("sam", NOW));
        assert!(!dashboard.share_with("sam", NOW));
        assert!(!dashboard.share_with("  ", NOW));
        assert_eq!(dashboard.shared_with, vec!["sam".to_string()]);
        assert!(dashboard.unshare("sam", NOW));
        assert!(!dashboard.unshare("sam", NOW));
    }
}
