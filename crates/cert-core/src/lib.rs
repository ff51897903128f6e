use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub mod app_state;
pub mod catalog;
pub mod dashboard;
pub mod lifecycle;
pub mod widgets;

pub use lifecycle::Tone;

/// Certification types the portfolio summary breaks counts down by.
pub const CERTIFICATION_TYPES: [&str; 4] = ["DA IR", "DA MR", "DA EMR", "DA SMR"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificationStage {
    Forecast,
    Planning,
    Submitted,
    SubmissionReview,
    DeviceEntry,
    DeviceTesting,
    TaqReview,
    TaComplete,
    Closed,
}

impl CertificationStage {
    /// Every stage, in advancement order.
    pub const ALL: [CertificationStage; 9] = [
        CertificationStage::Forecast,
        CertificationStage::Planning,
        CertificationStage::Submitted,
        CertificationStage::SubmissionReview,
        CertificationStage::DeviceEntry,
        CertificationStage::DeviceTesting,
        CertificationStage::TaqReview,
        CertificationStage::TaComplete,
        CertificationStage::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CertificationStage::Forecast => "FORECAST",
            CertificationStage::Planning => "PLANNING",
            CertificationStage::Submitted => "SUBMITTED",
            CertificationStage::SubmissionReview => "SUBMISSION_REVIEW",
            CertificationStage::DeviceEntry => "DEVICE_ENTRY",
            CertificationStage::DeviceTesting => "DEVICE_TESTING",
            CertificationStage::TaqReview => "TAQ_REVIEW",
            CertificationStage::TaComplete => "TA_COMPLETE",
            CertificationStage::Closed => "CLOSED",
        }
    }

    pub fn position(&self) -> usize {
        CertificationStage::ALL
            .iter()
            .position(|stage| stage == self)
            .unwrap_or_default()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CertificationStage::Closed)
    }
}

impl Default for CertificationStage {
    fn default() -> Self {
        Self::Forecast
    }
}

impl fmt::Display for CertificationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificationStage {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_uppercase().replace(['-', ' '], "_");
        CertificationStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| format!("Unknown stage: {}", input.trim()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl TaskStatus {
    /// Board columns, left to right.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Review => "REVIEW",
            TaskStatus::Done => "DONE",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Review => "Review",
            TaskStatus::Done => "Done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }

    pub fn column(&self) -> usize {
        match self {
            TaskStatus::Todo => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Review => 2,
            TaskStatus::Done => 3,
        }
    }

    /// Column to the right, if any.
    pub fn next(&self) -> Option<TaskStatus> {
        TaskStatus::ALL.get(self.column() + 1).copied()
    }

    /// Column to the left, if any.
    pub fn previous(&self) -> Option<TaskStatus> {
        self.column()
            .checked_sub(1)
            .and_then(|idx| TaskStatus::ALL.get(idx).copied())
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "todo" | "to-do" | "to_do" => Ok(TaskStatus::Todo),
            "in-progress" | "in_progress" | "inprogress" => Ok(TaskStatus::InProgress),
            "review" => Ok(TaskStatus::Review),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }

    /// Sort rank, highest priority first.
    pub fn rank(&self) -> u8 {
        match self {
            TaskPriority::High => 0,
            TaskPriority::Medium => 1,
            TaskPriority::Low => 2,
        }
    }

    pub fn cycle(&self) -> TaskPriority {
        match self {
            TaskPriority::Low => TaskPriority::Medium,
            TaskPriority::Medium => TaskPriority::High,
            TaskPriority::High => TaskPriority::Low,
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "high" => Ok(TaskPriority::High),
            "medium" => Ok(TaskPriority::Medium),
            "low" => Ok(TaskPriority::Low),
            other => Err(format!("Unknown priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskAttachment {
    pub id: String,
    pub name: String,
    pub url: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub uploaded_at: String,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskComment {
    pub id: String,
    pub content: String,
    pub created_at: String,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CertificationTask {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub labels: Vec<String>,
    pub stage: CertificationStage,
    #[serde(default)]
    pub attachments: Vec<TaskAttachment>,
    #[serde(default)]
    pub comments: Vec<TaskComment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Minutes logged against the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<u32>,
    /// Fields this model does not know, kept so a rewrite never drops them.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Warning,
    Error,
    Info,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Warning => "warning",
            IssueKind::Error => "error",
            IssueKind::Info => "info",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "warning" | "warn" => Ok(IssueKind::Warning),
            "error" => Ok(IssueKind::Error),
            "info" => Ok(IssueKind::Info),
            other => Err(format!("Unknown issue type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificationIssue {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: IssueKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CertificationRequest {
    pub id: String,
    pub darp_key: String,
    pub project_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: CertificationStage,
    pub target_date: String,
    #[serde(default)]
    pub software_version: String,
    #[serde(default)]
    pub tasks: Vec<CertificationTask>,
    #[serde(default)]
    pub issues: Vec<CertificationIssue>,
    /// Id of the workflow the request was created from. Not owned.
    pub workflow: String,
    pub last_updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_completion_date: Option<String>,
    /// Tracker fields (sprint, story points, epic link, ...) passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl CertificationRequest {
    pub fn find_task(&self, id: &str) -> Option<&CertificationTask> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn find_task_mut(&mut self, id: &str) -> Option<&mut CertificationTask> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    pub fn tasks_in_stage(&self, stage: CertificationStage) -> impl Iterator<Item = &CertificationTask> {
        self.tasks.iter().filter(move |task| task.stage == stage)
    }

    /// Total minutes logged across all tasks.
    pub fn time_spent(&self) -> u32 {
        self.tasks.iter().filter_map(|task| task.time_spent).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTask {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowStage {
    pub id: String,
    pub name: CertificationStage,
    #[serde(default)]
    pub tasks: Vec<WorkflowTask>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Draft,
    Active,
    Archived,
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::Active => "active",
            WorkflowStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("workflow '{workflow}' defines stage {stage} more than once")]
    DuplicateStage {
        workflow: String,
        stage: CertificationStage,
    },
    #[error("workflow id cannot be empty")]
    EmptyId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default = "default_version")]
    pub version: u32,
    /// Visual editor graph. Carried through untouched.
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub edges: Vec<Value>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub stages: Vec<WorkflowStage>,
}

fn default_version() -> u32 {
    1
}

impl Workflow {
    pub fn stage(&self, name: CertificationStage) -> Option<&WorkflowStage> {
        self.stages.iter().find(|stage| stage.name == name)
    }

    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.id.trim().is_empty() {
            return Err(WorkflowError::EmptyId);
        }
        let mut seen = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            if seen.contains(&stage.name) {
                return Err(WorkflowError::DuplicateStage {
                    workflow: self.id.clone(),
                    stage: stage.name,
                });
            }
            seen.push(stage.name);
        }
        Ok(())
    }
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_tokens_round_trip_through_serde() {
        let encoded = serde_json::to_string(&CertificationStage::SubmissionReview).expect("encode");
        assert_eq!(encoded, "\"SUBMISSION_REVIEW\"");
        let decoded: CertificationStage = serde_json::from_str("\"TA_COMPLETE\"").expect("decode");
        assert_eq!(decoded, CertificationStage::TaComplete);
    }

    #[test]
    fn stage_parse_accepts_loose_spelling() {
        assert_eq!(
            "device-testing".parse::<CertificationStage>(),
            Ok(CertificationStage::DeviceTesting)
        );
        assert!("BOGUS".parse::<CertificationStage>().is_err());
    }

    #[test]
    fn task_status_columns_are_adjacent() {
        assert_eq!(TaskStatus::Todo.previous(), None);
        assert_eq!(TaskStatus::Todo.next(), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::Review.previous(), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::Done.next(), None);
    }

    #[test]
    fn request_decodes_original_field_names() {
        let payload = serde_json::json!({
            "id": "DARP-1",
            "darpKey": "DARP-1",
            "projectName": "Smoke Test",
            "type": "DA IR",
            "status": "PLANNING",
            "targetDate": "2025-03-28",
            "softwareVersion": "1.0.0",
            "workflow": "default-workflow",
            "lastUpdated": "2025-02-28",
            "tasks": [{
                "id": "1",
                "name": "Compliance",
                "status": "DONE",
                "priority": "HIGH",
                "labels": ["compliance"],
                "stage": "PLANNING",
                "attachments": [],
                "comments": [],
                "timeSpent": 120
            }],
            "issues": [{"title": "Missing", "description": "doc", "type": "warning"}]
        });
        let request: CertificationRequest = serde_json::from_value(payload).expect("decode");
        assert_eq!(request.kind, "DA IR");
        assert_eq!(request.tasks[0].status, TaskStatus::Done);
        assert_eq!(request.tasks[0].time_spent, Some(120));
        assert_eq!(request.issues[0].kind, IssueKind::Warning);
        assert_eq!(request.time_spent(), 120);
    }

    #[test]
    fn workflow_rejects_duplicate_stages() {
        let mut workflow = catalog::default_workflow();
        assert!(workflow.validate().is_ok());
        let duplicate = workflow.stages[0].clone();
        workflow.stages.push(duplicate);
        assert_eq!(
            workflow.validate(),
            Err(WorkflowError::DuplicateStage {
                workflow: "default-workflow".to_string(),
                stage: CertificationStage::Forecast,
            })
        );
    }
}
