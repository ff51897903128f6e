//! Stage and task lifecycle of a certification request.
//!
//! Everything here is pure: callers hand in the request and the workflow,
//! get back the mutated request, and persist it themselves.

use crate::{
    new_id, CertificationRequest, CertificationStage, CertificationTask, TaskAttachment,
    TaskComment, TaskPriority, TaskStatus, Workflow, WorkflowStage, CERTIFICATION_TYPES,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("certification is already at terminal stage {0}")]
    Terminal(CertificationStage),
    #[error("task {0} not found")]
    TaskNotFound(String),
}

/// Color class shared by every rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Purple,
    Blue,
    Yellow,
    Orange,
    Cyan,
    Indigo,
    Pink,
    Green,
    Gray,
    Red,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Purple => "purple",
            Tone::Blue => "blue",
            Tone::Yellow => "yellow",
            Tone::Orange => "orange",
            Tone::Cyan => "cyan",
            Tone::Indigo => "indigo",
            Tone::Pink => "pink",
            Tone::Green => "green",
            Tone::Gray => "gray",
            Tone::Red => "red",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn next_stage(current: CertificationStage) -> Option<CertificationStage> {
    CertificationStage::ALL.get(current.position() + 1).copied()
}

/// Same as [`next_stage`] for a raw token; unknown tokens have no successor.
pub fn next_stage_token(current: &str) -> Option<CertificationStage> {
    current.parse::<CertificationStage>().ok().and_then(next_stage)
}

pub fn create_tasks_for_stage(stage: &WorkflowStage) -> Vec<CertificationTask> {
    stage
        .tasks
        .iter()
        .map(|template| CertificationTask {
            id: new_id(),
            name: template.title.clone(),
            description: template.description.clone(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            labels: vec![template.kind.clone()],
            stage: stage.name,
            attachments: Vec::new(),
            comments: Vec::new(),
            assignee: None,
            due_date: None,
            time_spent: None,
            extra: Default::default(),
        })
        .collect()
}

pub fn stage_tone(stage: CertificationStage) -> Tone {
    match stage {
        CertificationStage::Forecast => Tone::Purple,
        CertificationStage::Planning => Tone::Blue,
        CertificationStage::Submitted => Tone::Yellow,
        CertificationStage::SubmissionReview => Tone::Orange,
        CertificationStage::DeviceEntry => Tone::Cyan,
        CertificationStage::DeviceTesting => Tone::Indigo,
        CertificationStage::TaqReview => Tone::Pink,
        CertificationStage::TaComplete => Tone::Green,
        CertificationStage::Closed => Tone::Gray,
    }
}

pub fn stage_label(stage: CertificationStage) -> String {
    humanize_token(stage.as_str())
}

/// `SUBMISSION_REVIEW` -> `Submission Review`.
pub fn humanize_token(token: &str) -> String {
    token
        .split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => {
                    let mut word = first.to_uppercase().collect::<String>();
                    word.push_str(&chars.as_str().to_lowercase());
                    word
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn task_status_tone(status: TaskStatus) -> Tone {
    match status {
        TaskStatus::Todo => Tone::Gray,
        TaskStatus::InProgress => Tone::Blue,
        TaskStatus::Review => Tone::Yellow,
        TaskStatus::Done => Tone::Green,
    }
}

pub fn priority_tone(priority: &str) -> Tone {
    match priority.trim().to_uppercase().as_str() {
        "HIGH" => Tone::Red,
        "MEDIUM" => Tone::Orange,
        "LOW" => Tone::Green,
        _ => Tone::Gray,
    }
}

pub fn priority_icon(priority: &str) -> &'static str {
    match priority.trim().to_uppercase().as_str() {
        "HIGH" => "↑",
        "LOW" => "↓",
        _ => "=",
    }
}

impl TaskPriority {
    pub fn icon(&self) -> &'static str {
        priority_icon(self.as_str())
    }

    pub fn tone(&self) -> Tone {
        priority_tone(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    pub stage: CertificationStage,
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
}

pub fn summarize_by_stage<S: AsRef<str>>(
    requests: &[CertificationRequest],
    known_types: &[S],
) -> Vec<StageSummary> {
    CertificationStage::ALL
        .iter()
        .map(|stage| {
            let in_stage: Vec<&CertificationRequest> = requests
                .iter()
                .filter(|request| request.status == *stage)
                .collect();
            let by_type = known_types
                .iter()
                .map(|kind| {
                    let kind = kind.as_ref();
                    let count = in_stage.iter().filter(|request| request.kind == kind).count();
                    (kind.to_string(), count)
                })
                .collect();
            StageSummary {
                stage: *stage,
                total: in_stage.len(),
                by_type,
            }
        })
        .collect()
}

pub fn summarize_by_default_types(requests: &[CertificationRequest]) -> Vec<StageSummary> {
    summarize_by_stage(requests, &CERTIFICATION_TYPES)
}

/// Share of DONE tasks, rounded half-up to a whole percent.
pub fn progress_percent(request: &CertificationRequest) -> u8 {
    let total = request.tasks.len();
    if total == 0 {
        return 0;
    }
    let done = request
        .tasks
        .iter()
        .filter(|task| task.status.is_done())
        .count();
    ((done * 100 + total / 2) / total) as u8
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub from: CertificationStage,
    pub to: CertificationStage,
    pub created_task_ids: Vec<String>,
}

pub fn advance(
    request: &mut CertificationRequest,
    workflow: Option<&Workflow>,
    now: &str,
) -> Result<Advance, LifecycleError> {
    let from = request.status;
    let to = next_stage(from).ok_or(LifecycleError::Terminal(from))?;
    let created = workflow
        .and_then(|workflow| workflow.stage(to))
        .map(create_tasks_for_stage)
        .unwrap_or_default();
    let created_task_ids = created.iter().map(|task| task.id.clone()).collect();

    request.tasks.extend(created);
    request.status = to;
    request.last_updated = now.to_string();

    Ok(Advance {
        from,
        to,
        created_task_ids,
    })
}

/// Manual status edit outside the advancement path. Creates no tasks.
pub fn override_status(request: &mut CertificationRequest, stage: CertificationStage, now: &str) {
    request.status = stage;
    request.last_updated = now.to_string();
}

pub fn set_task_status(
    request: &mut CertificationRequest,
    task_id: &str,
    status: TaskStatus,
    now: &str,
) -> Result<(), LifecycleError> {
    let task = request
        .find_task_mut(task_id)
        .ok_or_else(|| LifecycleError::TaskNotFound(task_id.to_string()))?;
    task.status = status;
    request.last_updated = now.to_string();
    Ok(())
}

pub fn replace_task(
    request: &mut CertificationRequest,
    task: CertificationTask,
    now: &str,
) -> Result<(), LifecycleError> {
    let slot = request
        .find_task_mut(&task.id)
        .ok_or_else(|| LifecycleError::TaskNotFound(task.id.clone()))?;
    *slot = task;
    request.last_updated = now.to_string();
    Ok(())
}

pub fn remove_task(
    request: &mut CertificationRequest,
    task_id: &str,
    now: &str,
) -> Result<CertificationTask, LifecycleError> {
    let idx = request
        .tasks
        .iter()
        .position(|task| task.id == task_id)
        .ok_or_else(|| LifecycleError::TaskNotFound(task_id.to_string()))?;
    request.last_updated = now.to_string();
    Ok(request.tasks.remove(idx))
}

pub fn add_comment(
    request: &mut CertificationRequest,
    task_id: &str,
    content: &str,
    author: &str,
    now: &str,
) -> Result<TaskComment, LifecycleError> {
    let task = request
        .find_task_mut(task_id)
        .ok_or_else(|| LifecycleError::TaskNotFound(task_id.to_string()))?;
    let comment = TaskComment {
        id: new_id(),
        content: content.to_string(),
        created_at: now.to_string(),
        created_by: author.to_string(),
    };
    task.comments.push(comment.clone());
    request.last_updated = now.to_string();
    Ok(comment)
}

pub struct AttachmentInput<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub size: u64,
    pub mime_type: &'a str,
}

pub fn add_attachment(
    request: &mut CertificationRequest,
    task_id: &str,
    input: AttachmentInput<'_>,
    author: &str,
    now: &str,
) -> Result<TaskAttachment, LifecycleError> {
    let task = request
        .find_task_mut(task_id)
        .ok_or_else(|| LifecycleError::TaskNotFound(task_id.to_string()))?;
    let attachment = TaskAttachment {
        id: new_id(),
        name: input.name.to_string(),
        url: input.url.to_string(),
        size: input.size,
        mime_type: input.mime_type.to_string(),
        uploaded_at: now.to_string(),
        uploaded_by: author.to_string(),
    };
    task.attachments.push(attachment.clone());
    request.last_updated = now.to_string();
    Ok(attachment)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("workflow '{0}' has no FORECAST stage")]
    NoForecastStage(String),
}

/// Form input for a new certification request.
#[derive(Debug, Clone, Default)]
pub struct CertificationDraft {
    pub darp_key: String,
    pub project_name: String,
    pub kind: String,
    pub target_date: String,
    pub software_version: String,
    pub assignee: Option<String>,
    pub estimated_completion_date: Option<String>,
}

impl CertificationDraft {
    pub fn validate(&self) -> Result<(), DraftError> {
        let required = [
            ("DARP key", &self.darp_key),
            ("project name", &self.project_name),
            ("project type", &self.kind),
            ("target date", &self.target_date),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DraftError::Missing(field));
            }
        }
        Ok(())
    }
}

pub fn new_certification(
    draft: CertificationDraft,
    workflow: &Workflow,
    now: &str,
) -> Result<CertificationRequest, DraftError> {
    draft.validate()?;
    let forecast = workflow
        .stage(CertificationStage::Forecast)
        .ok_or_else(|| DraftError::NoForecastStage(workflow.id.clone()))?;

    Ok(CertificationRequest {
        id: new_id(),
        darp_key: draft.darp_key.trim().to_string(),
        project_name: draft.project_name.trim().to_string(),
        kind: draft.kind.trim().to_string(),
        status: CertificationStage::Forecast,
        target_date: draft.target_date.trim().to_string(),
        software_version: draft.software_version.trim().to_string(),
        tasks: create_tasks_for_stage(forecast),
        issues: Vec::new(),
        workflow: workflow.id.clone(),
        last_updated: now.to_string(),
        assignee: draft.assignee.filter(|value| !value.trim().is_empty()),
        estimated_completion_date: draft
            .estimated_completion_date
            .filter(|value| !value.trim().is_empty()),
        extra: Default::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_workflow;
    use crate::{CertificationIssue, IssueKind, WorkflowTask};
    use std::collections::HashSet;

    const NOW: &str = "2026-02-23T14:00:00.000Z";

    fn request(status: CertificationStage, kind: &str) -> CertificationRequest {
        CertificationRequest {
            id: format!("req-{}-{kind}", status.as_str()),
            darp_key: "DARP-1".to_string(),
            project_name: "Smoke Test".to_string(),
            kind: kind.to_string(),
            status,
            target_date: "2025-03-28".to_string(),
            software_version: "1.0.0".to_string(),
            tasks: Vec::new(),
            issues: vec![CertificationIssue {
                title: "Missing spec".to_string(),
                description: "upload it".to_string(),
                kind: IssueKind::Warning,
            }],
            workflow: "default-workflow".to_string(),
            last_updated: "2025-02-28".to_string(),
            assignee: None,
            estimated_completion_date: None,
            extra: Default::default(),
        }
    }

    fn with_statuses(statuses: &[TaskStatus]) -> CertificationRequest {
        let mut req = request(CertificationStage::Planning, "DA IR");
        let stage = default_workflow()
            .stage(CertificationStage::Planning)
            .cloned()
            .expect("planning stage");
        let template = stage.tasks[0].clone();
        let stage = WorkflowStage {
            tasks: vec![template; statuses.len()],
            ..stage
        };
        req.tasks = create_tasks_for_stage(&stage);
        for (task, status) in req.tasks.iter_mut().zip(statuses) {
            task.status = *status;
        }
        req
    }

    #[test]
    fn next_stage_walks_fixed_order() {
        for pair in CertificationStage::ALL.windows(2) {
            assert_eq!(next_stage(pair[0]), Some(pair[1]));
        }
        assert_eq!(next_stage(CertificationStage::Closed), None);
        assert_eq!(next_stage_token("BOGUS"), None);
        assert_eq!(
            next_stage_token("SUBMITTED"),
            Some(CertificationStage::SubmissionReview)
        );
    }

    #[test]
    fn tasks_materialize_from_templates() {
        let stage = WorkflowStage {
            id: "device-testing".to_string(),
            name: CertificationStage::DeviceTesting,
            tasks: vec![
                WorkflowTask {
                    id: "dt1".to_string(),
                    title: "Functional Testing".to_string(),
                    kind: "testing".to_string(),
                    description: Some("run the suite".to_string()),
                    required: true,
                },
                WorkflowTask {
                    id: "dt2".to_string(),
                    title: "Performance Testing".to_string(),
                    kind: "perf".to_string(),
                    description: None,
                    required: false,
                },
            ],
        };

        let tasks = create_tasks_for_stage(&stage);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].name, "Functional Testing");
        assert_eq!(tasks[0].description.as_deref(), Some("run the suite"));
        assert_eq!(tasks[1].description, None);
        assert_eq!(tasks[1].labels, vec!["perf".to_string()]);
        for task in &tasks {
            assert_eq!(task.status, TaskStatus::Todo);
            assert_eq!(task.priority, TaskPriority::Medium);
            assert_eq!(task.stage, CertificationStage::DeviceTesting);
            assert!(task.attachments.is_empty());
            assert!(task.comments.is_empty());
            assert_ne!(task.id, "dt1");
        }

        let again = create_tasks_for_stage(&stage);
        let first: HashSet<_> = tasks.iter().map(|task| task.id.clone()).collect();
        assert!(again.iter().all(|task| !first.contains(&task.id)));
    }

    #[test]
    fn progress_rounds_half_up() {
        assert_eq!(progress_percent(&with_statuses(&[])), 0);
        let one_of_four = [
            TaskStatus::Done,
            TaskStatus::Todo,
            TaskStatus::Review,
            TaskStatus::InProgress,
        ];
        assert_eq!(progress_percent(&with_statuses(&one_of_four)), 25);
        let three_of_four = [
            TaskStatus::Done,
            TaskStatus::Done,
            TaskStatus::Done,
            TaskStatus::Todo,
        ];
        assert_eq!(progress_percent(&with_statuses(&three_of_four)), 75);
        let mut one_of_eight = vec![TaskStatus::Todo; 7];
        one_of_eight.push(TaskStatus::Done);
        assert_eq!(progress_percent(&with_statuses(&one_of_eight)), 13);
        assert_eq!(
            progress_percent(&with_statuses(&[TaskStatus::Done, TaskStatus::Todo, TaskStatus::Todo])),
            33
        );
    }

    #[test]
    fn summary_counts_per_stage_and_type() {
        let requests = vec![
            request(CertificationStage::Planning, "DA IR"),
            request(CertificationStage::Planning, "DA MR"),
            request(CertificationStage::Closed, "Vendor X"),
        ];
        let summary = summarize_by_default_types(&requests);
        assert_eq!(summary.len(), 9);
        let planning = &summary[CertificationStage::Planning.position()];
        assert_eq!(planning.total, 2);
        assert_eq!(planning.by_type["DA IR"], 1);
        assert_eq!(planning.by_type["DA MR"], 1);
        assert_eq!(planning.by_type["DA SMR"], 0);
        let closed = &summary[CertificationStage::Closed.position()];
        assert_eq!(closed.total, 1);
        assert!(closed.by_type.values().all(|count| *count == 0));
        assert!(!closed.by_type.contains_key("Vendor X"));
        for entry in &summary {
            if !matches!(entry.stage, CertificationStage::Planning | CertificationStage::Closed) {
                assert_eq!(entry.total, 0);
            }
        }
        assert_eq!(summary.iter().map(|entry| entry.total).sum::<usize>(), 3);
    }

    #[test]
    fn labels_humanize_tokens() {
        assert_eq!(stage_label(CertificationStage::SubmissionReview), "Submission Review");
        assert_eq!(stage_label(CertificationStage::Forecast), "Forecast");
        assert_eq!(stage_label(CertificationStage::TaqReview), "Taq Review");
    }

    #[test]
    fn priority_icon_defaults_to_medium() {
        assert_eq!(priority_icon("HIGH"), "↑");
        assert_eq!(priority_icon("LOW"), "↓");
        assert_eq!(priority_icon("MEDIUM"), "=");
        assert_eq!(priority_icon("urgent"), "=");
        assert_eq!(priority_tone("urgent"), Tone::Gray);
        assert_eq!(TaskPriority::High.tone(), Tone::Red);
    }

    #[test]
    fn every_stage_has_a_distinct_tone() {
        let tones: HashSet<Tone> = CertificationStage::ALL.iter().map(|s| stage_tone(*s)).collect();
        assert_eq!(tones.len(), 9);
    }

    #[test]
    fn advance_appends_next_stage_tasks() {
        let workflow = default_workflow();
        let mut req = request(CertificationStage::Forecast, "DA IR");
        req.tasks = create_tasks_for_stage(workflow.stage(CertificationStage::Forecast).expect("forecast"));
        let before = req.tasks.clone();

        let outcome = advance(&mut req, Some(&workflow), NOW).expect("advance");
        assert_eq!(outcome.from, CertificationStage::Forecast);
        assert_eq!(outcome.to, CertificationStage::Planning);
        assert_eq!(req.status, CertificationStage::Planning);
        assert_eq!(req.last_updated, NOW);
        assert_eq!(&req.tasks[..before.len()], &before[..]);
        assert_eq!(outcome.created_task_ids.len(), 3);
        assert!(req.tasks[before.len()..]
            .iter()
            .all(|task| task.stage == CertificationStage::Planning));
    }

    #[test]
    fn advance_stops_at_closed() {
        let mut req = request(CertificationStage::Closed, "DA IR");
        assert_eq!(
            advance(&mut req, Some(&default_workflow()), NOW),
            Err(LifecycleError::Terminal(CertificationStage::Closed))
        );
        assert_eq!(req.last_updated, "2025-02-28");
    }

    #[test]
    fn advance_without_workflow_creates_no_tasks() {
        let mut req = request(CertificationStage::Submitted, "DA IR");
        let outcome = advance(&mut req, None, NOW).expect("advance");
        assert_eq!(outcome.to, CertificationStage::SubmissionReview);
        assert!(req.tasks.is_empty());
    }

    #[test]
    fn override_skips_task_creation() {
        let mut req = request(CertificationStage::Forecast, "DA IR");
        override_status(&mut req, CertificationStage::TaqReview, NOW);
        assert_eq!(req.status, CertificationStage::TaqReview);
        assert!(req.tasks.is_empty());
    }

    #[test]
    fn task_edits_require_known_ids() {
        let mut req = with_statuses(&[TaskStatus::Todo]);
        let id = req.tasks[0].id.clone();
        set_task_status(&mut req, &id, TaskStatus::Review, NOW).expect("status");
        assert_eq!(req.tasks[0].status, TaskStatus::Review);
        let comment = add_comment(&mut req, &id, "looks good", "alex", NOW).expect("comment");
        assert_eq!(req.tasks[0].comments, vec![comment]);
        assert_eq!(
            set_task_status(&mut req, "missing", TaskStatus::Done, NOW),
            Err(LifecycleError::TaskNotFound("missing".to_string()))
        );
        let removed = remove_task(&mut req, &id, NOW).expect("remove");
        assert_eq!(removed.id, id);
        assert!(req.tasks.is_empty());
    }

    #[test]
    fn draft_requires_form_fields() {
        let workflow = default_workflow();
        let draft = CertificationDraft {
            darp_key: "DARP-9".to_string(),
            project_name: "Smoke".to_string(),
            kind: " ".to_string(),
            target_date: "2026-01-01".to_string(),
            ..Default::default()
        };
        assert_eq!(
            new_certification(draft.clone(), &workflow, NOW),
            Err(DraftError::Missing("project type"))
        );

        let created = new_certification(
            CertificationDraft {
                kind: "DA MR".to_string(),
                assignee: Some(String::new()),
                ..draft
            },
            &workflow,
            NOW,
        )
        .expect("create");
        assert_eq!(created.status, CertificationStage::Forecast);
        assert_eq!(created.workflow, "default-workflow");
        assert_eq!(created.tasks.len(), 3);
        assert_eq!(created.assignee, None);
    }
}
