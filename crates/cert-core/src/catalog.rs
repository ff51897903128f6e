//! Built-in data: the default certification workflow and the first-run seeds.

use crate::dashboard::{Dashboard, DashboardKind};
use crate::{
    CertificationIssue, CertificationRequest, CertificationStage, CertificationTask, IssueKind,
    TaskPriority, TaskStatus, Workflow, WorkflowStage, WorkflowStatus, WorkflowTask,
};

pub const DEFAULT_WORKFLOW_ID: &str = "default-workflow";
const CATALOG_EPOCH: &str = "2025-01-01T00:00:00.000Z";

/// (stage id, stage, [(template id, title, type)])
type StageTemplate = (
    &'static str,
    CertificationStage,
    &'static [(&'static str, &'static str, &'static str)],
);

const DEFAULT_STAGES: [StageTemplate; 9] = [
    (
        "forecast",
        CertificationStage::Forecast,
        &[
            ("f1", "Initial Requirements Review", "review"),
            ("f2", "Resource Planning", "planning"),
            ("f3", "Timeline Estimation", "planning"),
        ],
    ),
    (
        "planning",
        CertificationStage::Planning,
        &[
            ("p1", "Compliance Requirements Review", "review"),
            ("p2", "Documentation Preparation", "documentation"),
            ("p3", "Test Plan Development", "planning"),
        ],
    ),
    (
        "submitted",
        CertificationStage::Submitted,
        &[
            ("s1", "Documentation Submission", "submission"),
            ("s2", "Initial Verification", "verification"),
        ],
    ),
    (
        "submission-review",
        CertificationStage::SubmissionReview,
        &[
            ("sr1", "Technical Review", "review"),
            ("sr2", "Compliance Check", "verification"),
        ],
    ),
    (
        "device-entry",
        CertificationStage::DeviceEntry,
        &[
            ("de1", "Device Registration", "registration"),
            ("de2", "Initial Configuration", "configuration"),
        ],
    ),
    (
        "device-testing",
        CertificationStage::DeviceTesting,
        &[
            ("dt1", "Functional Testing", "testing"),
            ("dt2", "Performance Testing", "testing"),
            ("dt3", "Compliance Testing", "testing"),
        ],
    ),
    (
        "taq-review",
        CertificationStage::TaqReview,
        &[
            ("tr1", "Final Documentation Review", "review"),
            ("tr2", "Test Results Analysis", "analysis"),
        ],
    ),
    (
        "ta-complete",
        CertificationStage::TaComplete,
        &[
            ("tc1", "Certification Issuance", "certification"),
            ("tc2", "Final Documentation", "documentation"),
        ],
    ),
    (
        "closed",
        CertificationStage::Closed,
        &[
            ("c1", "Project Archival", "archival"),
            ("c2", "Final Report Generation", "reporting"),
        ],
    ),
];

pub fn default_workflow() -> Workflow {
    let stages = DEFAULT_STAGES
        .iter()
        .map(|(id, name, templates)| WorkflowStage {
            id: id.to_string(),
            name: *name,
            tasks: templates
                .iter()
                .map(|(task_id, title, kind)| WorkflowTask {
                    id: task_id.to_string(),
                    title: title.to_string(),
                    kind: kind.to_string(),
                    description: None,
                    required: true,
                })
                .collect(),
        })
        .collect();

    Workflow {
        id: DEFAULT_WORKFLOW_ID.to_string(),
        name: "Default Device Certification Workflow".to_string(),
        description: "Standard workflow for device certification process".to_string(),
        status: WorkflowStatus::Active,
        version: 1,
        nodes: Vec::new(),
        edges: Vec::new(),
        created_at: CATALOG_EPOCH.to_string(),
        updated_at: CATALOG_EPOCH.to_string(),
        stages,
    }
}

pub fn seed_workflows() -> Vec<Workflow> {
    vec![default_workflow()]
}

fn seed_request(
    darp_key: &str,
    project_name: &str,
    kind: &str,
    status: CertificationStage,
    last_updated: &str,
    target_date: &str,
    software_version: &str,
) -> CertificationRequest {
    CertificationRequest {
        id: darp_key.to_string(),
        darp_key: darp_key.to_string(),
        project_name: project_name.to_string(),
        kind: kind.to_string(),
        status,
        target_date: target_date.to_string(),
        software_version: software_version.to_string(),
        tasks: Vec::new(),
        issues: Vec::new(),
        workflow: DEFAULT_WORKFLOW_ID.to_string(),
        last_updated: last_updated.to_string(),
        assignee: None,
        estimated_completion_date: None,
        extra: Default::default(),
    }
}

fn seed_task(
    id: &str,
    name: &str,
    description: &str,
    status: TaskStatus,
    priority: TaskPriority,
    labels: &[&str],
    time_spent: u32,
) -> CertificationTask {
    CertificationTask {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        status,
        priority,
        labels: labels.iter().map(|label| label.to_string()).collect(),
        stage: CertificationStage::Planning,
        attachments: Vec::new(),
        comments: Vec::new(),
        assignee: None,
        due_date: None,
        time_spent: Some(time_spent),
        extra: Default::default(),
    }
}

pub fn seed_certifications() -> Vec<CertificationRequest> {
    use CertificationStage as S;

    let mut smoke = seed_request(
        "DARP-127205",
        "Smoke Test: ST0919A",
        "DA IR",
        S::Planning,
        "2025-02-28",
        "2025-03-28",
        "1.0.0",
    );
    smoke.tasks = vec![
        seed_task(
            "1",
            "Compliance Reqs: Chapter Reviews",
            "Review all compliance requirements chapters",
            TaskStatus::Done,
            TaskPriority::High,
            &["compliance"],
            120,
        ),
        seed_task(
            "2",
            "Deliverable Reqs: Chapter Reviews",
            "Review deliverable requirements chapters",
            TaskStatus::InProgress,
            TaskPriority::Medium,
            &["deliverable"],
            60,
        ),
        seed_task(
            "3",
            "Deliverable Reqs: PreAuth",
            "Complete pre-authorization requirements",
            TaskStatus::Todo,
            TaskPriority::High,
            &["deliverable", "auth"],
            0,
        ),
    ];
    smoke.issues = vec![CertificationIssue {
        title: "Missing Document - Certification Specs".to_string(),
        description: "Required certification specifications document is not uploaded".to_string(),
        kind: IssueKind::Warning,
    }];

    vec![
        smoke,
        seed_request("DARP-127130", "Smoke Test: ST0919B", "DA MR", S::DeviceTesting, "2025-02-28", "2025-03-15", "1.1.0"),
        seed_request("DARP-127116", "Smoke Test: ST0404A", "DA SMR", S::TaComplete, "2025-02-27", "2025-03-20", "2.0.0"),
        seed_request("DARP-127301", "Performance Test: PT0501A", "DA EMR", S::Submitted, "2025-02-28", "2025-04-15", "3.0.0"),
        seed_request("DARP-127302", "Security Test: ST0601B", "DA IR", S::DeviceTesting, "2025-02-28", "2025-04-20", "2.1.0"),
        seed_request("DARP-127303", "Integration Test: IT0701C", "DA MR", S::Planning, "2025-02-28", "2025-04-25", "1.5.0"),
        seed_request("DARP-127304", "Load Test: LT0801D", "DA SMR", S::SubmissionReview, "2025-02-28", "2025-04-30", "2.2.0"),
        seed_request("DARP-127305", "Stress Test: ST0901E", "DA EMR", S::DeviceEntry, "2025-02-28", "2025-05-05", "1.8.0"),
        seed_request("DARP-127306", "Compatibility Test: CT1001F", "DA IR", S::TaqReview, "2025-02-28", "2025-05-10", "2.3.0"),
    ]
}

pub fn seed_dashboards(now: &str) -> Vec<Dashboard> {
    [
        ("main-dashboard", "Main Dashboard", "Device Certification Dashboard"),
        ("waiver-dashboard", "Waiver Request", "Manage waiver requests and approvals"),
        ("device-list", "Device List Dashboard", "View and manage device inventory"),
        ("device-schedule", "Device Schedule Dashboard", "Track device certification schedules"),
    ]
    .into_iter()
    .map(|(id, title, description)| Dashboard {
        id: id.to_string(),
        title: title.to_string(),
        description: Some(description.to_string()),
        kind: DashboardKind::Default,
        shared_with: Vec::new(),
        layout: Vec::new(),
        created_at: now.to_string(),
        updated_at: now.to_string(),
        created_by: "system".to_string(),
    })
    .collect()
}
