//! View state shared by the CLI and the board: loaded workflows, the selected
//! workflow and the predefined task catalog. Changed only through [`reduce`].

use crate::Workflow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default, skip_serializing)]
    pub workflows: Vec<Workflow>,
    #[serde(default)]
    pub selected_workflow: Option<String>,
    /// Category -> task names offered when adding tasks by hand.
    #[serde(default)]
    pub predefined_tasks: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetWorkflows(Vec<Workflow>),
    AddWorkflow(Workflow),
    UpdateWorkflow(Workflow),
    DeleteWorkflow(String),
    SelectWorkflow(Option<String>),
    AddPredefinedTask { category: String, task: String },
}

pub fn reduce(mut state: AppState, action: Action) -> AppState {
    match action {
        Action::SetWorkflows(workflows) => {
            state.workflows = workflows;
        }
        Action::AddWorkflow(workflow) => {
            state.workflows.push(workflow);
        }
        Action::UpdateWorkflow(workflow) => {
            if let Some(slot) = state.workflows.iter_mut().find(|w| w.id == workflow.id) {
                *slot = workflow;
            }
        }
        Action::DeleteWorkflow(id) => {
            state.workflows.retain(|workflow| workflow.id != id);
            if state.selected_workflow.as_deref() == Some(id.as_str()) {
                state.selected_workflow = None;
            }
        }
        Action::SelectWorkflow(id) => {
            state.selected_workflow = id;
        }
        Action::AddPredefinedTask { category, task } => {
            let tasks = state.predefined_tasks.entry(category).or_default();
            if !tasks.contains(&task) {
                tasks.push(task);
            }
        }
    }
    state
}

impl AppState {
    pub fn selected(&self) -> Option<&Workflow> {
        let id = self.selected_workflow.as_deref()?;
        self.workflows.iter().find(|workflow| workflow.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_workflow;

    fn state_with_default() -> AppState {
        let state = reduce(AppState::default(), Action::SetWorkflows(vec![default_workflow()]));
        reduce(state, Action::SelectWorkflow(Some("default-workflow".to_string())))
    }

    #[test]
    fn deleting_selected_workflow_clears_selection() {
        let state = state_with_default();
        assert_eq!(state.selected().map(|w| w.id.as_str()), Some("default-workflow"));
        let state = reduce(state, Action::DeleteWorkflow("default-workflow".to_string()));
        assert!(state.workflows.is_empty());
        assert_eq!(state.selected_workflow, None);
    }

    #[test]
    fn deleting_other_workflow_keeps_selection() {
        let mut other = default_workflow();
        other.id = "vendor".to_string();
        let state = reduce(state_with_default(), Action::AddWorkflow(other));
        let state = reduce(state, Action::DeleteWorkflow("vendor".to_string()));
        assert_eq!(state.selected_workflow.as_deref(), Some("default-workflow"));
        assert_eq!(state.workflows.len(), 1);
    }

    #[test]
    fn update_replaces_by_id() {
        let mut renamed = default_workflow();
        renamed.name = "Renamed".to_string();
        let state = reduce(state_with_default(), Action::UpdateWorkflow(renamed));
        assert_eq!(state.workflows[0].name, "Renamed");

        let mut unknown = default_workflow();
        unknown.id = "ghost".to_string();
        let state = reduce(state, Action::UpdateWorkflow(unknown));
        assert_eq!(state.workflows.len(), 1);
    }

    #[test]
    fn predefined_tasks_group_by_category() {
        let add = |state, task: &str| {
            reduce(
                state,
                Action::AddPredefinedTask {
                    category: "review".to_string(),
                    task: task.to_string(),
                },
            )
        };
        let state = add(AppState::default(), "Chapter review");
        let state = add(state, "Chapter review");
        let state = add(state, "Sign-off");
        assert_eq!(
            state.predefined_tasks["review"],
            vec!["Chapter review".to_string(), "Sign-off".to_string()]
        );
    }

    #[test]
    fn persisted_form_skips_workflows() {
        let state = state_with_default();
        let encoded = serde_json::to_value(&state).expect("encode");
        assert!(encoded.get("workflows").is_none());
        assert_eq!(encoded["selectedWorkflow"], "default-workflow");
    }
}
