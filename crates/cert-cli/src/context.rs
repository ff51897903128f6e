use anyhow::{Context as _, Result};
use cert_core::app_state::{reduce, Action, AppState};
use cert_core::catalog::DEFAULT_WORKFLOW_ID;
use cert_core::CERTIFICATION_TYPES;
use cert_storage::config::CONFIG_DIR;
use cert_storage::{load_config, resolve_data_dir, CertdashConfig, SqliteStore, Store};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_USER: &str = "local-user";

pub struct Paths {
    pub root: PathBuf,
    pub state_path: PathBuf,
    pub data_dir: PathBuf,
}

pub struct Context {
    pub paths: Paths,
    pub config: CertdashConfig,
    pub state: AppState,
    pub store: Store<SqliteStore>,
}

impl Context {
    pub fn load() -> Result<Self> {
        // The CLI runs inside the project directory
        let root = std::env::current_dir()?;
        Self::load_from(root)
    }

    pub fn load_from(root: PathBuf) -> Result<Self> {
        let state_path = root.join(CONFIG_DIR).join("state.json");
        let config = load_config(&root);
        let data_dir = resolve_data_dir(&root, &config);
        let store = Store::open(&data_dir)
            .with_context(|| format!("Failed to open store in {}", data_dir.display()))?;

        let paths = Paths {
            root,
            state_path,
            data_dir,
        };
        tracing::debug!(data_dir = %paths.data_dir.display(), "store opened");
        let state = load_state(&paths.state_path);
        Ok(Self {
            paths,
            config,
            state,
            store,
        })
    }

    /// Actor recorded on comments, attachments and dashboards.
    pub fn user(&self) -> String {
        if let Ok(user) = std::env::var("CERTDASH_USER") {
            if !user.trim().is_empty() {
                return user;
            }
        }
        if let Some(user) = self.config.user.as_ref() {
            if !user.trim().is_empty() {
                return user.clone();
            }
        }
        DEFAULT_USER.to_string()
    }

    pub fn certification_types(&self) -> Vec<String> {
        match &self.config.certification_types {
            Some(types) if !types.is_empty() => types.clone(),
            _ => CERTIFICATION_TYPES.iter().map(|kind| kind.to_string()).collect(),
        }
    }

    /// Workflow used for new requests when none is named.
    pub fn resolve_workflow(&self, override_id: Option<&str>) -> String {
        if let Some(id) = override_id {
            return id.to_string();
        }
        if let Some(id) = self.state.selected_workflow.as_ref() {
            return id.clone();
        }
        if let Some(id) = self.config.default_workflow.as_ref() {
            if !id.trim().is_empty() {
                return id.clone();
            }
        }
        DEFAULT_WORKFLOW_ID.to_string()
    }

    /// Runs an action through the reducer and persists the result.
    pub fn dispatch(&mut self, action: Action) -> Result<()> {
        self.state = reduce(std::mem::take(&mut self.state), action);
        save_state(&self.paths.state_path, &self.state)
    }

    /// Loads stored workflows into the application state.
    pub fn sync_workflows(&mut self) -> Result<()> {
        let workflows = self.store.list_workflows()?;
        self.dispatch(Action::SetWorkflows(workflows))?;
        if let Some(selected) = self.state.selected_workflow.clone() {
            if self.state.selected().is_none() {
                tracing::info!(workflow = %selected, "selected workflow no longer exists");
                self.dispatch(Action::SelectWorkflow(None))?;
            }
        }
        Ok(())
    }
}

fn load_state(state_path: &Path) -> AppState {
    if let Ok(content) = fs::read_to_string(state_path) {
        match serde_json::from_str::<AppState>(&content) {
            Ok(state) => return state,
            Err(err) => {
                tracing::warn!(path = %state_path.display(), error = %err, "ignoring unreadable state");
            }
        }
    }
    AppState::default()
}

fn save_state(state_path: &Path, state: &AppState) -> Result<()> {
    if let Some(parent) = state_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let payload = serde_json::to_string_pretty(state)?;
    let tmp_path = state_path.with_extension("json.tmp");
    fs::write(&tmp_path, payload).context("Failed to write temp state file")?;
    fs::rename(&tmp_path, state_path)
        .with_context(|| format!("Failed to write {}", state_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn state_round_trips_through_disk() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join(".certdash/state.json");
        assert_eq!(load_state(&path), AppState::default());

        let state = reduce(
            AppState::default(),
            Action::SelectWorkflow(Some("default-workflow".to_string())),
        );
        let state = reduce(
            state,
            Action::AddPredefinedTask {
                category: "review".to_string(),
                task: "Chapter review".to_string(),
            },
        );
        save_state(&path, &state).expect("save");
        let loaded = load_state(&path);
        assert_eq!(loaded.selected_workflow.as_deref(), Some("default-workflow"));
        assert_eq!(loaded.predefined_tasks["review"], vec!["Chapter review".to_string()]);
    }
}
