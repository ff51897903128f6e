use super::Store;
use crate::{KeyValueStore, StorageError};
use cert_core::{now_timestamp, Workflow};

impl<B: KeyValueStore> Store<B> {
    pub fn list_workflows(&mut self) -> Result<Vec<Workflow>, StorageError> {
        self.read_collection()
    }

    pub fn get_workflow(&mut self, id: &str) -> Result<Workflow, StorageError> {
        self.require(id)
    }

    /// Validates and stores a workflow, replacing one with the same id.
    /// Returns true when an existing workflow was replaced.
    pub fn save_workflow(&mut self, mut workflow: Workflow) -> Result<bool, StorageError> {
        workflow.validate()?;
        let now = now_timestamp();
        if workflow.created_at.is_empty() {
            workflow.created_at = now.clone();
        }
        workflow.updated_at = now;

        let exists = self.find::<Workflow>(&workflow.id)?.is_some();
        if exists {
            self.replace(workflow)?;
        } else {
            self.insert(workflow)?;
        }
        Ok(exists)
    }

    /// Requests created from the workflow keep their id reference.
    pub fn remove_workflow(&mut self, id: &str) -> Result<Workflow, StorageError> {
        self.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cert_core::catalog::default_workflow;
    use cert_core::{CertificationStage, WorkflowError};

    #[test]
    fn save_inserts_then_replaces() {
        let mut store = Store::in_memory();
        let mut custom = default_workflow();
        custom.id = "vendor-x".to_string();
        custom.name = "Vendor X".to_string();
        assert!(!store.save_workflow(custom.clone()).expect("insert"));

        custom.stages.retain(|stage| stage.name != CertificationStage::Closed);
        assert!(store.save_workflow(custom).expect("replace"));

        let stored = store.get_workflow("vendor-x").expect("get");
        assert_eq!(stored.stages.len(), 8);
        assert_eq!(stored.created_at, "2025-01-01T00:00:00.000Z");
        assert_eq!(store.list_workflows().expect("list").len(), 2);
    }

    #[test]
    fn invalid_workflow_is_not_saved() {
        let mut store = Store::in_memory();
        let mut broken = default_workflow();
        broken.id = "broken".to_string();
        let duplicate = broken.stages[1].clone();
        broken.stages.push(duplicate);
        let err = store.save_workflow(broken).expect_err("duplicate stage");
        assert!(matches!(
            err,
            StorageError::Workflow(WorkflowError::DuplicateStage { .. })
        ));
        assert!(store.get_workflow("broken").expect_err("absent").is_not_found());
    }

    #[test]
    fn removing_workflow_keeps_requests() {
        let mut store = Store::in_memory();
        store.remove_workflow("default-workflow").expect("remove");
        let request = store.get_certification("DARP-127205").expect("get");
        assert_eq!(request.workflow, "default-workflow");
        let outcome = store.advance_certification("DARP-127205").expect("advance");
        assert!(outcome.created_task_ids.is_empty());
    }
}
