use super::Store;
use crate::{KeyValueStore, StorageError};
use cert_core::lifecycle::{self, Advance, CertificationDraft};
use cert_core::{now_timestamp, CertificationRequest, CertificationStage, CertificationTask, Workflow};

#[derive(Debug, Clone, Default)]
pub struct CertificationFilter {
    pub stage: Option<CertificationStage>,
    pub kind: Option<String>,
}

impl CertificationFilter {
    pub fn matches(&self, request: &CertificationRequest) -> bool {
        self.stage.map_or(true, |stage| request.status == stage)
            && self
                .kind
                .as_deref()
                .map_or(true, |kind| request.kind.eq_ignore_ascii_case(kind))
    }
}

impl<B: KeyValueStore> Store<B> {
    pub fn list_certifications(&mut self) -> Result<Vec<CertificationRequest>, StorageError> {
        self.read_collection()
    }

    pub fn filter_certifications(
        &mut self,
        filter: &CertificationFilter,
    ) -> Result<Vec<CertificationRequest>, StorageError> {
        Ok(self
            .records::<CertificationRequest>()?
            .iter()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect())
    }

    pub fn get_certification(&mut self, id: &str) -> Result<CertificationRequest, StorageError> {
        self.require(id)
    }

    pub fn create_certification(
        &mut self,
        draft: CertificationDraft,
        workflow_id: &str,
    ) -> Result<CertificationRequest, StorageError> {
        let workflow = self.require::<Workflow>(workflow_id)?;
        let request = lifecycle::new_certification(draft, &workflow, &now_timestamp())?;
        self.insert(request.clone())?;
        tracing::info!(id = %request.id, darp_key = %request.darp_key, "certification created");
        Ok(request)
    }

    pub fn replace_certification(&mut self, request: CertificationRequest) -> Result<(), StorageError> {
        self.replace(request)
    }

    pub fn remove_certification(&mut self, id: &str) -> Result<CertificationRequest, StorageError> {
        self.remove(id)
    }

    /// Moves the request to the next stage, instantiating that stage's tasks
    /// from the request's own workflow when it still exists.
    pub fn advance_certification(&mut self, id: &str) -> Result<Advance, StorageError> {
        let mut request = self.require::<CertificationRequest>(id)?;
        let workflow = self.find::<Workflow>(&request.workflow)?;
        if workflow.is_none() {
            tracing::warn!(id, workflow = %request.workflow, "workflow missing, advancing without tasks");
        }
        let outcome = lifecycle::advance(&mut request, workflow.as_ref(), &now_timestamp())?;
        self.replace(request)?;
        tracing::info!(id, from = %outcome.from, to = %outcome.to, "certification advanced");
        Ok(outcome)
    }

    pub fn override_certification_status(
        &mut self,
        id: &str,
        stage: CertificationStage,
    ) -> Result<(), StorageError> {
        self.update(id, |request: &mut CertificationRequest| {
            lifecycle::override_status(request, stage, &now_timestamp());
            Ok::<_, StorageError>(())
        })
    }

    /// Replaces one task inside a request; the request is rewritten whole.
    pub fn replace_task(&mut self, request_id: &str, task: CertificationTask) -> Result<(), StorageError> {
        self.update(request_id, |request: &mut CertificationRequest| {
            lifecycle::replace_task(request, task, &now_timestamp())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cert_core::TaskStatus;

    #[test]
    fn filter_by_stage_and_type() {
        let mut store = Store::in_memory();
        let filter = CertificationFilter {
            stage: Some(CertificationStage::Planning),
            kind: Some("da mr".to_string()),
        };
        let found = store.filter_certifications(&filter).expect("filter");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].darp_key, "DARP-127303");
    }

    #[test]
    fn create_then_advance_materializes_tasks() {
        let mut store = Store::in_memory();
        let draft = CertificationDraft {
            darp_key: "DARP-200001".to_string(),
            project_name: "Soak Test".to_string(),
            kind: "DA IR".to_string(),
            target_date: "2026-06-01".to_string(),
            ..Default::default()
        };
        let created = store
            .create_certification(draft, "default-workflow")
            .expect("create");
        assert_eq!(created.tasks.len(), 3);

        let outcome = store.advance_certification(&created.id).expect("advance");
        assert_eq!(outcome.to, CertificationStage::Planning);
        let stored = store.get_certification(&created.id).expect("get");
        assert_eq!(stored.tasks.len(), 6);
        assert_eq!(store.list_certifications().expect("list").len(), 10);
    }

    #[test]
    fn unknown_workflow_rejects_creation() {
        let mut store = Store::in_memory();
        let draft = CertificationDraft {
            darp_key: "DARP-1".to_string(),
            project_name: "x".to_string(),
            kind: "DA IR".to_string(),
            target_date: "2026-06-01".to_string(),
            ..Default::default()
        };
        let err = store.create_certification(draft, "nope").expect_err("missing workflow");
        assert!(err.is_not_found());
    }

    #[test]
    fn task_replacement_goes_through_request() {
        let mut store = Store::in_memory();
        let mut task = store
            .get_certification("DARP-127205")
            .expect("seed")
            .tasks[2]
            .clone();
        task.status = TaskStatus::Review;
        store.replace_task("DARP-127205", task).expect("replace");
        let stored = store.get_certification("DARP-127205").expect("get");
        assert_eq!(stored.tasks[2].status, TaskStatus::Review);

        let mut ghost = stored.tasks[0].clone();
        ghost.id = "ghost".to_string();
        assert!(store.replace_task("DARP-127205", ghost).expect_err("ghost").is_not_found());
    }
}
