use super::Store;
use crate::{KeyValueStore, StorageError};
use cert_core::dashboard::{Dashboard, DashboardKind, DashboardLayout, WidgetSpec};
use cert_core::now_timestamp;

impl<B: KeyValueStore> Store<B> {
    pub fn list_dashboards(&mut self) -> Result<Vec<Dashboard>, StorageError> {
        self.read_collection()
    }

    pub fn get_dashboard(&mut self, id: &str) -> Result<Dashboard, StorageError> {
        self.require(id)
    }

    pub fn create_dashboard(
        &mut self,
        title: &str,
        description: Option<String>,
        kind: DashboardKind,
        created_by: &str,
    ) -> Result<Dashboard, StorageError> {
        let dashboard = Dashboard::new(title, description, kind, created_by, &now_timestamp());
        self.insert(dashboard.clone())?;
        Ok(dashboard)
    }

    /// Whole-dashboard replace; stamps `updatedAt`.
    pub fn replace_dashboard(&mut self, mut dashboard: Dashboard) -> Result<(), StorageError> {
        dashboard.updated_at = now_timestamp();
        self.replace(dashboard)
    }

    pub fn remove_dashboard(&mut self, id: &str) -> Result<Dashboard, StorageError> {
        self.remove(id)
    }

    pub fn add_widget(&mut self, dashboard_id: &str, spec: WidgetSpec) -> Result<DashboardLayout, StorageError> {
        self.update(dashboard_id, |dashboard: &mut Dashboard| {
            dashboard.add_widget(spec, &now_timestamp()).cloned()
        })
    }

    pub fn remove_widget(&mut self, dashboard_id: &str, widget_id: &str) -> Result<DashboardLayout, StorageError> {
        self.update(dashboard_id, |dashboard: &mut Dashboard| {
            dashboard.remove_widget(widget_id, &now_timestamp())
        })
    }

    pub fn place_widget(
        &mut self,
        dashboard_id: &str,
        widget_id: &str,
        (x, y, width, height): (u32, u32, u32, u32),
    ) -> Result<(), StorageError> {
        self.update(dashboard_id, |dashboard: &mut Dashboard| {
            dashboard.place_widget(widget_id, x, y, width, height, &now_timestamp())
        })
    }

    pub fn share_dashboard(&mut self, dashboard_id: &str, user: &str) -> Result<bool, StorageError> {
        self.update(dashboard_id, |dashboard: &mut Dashboard| {
            Ok::<_, StorageError>(dashboard.share_with(user, &now_timestamp()))
        })
    }

    pub fn unshare_dashboard(&mut self, dashboard_id: &str, user: &str) -> Result<bool, StorageError> {
        self.update(dashboard_id, |dashboard: &mut Dashboard| {
            Ok::<_, StorageError>(dashboard.unshare(user, &now_timestamp()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cert_core::dashboard::WidgetKind;

    #[test]
    fn replace_unknown_dashboard_is_not_found() {
        let mut store = Store::in_memory();
        let mut dashboard = store.list_dashboards().expect("list").remove(0);
        dashboard.title = "Renamed".to_string();
        store.replace_dashboard(dashboard.clone()).expect("replace");
        assert_eq!(store.get_dashboard(&dashboard.id).expect("get").title, "Renamed");

        dashboard.id = "missing".to_string();
        let err = store.replace_dashboard(dashboard).expect_err("unknown id");
        assert!(err.is_not_found());
        assert_eq!(store.list_dashboards().expect("list").len(), 4);
    }

    #[test]
    fn seeded_dashboards_exist() {
        let mut store = Store::in_memory();
        let dashboards = store.list_dashboards().expect("list");
        assert_eq!(dashboards.len(), 4);
        assert!(dashboards.iter().all(|d| d.kind == DashboardKind::Default));
    }

    #[test]
    fn widgets_persist_through_store() {
        let mut store = Store::in_memory();
        let created = store
            .create_dashboard("Ops", None, DashboardKind::Custom, "alex")
            .expect("create");
        assert_eq!(created.created_by, "alex");

        let widget = store
            .add_widget(
                &created.id,
                WidgetSpec {
                    kind: WidgetKind::Tasks,
                    title: "Open tasks".to_string(),
                    width: None,
                    height: None,
                    config: None,
                },
            )
            .expect("add");
        store
            .place_widget(&created.id, &widget.id, (6, 0, 6, 8))
            .expect("place");
        let stored = store.get_dashboard(&created.id).expect("get");
        let placed = stored.widget(&widget.id).expect("widget");
        assert_eq!((placed.x, placed.height), (6, 8));

        assert!(store.share_dashboard(&created.id, "sam").expect("share"));
        assert!(!store.share_dashboard(&created.id, "sam").expect("share again"));
        assert!(store.remove_widget(&created.id, "nope").expect_err("missing").is_not_found());
        assert!(store.get_dashboard("nope").expect_err("missing").is_not_found());
    }
}
