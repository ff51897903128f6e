use cert_core::{CertificationRequest, CertificationTask, TaskStatus};
use cert_storage::{KeyValueStore, Store};
use crossterm::event::{KeyCode, KeyEvent};

pub const COLUMNS: usize = TaskStatus::ALL.len();

pub struct App<B: KeyValueStore> {
    store: Store<B>,
    /// Record id or DARP key given on the command line.
    target: Option<String>,
    pub request: Option<CertificationRequest>,
    pub column: usize,
    rows: [usize; COLUMNS],
    pub show_detail: bool,
    pub show_help: bool,
    pub last_error: Option<String>,
    should_quit: bool,
}

impl<B: KeyValueStore> App<B> {
    pub fn new(store: Store<B>, target: Option<String>) -> Self {
        Self {
            store,
            target,
            request: None,
            column: 0,
            rows: [0; COLUMNS],
            show_detail: false,
            show_help: false,
            last_error: None,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Drops cached collections and reads the request again.
    pub fn refresh(&mut self) {
        self.store.invalidate();
        self.reload();
    }

    fn reload(&mut self) {
        let requests = match self.store.list_certifications() {
            Ok(requests) => requests,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load certifications");
                self.request = None;
                self.last_error = Some(format!("Failed to load certifications: {err}"));
                return;
            }
        };

        let found = match self.target.as_deref() {
            Some(key) => requests
                .into_iter()
                .find(|request| request.id == key || request.darp_key.eq_ignore_ascii_case(key)),
            None => requests.into_iter().next(),
        };
        match found {
            Some(request) => {
                self.request = Some(request);
                self.last_error = None;
            }
            None => {
                self.request = None;
                self.last_error = Some(match &self.target {
                    Some(key) => format!("Certification '{key}' not found."),
                    None => "No certifications stored.".to_string(),
                });
            }
        }
        self.clamp_rows();
    }

    pub fn column_tasks(&self, column: usize) -> Vec<&CertificationTask> {
        let Some(request) = &self.request else {
            return Vec::new();
        };
        request
            .tasks
            .iter()
            .filter(|task| task.status.column() == column)
            .collect()
    }

    pub fn selected_row(&self, column: usize) -> Option<usize> {
        (!self.column_tasks(column).is_empty()).then(|| self.rows[column])
    }

    pub fn selected_task(&self) -> Option<&CertificationTask> {
        self.column_tasks(self.column)
            .get(self.rows[self.column])
            .copied()
    }

    fn clamp_rows(&mut self) {
        for column in 0..COLUMNS {
            let len = self.column_tasks(column).len();
            self.rows[column] = self.rows[column].min(len.saturating_sub(1));
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Esc => {
                if self.show_help {
                    self.show_help = false;
                } else {
                    self.show_detail = false;
                }
            }
            KeyCode::Left | KeyCode::Char('h') => self.move_column(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_column(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_row(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_row(1),
            KeyCode::Char('H') | KeyCode::Char('<') => self.shift_task(-1),
            KeyCode::Char('L') | KeyCode::Char('>') => self.shift_task(1),
            KeyCode::Char('p') => self.cycle_priority(),
            KeyCode::Char('x') => self.toggle_done(),
            KeyCode::Enter => {
                self.show_help = false;
                self.show_detail = !self.show_detail;
            }
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('?') => {
                self.show_help = !self.show_help;
            }
            _ => {}
        }
    }

    fn move_column(&mut self, delta: isize) {
        let next = self.column as isize + delta;
        if (0..COLUMNS as isize).contains(&next) {
            self.column = next as usize;
        }
    }

    fn move_row(&mut self, delta: isize) {
        let len = self.column_tasks(self.column).len() as isize;
        if len == 0 {
            return;
        }
        let mut next = self.rows[self.column] as isize + delta;
        if next < 0 {
            next = len - 1;
        }
        if next >= len {
            next = 0;
        }
        self.rows[self.column] = next as usize;
    }

    /// Moves the selected card to the neighbouring column.
    fn shift_task(&mut self, delta: isize) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let target = if delta < 0 {
            task.status.previous()
        } else {
            task.status.next()
        };
        let Some(status) = target else {
            return;
        };
        let mut task = task.clone();
        task.status = status;
        self.write_task(task);
    }

    fn cycle_priority(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let mut task = task.clone();
        task.priority = task.priority.cycle();
        self.write_task(task);
    }

    fn toggle_done(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let mut task = task.clone();
        task.status = if task.status.is_done() {
            TaskStatus::Todo
        } else {
            TaskStatus::Done
        };
        self.write_task(task);
    }

    /// Persists one task and keeps the cursor on it.
    fn write_task(&mut self, task: CertificationTask) {
        let Some(request_id) = self.request.as_ref().map(|request| request.id.clone()) else {
            return;
        };
        let task_id = task.id.clone();
        let column = task.status.column();
        if let Err(err) = self.store.replace_task(&request_id, task) {
            tracing::warn!(request = %request_id, task = %task_id, error = %err, "task update failed");
            self.last_error = Some(format!("Failed to save task: {err}"));
            return;
        }
        tracing::debug!(request = %request_id, task = %task_id, "task saved");

        self.reload();
        let row = self
            .column_tasks(column)
            .iter()
            .position(|task| task.id == task_id);
        if let Some(row) = row {
            self.column = column;
            self.rows[column] = row;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cert_core::TaskPriority;
    use cert_storage::MemoryStore;
    use crossterm::event::KeyModifiers;

    fn seeded_app() -> App<MemoryStore> {
        let mut app = App::new(Store::in_memory(), Some("DARP-127205".to_string()));
        app.refresh();
        app
    }

    fn press(app: &mut App<MemoryStore>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn stored_task(app: &mut App<MemoryStore>, task_id: &str) -> CertificationTask {
        let request_id = app.request.as_ref().expect("request").id.clone();
        let request = app.store.get_certification(&request_id).expect("stored");
        request.find_task(task_id).expect("task").clone()
    }

    #[test]
    fn columns_split_tasks_by_status() {
        let app = seeded_app();
        let counts: Vec<usize> = (0..COLUMNS).map(|col| app.column_tasks(col).len()).collect();
        assert_eq!(counts, vec![1, 1, 0, 1]);
        assert_eq!(app.selected_task().map(|task| task.id.as_str()), Some("3"));
    }

    #[test]
    fn shift_moves_card_and_cursor_follows() {
        let mut app = seeded_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('L'), KeyModifiers::SHIFT));
        assert_eq!(stored_task(&mut app, "3").status, TaskStatus::InProgress);
        assert_eq!(app.column, 1);
        assert_eq!(app.selected_task().map(|task| task.id.as_str()), Some("3"));

        press(&mut app, KeyCode::Char('<'));
        assert_eq!(stored_task(&mut app, "3").status, TaskStatus::Todo);
        assert_eq!(app.column, 0);
    }

    #[test]
    fn shift_past_the_edge_is_ignored() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::Char('H'));
        assert_eq!(stored_task(&mut app, "3").status, TaskStatus::Todo);
        assert!(app.last_error.is_none());
    }

    #[test]
    fn priority_cycles_and_done_toggles() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::Char('p'));
        assert_eq!(stored_task(&mut app, "3").priority, TaskPriority::Low);

        press(&mut app, KeyCode::Char('x'));
        assert_eq!(stored_task(&mut app, "3").status, TaskStatus::Done);
        assert_eq!(app.column, 3);

        press(&mut app, KeyCode::Char('x'));
        assert_eq!(stored_task(&mut app, "3").status, TaskStatus::Todo);
    }

    #[test]
    fn other_tasks_are_untouched_by_a_move() {
        let mut app = seeded_app();
        let before = stored_task(&mut app, "1");
        press(&mut app, KeyCode::Char('>'));
        assert_eq!(stored_task(&mut app, "1"), before);
    }

    #[test]
    fn cursor_wraps_within_column() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::Char('l'));
        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.column, 2);
        assert!(app.selected_task().is_none());
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.column, 3);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected_task().map(|task| task.id.as_str()), Some("1"));
    }

    #[test]
    fn unknown_target_shows_empty_state() {
        let mut app = App::new(Store::in_memory(), Some("DARP-000000".to_string()));
        app.refresh();
        assert!(app.request.is_none());
        assert!(app
            .last_error
            .as_deref()
            .is_some_and(|message| message.contains("not found")));
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());
    }

    #[test]
    fn panes_toggle() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);
        press(&mut app, KeyCode::Enter);
        assert!(app.show_detail);
        assert!(!app.show_help);
        press(&mut app, KeyCode::Esc);
        assert!(!app.show_detail);
    }
}
