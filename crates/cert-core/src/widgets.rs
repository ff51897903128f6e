//! Data behind dashboard widgets, computed from certification records.

use crate::dashboard::WidgetConfig;
use crate::lifecycle::{stage_label, summarize_by_stage};
use crate::{CertificationRequest, CertificationTask, TaskComment};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem<'a> {
    pub request_id: &'a str,
    pub darp_key: &'a str,
    pub task: &'a CertificationTask,
}

pub fn task_feed<'a>(
    requests: &'a [CertificationRequest],
    config: Option<&WidgetConfig>,
) -> Vec<FeedItem<'a>> {
    let show_completed = config.and_then(|cfg| cfg.show_completed).unwrap_or(false);
    let by_priority = config
        .and_then(|cfg| cfg.sort_by.as_deref())
        .is_some_and(|sort| sort == "priority");

    let mut items: Vec<FeedItem<'a>> = requests
        .iter()
        .flat_map(|request| {
            request.tasks.iter().map(move |task| FeedItem {
                request_id: &request.id,
                darp_key: &request.darp_key,
                task,
            })
        })
        .filter(|item| show_completed || !item.task.status.is_done())
        .collect();

    if by_priority {
        // stable, so record order breaks ties
        items.sort_by_key(|item| item.task.priority.rank());
    }
    items
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: usize,
}

pub fn stage_series(requests: &[CertificationRequest]) -> Vec<SeriesPoint> {
    summarize_by_stage::<&str>(requests, &[])
        .into_iter()
        .map(|entry| SeriesPoint {
            label: stage_label(entry.stage),
            value: entry.total,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry<'a> {
    pub darp_key: &'a str,
    pub task_name: &'a str,
    pub comment: &'a TaskComment,
}

/// Comments across every task, newest first.
pub fn activity(requests: &[CertificationRequest], limit: Option<usize>) -> Vec<ActivityEntry<'_>> {
    let mut entries: Vec<ActivityEntry<'_>> = requests
        .iter()
        .flat_map(|request| {
            request.tasks.iter().flat_map(move |task| {
                task.comments.iter().map(move |comment| ActivityEntry {
                    darp_key: &request.darp_key,
                    task_name: &task.name,
                    comment,
                })
            })
        })
        .collect();
    entries.sort_by(|a, b| b.comment.created_at.cmp(&a.comment.created_at));
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::seed_certifications;
    use crate::lifecycle::add_comment;
    use crate::{TaskPriority, TaskStatus};

    #[test]
    fn feed_hides_done_tasks_by_default() {
        let seeds = seed_certifications();
        let feed = task_feed(&seeds, None);
        assert_eq!(feed.len(), 2);
        assert!(feed.iter().all(|item| item.task.status != TaskStatus::Done));

        let config = WidgetConfig {
            show_completed: Some(true),
            ..Default::default()
        };
        assert_eq!(task_feed(&seeds, Some(&config)).len(), 3);
    }

    #[test]
    fn feed_sorts_by_priority_on_request() {
        let seeds = seed_certifications();
        let config = WidgetConfig {
            sort_by: Some("priority".to_string()),
            ..Default::default()
        };
        let feed = task_feed(&seeds, Some(&config));
        let priorities: Vec<TaskPriority> = feed.iter().map(|item| item.task.priority).collect();
        assert_eq!(priorities, vec![TaskPriority::High, TaskPriority::Medium]);
        assert_eq!(feed[0].darp_key, "DARP-127205");
    }

    #[test]
    fn series_has_one_point_per_stage() {
        let series = stage_series(&seed_certifications());
        assert_eq!(series.len(), 9);
        assert_eq!(series.iter().map(|point| point.value).sum::<usize>(), 9);
        assert_eq!(series[1].label, "Planning");
        assert_eq!(series[1].value, 2);
    }

    #[test]
    fn activity_lists_newest_first() {
        let mut seeds = seed_certifications();
        add_comment(&mut seeds[0], "1", "first", "alex", "2026-01-01T00:00:00.000Z").expect("comment");
        add_comment(&mut seeds[0], "2", "second", "sam", "2026-01-02T00:00:00.000Z").expect("comment");
        let entries = activity(&seeds, None);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].comment.content, "second");
        assert_eq!(entries[0].task_name, "Deliverable Reqs: Chapter Reviews");
        assert_eq!(activity(&seeds, Some(1)).len(), 1);
    }
}
