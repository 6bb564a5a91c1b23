use std::sync::Arc;

use serde_json::{json, Map};
use uuid::Uuid;

use crate::database::models::{Milestone, Project, Task, TaskStatus};
use crate::database::{DatabaseError, Repository, Store};
use crate::filter::Filter;

/// Whole-number completion percentage of a task set
pub fn completion_percent(completed: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as i32
}

/// Recomputes the progress fields projects and milestones derive from their tasks.
///
/// Task handlers call this after every create, update and delete.
pub struct ProgressService {
    store: Arc<dyn Store>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn tasks(&self, filter: Filter) -> Result<(usize, usize), DatabaseError> {
        let tasks = Repository::<Task>::new(self.store.clone()).select_any(filter).await?;
        let done = tasks.iter().filter(|t| t.status == TaskStatus::Done).count();
        Ok((done, tasks.len()))
    }

    pub async fn recompute_project(&self, project_id: Uuid) -> Result<i32, DatabaseError> {
        let (done, total) = self.tasks(Filter::new().eq("project_id", project_id)).await?;
        let progress = completion_percent(done, total);

        let mut changes = Map::new();
        changes.insert("progress_percent".into(), json!(progress));
        Repository::<Project>::new(self.store.clone())
            .update(Filter::by_id(project_id), changes)
            .await?;
        Ok(progress)
    }

    pub async fn recompute_milestone(&self, milestone_id: Uuid) -> Result<i32, DatabaseError> {
        let (done, total) = self.tasks(Filter::new().eq("milestone_id", milestone_id)).await?;
        let progress = completion_percent(done, total);

        let mut changes = Map::new();
        changes.insert("progress".into(), json!(progress));
        changes.insert("tasks_count".into(), json!(total));
        changes.insert("completed_tasks".into(), json!(done));
        Repository::<Milestone>::new(self.store.clone())
            .update(Filter::by_id(milestone_id), changes)
            .await?;
        Ok(progress)
    }

    /// Refresh the project and every milestone the write touched
    pub async fn after_task_write(&self, project_id: Uuid, milestones: &[Option<Uuid>]) -> Result<(), DatabaseError> {
        self.recompute_project(project_id).await?;

        let mut seen: Vec<Uuid> = Vec::new();
        for milestone_id in milestones.iter().flatten() {
            if !seen.contains(milestone_id) {
                seen.push(*milestone_id);
                self.recompute_milestone(*milestone_id).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_rounds_to_whole_percent() {
        assert_eq!(completion_percent(0, 0), 0);
        assert_eq!(completion_percent(1, 3), 33);
        assert_eq!(completion_percent(2, 3), 67);
        assert_eq!(completion_percent(4, 4), 100);
    }
}
