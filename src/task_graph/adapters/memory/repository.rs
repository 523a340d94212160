//! In-memory repository for the task graph.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::task_graph::{
    domain::{Phase, PhaseId, Project, ProjectId, Task, TaskId},
    ports::{TaskGraphRepository, TaskGraphRepositoryError, TaskGraphRepositoryResult},
};

/// Thread-safe in-memory task graph repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskGraphRepository {
    state: Arc<RwLock<InMemoryTaskGraphState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskGraphState {
    projects: HashMap<ProjectId, Project>,
    phases: HashMap<PhaseId, Phase>,
    tasks: HashMap<TaskId, Task>,
}

impl InMemoryTaskGraphRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> TaskGraphRepositoryResult<RwLockReadGuard<'_, InMemoryTaskGraphState>> {
        self.state.read().map_err(|err| {
            TaskGraphRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> TaskGraphRepositoryResult<RwLockWriteGuard<'_, InMemoryTaskGraphState>> {
        self.state.write().map_err(|err| {
            TaskGraphRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

fn phase_position(state: &InMemoryTaskGraphState, id: PhaseId) -> u8 {
    state.phases.get(&id).map_or(u8::MAX, Phase::position)
}

#[async_trait]
impl TaskGraphRepository for InMemoryTaskGraphRepository {
    async fn store_project(
        &self,
        project: &Project,
        phases: &[Phase],
        tasks: &[Task],
    ) -> TaskGraphRepositoryResult<()> {
        let mut state = self.write()?;
        if state.projects.contains_key(&project.id()) {
            return Err(TaskGraphRepositoryError::DuplicateProject(project.id()));
        }
        state.projects.insert(project.id(), project.clone());
        for phase in phases {
            state.phases.insert(phase.id(), phase.clone());
        }
        for task in tasks {
            state.tasks.insert(task.id(), task.clone());
        }
        Ok(())
    }

    async fn update_project(&self, project: &Project) -> TaskGraphRepositoryResult<()> {
        let mut state = self.write()?;
        let slot = state
            .projects
            .get_mut(&project.id())
            .ok_or(TaskGraphRepositoryError::ProjectNotFound(project.id()))?;
        *slot = project.clone();
        Ok(())
    }

    async fn find_project(&self, id: ProjectId) -> TaskGraphRepositoryResult<Option<Project>> {
        Ok(self.read()?.projects.get(&id).cloned())
    }

    async fn list_projects(&self) -> TaskGraphRepositoryResult<Vec<Project>> {
        let state = self.read()?;
        let mut projects: Vec<Project> = state.projects.values().cloned().collect();
        projects.sort_by_key(|project| (project.created_at(), project.id()));
        Ok(projects)
    }

    async fn phases_for_project(&self, id: ProjectId) -> TaskGraphRepositoryResult<Vec<Phase>> {
        let state = self.read()?;
        let mut phases: Vec<Phase> = state
            .phases
            .values()
            .filter(|phase| phase.project_id() == id)
            .cloned()
            .collect();
        phases.sort_by_key(Phase::position);
        Ok(phases)
    }

    async fn find_phase(&self, id: PhaseId) -> TaskGraphRepositoryResult<Option<Phase>> {
        Ok(self.read()?.phases.get(&id).cloned())
    }

    async fn update_phase(&self, phase: &Phase) -> TaskGraphRepositoryResult<()> {
        let mut state = self.write()?;
        let slot = state
            .phases
            .get_mut(&phase.id())
            .ok_or(TaskGraphRepositoryError::PhaseNotFound(phase.id()))?;
        *slot = phase.clone();
        Ok(())
    }

    async fn find_task(&self, id: TaskId) -> TaskGraphRepositoryResult<Option<Task>> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    async fn tasks_for_phase(&self, id: PhaseId) -> TaskGraphRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| task.phase_id() == id)
            .cloned()
            .collect();
        tasks.sort_by_key(Task::position);
        Ok(tasks)
    }

    async fn tasks_for_project(&self, id: ProjectId) -> TaskGraphRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| task.project_id() == id)
            .cloned()
            .collect();
        tasks.sort_by_key(|task| (phase_position(&state, task.phase_id()), task.position()));
        Ok(tasks)
    }

    async fn compare_and_swap_task(&self, task: &Task) -> TaskGraphRepositoryResult<bool> {
        let mut state = self.write()?;
        let stored = state
            .tasks
            .get_mut(&task.id())
            .ok_or(TaskGraphRepositoryError::TaskNotFound(task.id()))?;
        if stored.row_version() != task.row_version() {
            return Ok(false);
        }
        let next_row_version = task.row_version().saturating_add(1);
        *stored = task.clone().with_row_version(next_row_version);
        Ok(true)
    }
}
