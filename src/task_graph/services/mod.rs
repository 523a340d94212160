//! Application services for the task graph.

mod graph;

pub use graph::{
    CreateProjectRequest, ProjectGraph, TaskGraphService, TaskGraphServiceError,
    TaskGraphServiceResult,
};
