use crate::dates::shift_days;
use crate::task::TaskRecord;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskValidationError {
    message: String,
}

impl TaskValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TaskValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TaskValidationError {}

pub fn validate_task(task: &TaskRecord) -> Result<(), TaskValidationError> {
    if task.name.trim().is_empty() {
        return Err(TaskValidationError::new("task name is required"));
    }

    if task.duration <= 0 {
        return Err(TaskValidationError::new(format!(
            "task '{}' has non-positive duration {}",
            task.name, task.duration
        )));
    }

    if shift_days(task.start, task.duration).is_none() {
        return Err(TaskValidationError::new(format!(
            "task '{}' starting {} for {} days ends outside the supported calendar",
            task.name, task.start, task.duration
        )));
    }

    if task.finish < task.start {
        return Err(TaskValidationError::new(format!(
            "task '{}' finishes {} before it starts {}",
            task.name, task.finish, task.start
        )));
    }

    if task.completion_pct > 100 {
        return Err(TaskValidationError::new(format!(
            "task '{}' has invalid completion {} (must be between 0 and 100)",
            task.name, task.completion_pct
        )));
    }

    Ok(())
}

/// Validates every task; the error names the 1-based row that failed.
pub fn validate_task_collection(tasks: &[TaskRecord]) -> Result<(), TaskValidationError> {
    for (idx, task) in tasks.iter().enumerate() {
        validate_task(task)
            .map_err(|err| TaskValidationError::new(format!("row {}: {err}", idx + 1)))?;
    }
    Ok(())
}
