use crate::project::ProjectError;
use crate::task::{FINISH_COLUMN, START_COLUMN, TASK_COLUMN, TaskRecord};
use crate::task_validation;
use polars::prelude::PolarsError;
use serde_json::Error as SerdeJsonError;
use std::fmt;
use std::io;

/// Columns a task table cannot be loaded without.
pub const REQUIRED_COLUMNS: [&str; 3] = [TASK_COLUMN, START_COLUMN, FINISH_COLUMN];

#[derive(Debug)]
pub enum PersistenceError {
    Serialization(SerdeJsonError),
    DataFrame(PolarsError),
    Io(io::Error),
    Csv(csv::Error),
    Project(ProjectError),
    MissingColumn(String),
    InvalidData(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Serialization(err) => write!(f, "serialization error: {err}"),
            PersistenceError::DataFrame(err) => write!(f, "dataframe conversion error: {err}"),
            PersistenceError::Io(err) => write!(f, "io error: {err}"),
            PersistenceError::Csv(err) => write!(f, "csv error: {err}"),
            PersistenceError::Project(err) => write!(f, "{err}"),
            PersistenceError::MissingColumn(column) => {
                write!(f, "Missing required column: {column}")
            }
            PersistenceError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<SerdeJsonError> for PersistenceError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Serialization(value)
    }
}

impl From<PolarsError> for PersistenceError {
    fn from(value: PolarsError) -> Self {
        Self::DataFrame(value)
    }
}

impl From<io::Error> for PersistenceError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for PersistenceError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<ProjectError> for PersistenceError {
    fn from(value: ProjectError) -> Self {
        Self::Project(value)
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub fn validate_tasks(tasks: &[TaskRecord]) -> PersistenceResult<()> {
    task_validation::validate_task_collection(tasks)
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))
}

/// Reports the first required column absent from `headers`
/// (trimmed, case-insensitive match).
pub fn validate_columns<S: AsRef<str>>(headers: &[S]) -> PersistenceResult<()> {
    for required in REQUIRED_COLUMNS {
        let present = headers
            .iter()
            .any(|header| header.as_ref().trim().eq_ignore_ascii_case(required));
        if !present {
            return Err(PersistenceError::MissingColumn(required.to_string()));
        }
    }
    Ok(())
}

pub mod file;

pub use file::{
    load_project_from_csv, load_project_from_json, load_tasks_from_csv, read_tasks,
    save_project_to_csv, save_project_to_json, save_tasks_to_csv, tasks_from_csv_str,
    tasks_to_csv_string, write_tasks,
};
