use super::{PersistenceError, PersistenceResult};
use crate::dates::{format_calendar_date, parse_calendar_date};
use crate::metadata::ProjectMetadata;
use crate::project::Project;
use crate::task::{
    CATEGORY_COLUMN, COMPLETION_COLUMN, Category, DURATION_COLUMN, FINISH_COLUMN, NOTES_COLUMN,
    RESOURCE_COLUMN, START_COLUMN, TASK_COLUMN, TASK_COLUMNS, TaskRecord, ZONE_COLUMN,
};
use chrono::NaiveDate;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

#[derive(Serialize, Deserialize)]
struct ProjectSnapshot {
    metadata: ProjectMetadata,
    tasks: Vec<TaskRecord>,
}

impl ProjectSnapshot {
    fn from_project(project: &Project) -> PersistenceResult<Self> {
        let tasks = project.tasks()?;
        super::validate_tasks(&tasks)?;
        Ok(Self {
            metadata: project.metadata().clone(),
            tasks,
        })
    }

    fn into_project(self) -> PersistenceResult<Project> {
        super::validate_tasks(&self.tasks)?;
        Ok(Project::with_tasks(self.metadata, self.tasks)?)
    }
}

pub fn save_project_to_json<P: AsRef<Path>>(project: &Project, path: P) -> PersistenceResult<()> {
    let snapshot = ProjectSnapshot::from_project(project)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

pub fn load_project_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Project> {
    let file = File::open(path)?;
    let snapshot: ProjectSnapshot = serde_json::from_reader(file)?;
    snapshot.into_project()
}

#[derive(Serialize)]
struct TaskCsvRecord<'a> {
    #[serde(rename = "Task")]
    task: &'a str,
    #[serde(rename = "Resource")]
    resource: &'a str,
    #[serde(rename = "Start")]
    start: String,
    #[serde(rename = "Finish")]
    finish: String,
    #[serde(rename = "Duration")]
    duration: i64,
    #[serde(rename = "Completion_pct")]
    completion_pct: u8,
    #[serde(rename = "Trustee_Zone")]
    zone: u32,
    #[serde(rename = "Category")]
    category: &'static str,
    #[serde(rename = "Notes")]
    notes: &'a str,
}

impl<'a> From<&'a TaskRecord> for TaskCsvRecord<'a> {
    fn from(task: &'a TaskRecord) -> Self {
        Self {
            task: &task.name,
            resource: &task.resource,
            start: format_calendar_date(task.start),
            finish: format_calendar_date(task.finish),
            duration: task.duration,
            completion_pct: task.completion_pct,
            zone: task.zone,
            category: task.category.as_str(),
            notes: &task.notes,
        }
    }
}

/// Writes the nine-column task table, header row included even when empty.
pub fn write_tasks<W: Write>(writer: W, tasks: &[TaskRecord]) -> PersistenceResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(TASK_COLUMNS)?;
    for task in tasks {
        writer.serialize(TaskCsvRecord::from(task))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn tasks_to_csv_string(tasks: &[TaskRecord]) -> PersistenceResult<String> {
    let mut buffer = Vec::new();
    write_tasks(&mut buffer, tasks)?;
    String::from_utf8(buffer)
        .map_err(|err| PersistenceError::InvalidData(format!("csv output is not utf-8: {err}")))
}

/// Header positions; columns may come in any order.
struct ColumnLayout {
    task: usize,
    start: usize,
    finish: usize,
    resource: Option<usize>,
    duration: Option<usize>,
    completion: Option<usize>,
    zone: Option<usize>,
    category: Option<usize>,
    notes: Option<usize>,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord) -> PersistenceResult<Self> {
        let names: Vec<&str> = headers.iter().collect();
        super::validate_columns(&names)?;
        let find = |column: &str| {
            names
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(column))
        };
        let required = |column: &str| {
            find(column).ok_or_else(|| PersistenceError::MissingColumn(column.to_string()))
        };
        Ok(Self {
            task: required(TASK_COLUMN)?,
            start: required(START_COLUMN)?,
            finish: required(FINISH_COLUMN)?,
            resource: find(RESOURCE_COLUMN),
            duration: find(DURATION_COLUMN),
            completion: find(COMPLETION_COLUMN),
            zone: find(ZONE_COLUMN),
            category: find(CATEGORY_COLUMN),
            notes: find(NOTES_COLUMN),
        })
    }

    fn parse_row(&self, record: &StringRecord, row: usize) -> PersistenceResult<TaskRecord> {
        let cell = |idx: usize| record.get(idx).unwrap_or("");
        let optional = |idx: Option<usize>| idx.map(cell).map(str::trim).filter(|v| !v.is_empty());

        let start = parse_date(cell(self.start), START_COLUMN, row)?;
        let finish = parse_date(cell(self.finish), FINISH_COLUMN, row)?;
        let category = match optional(self.category) {
            Some(raw) => Category::from_str(raw)
                .map_err(|msg| PersistenceError::InvalidData(format!("row {row}: {msg}")))?,
            None => Category::Planning,
        };
        let resource = match self.resource {
            Some(idx) => cell(idx).to_string(),
            None => category.default_resource().to_string(),
        };
        let duration = match optional(self.duration) {
            Some(raw) => parse_integer(raw, DURATION_COLUMN, row)?,
            None => (finish - start).num_days(),
        };
        let completion_pct = match optional(self.completion) {
            Some(raw) => {
                let value = parse_integer(raw, COMPLETION_COLUMN, row)?;
                u8::try_from(value).ok().filter(|pct| *pct <= 100).ok_or_else(|| {
                    PersistenceError::InvalidData(format!(
                        "row {row}: {COMPLETION_COLUMN} {value} must be between 0 and 100"
                    ))
                })?
            }
            None => 0,
        };
        let zone = match optional(self.zone) {
            Some(raw) => {
                let value = parse_integer(raw, ZONE_COLUMN, row)?;
                u32::try_from(value).map_err(|_| {
                    PersistenceError::InvalidData(format!(
                        "row {row}: {ZONE_COLUMN} {value} must be between 0 and {}",
                        u32::MAX
                    ))
                })?
            }
            None => 0,
        };

        Ok(TaskRecord {
            name: cell(self.task).to_string(),
            resource,
            start,
            finish,
            duration,
            completion_pct,
            zone,
            category,
            notes: self.notes.map(cell).unwrap_or_default().to_string(),
        })
    }
}

/// Reads a task table. Blank lines are skipped; any bad cell fails the
/// whole read.
pub fn read_tasks<R: Read>(reader: R) -> PersistenceResult<Vec<TaskRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let layout = ColumnLayout::from_headers(&headers)?;

    let mut tasks = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        tasks.push(layout.parse_row(&record, idx + 1)?);
    }
    super::validate_tasks(&tasks)?;
    Ok(tasks)
}

pub fn tasks_from_csv_str(text: &str) -> PersistenceResult<Vec<TaskRecord>> {
    read_tasks(text.as_bytes())
}

pub fn save_tasks_to_csv<P: AsRef<Path>>(tasks: &[TaskRecord], path: P) -> PersistenceResult<()> {
    super::validate_tasks(tasks)?;
    let file = File::create(path)?;
    write_tasks(file, tasks)
}

pub fn load_tasks_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<TaskRecord>> {
    let file = File::open(path)?;
    read_tasks(file)
}

pub fn save_project_to_csv<P: AsRef<Path>>(project: &Project, path: P) -> PersistenceResult<()> {
    save_tasks_to_csv(&project.tasks()?, path)
}

/// Loads a task table into a project with default metadata.
pub fn load_project_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Project> {
    let tasks = load_tasks_from_csv(path)?;
    Ok(Project::with_tasks(ProjectMetadata::default(), tasks)?)
}

fn parse_date(input: &str, column: &str, row: usize) -> PersistenceResult<NaiveDate> {
    parse_calendar_date(input).ok_or_else(|| {
        PersistenceError::InvalidData(format!(
            "Error converting date columns: row {row}: invalid {column} '{input}'"
        ))
    })
}

/// Integer cell; a float spelling with no fractional part (`3.0`) is accepted.
fn parse_integer(input: &str, column: &str, row: usize) -> PersistenceResult<i64> {
    let trimmed = input.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => Ok(value as i64),
        _ => Err(PersistenceError::InvalidData(format!(
            "row {row}: invalid integer '{input}' in {column}"
        ))),
    }
}
