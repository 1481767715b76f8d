use crate::metadata::ProjectMetadata;
use crate::task::{
    COMPLETION_COLUMN, CATEGORY_COLUMN, Category, DURATION_COLUMN, FINISH_COLUMN, NOTES_COLUMN,
    RESOURCE_COLUMN, START_COLUMN, TASK_COLUMN, TaskRecord, ZONE_COLUMN,
};
use crate::task_validation::{self, TaskValidationError};
use crate::dates::shift_days;
use chrono::NaiveDate;
use polars::prelude::PlSmallStr;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug)]
pub enum ProjectError {
    DataFrame(PolarsError),
    Validation(TaskValidationError),
    RowOutOfRange { row: usize, len: usize },
}

impl fmt::Display for ProjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectError::DataFrame(err) => write!(f, "dataframe error: {err}"),
            ProjectError::Validation(err) => write!(f, "invalid task: {err}"),
            ProjectError::RowOutOfRange { row, len } => {
                write!(f, "row {row} is out of range (table has {len} rows)")
            }
        }
    }
}

impl std::error::Error for ProjectError {}

impl From<PolarsError> for ProjectError {
    fn from(value: PolarsError) -> Self {
        Self::DataFrame(value)
    }
}

impl From<TaskValidationError> for ProjectError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type ProjectResult<T> = Result<T, ProjectError>;

/// Timeline filters. Empty lists and `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub categories: Vec<Category>,
    pub zones: Vec<u32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub text: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &TaskRecord) -> bool {
        if !self.categories.is_empty() && !self.categories.contains(&task.category) {
            return false;
        }
        if !self.zones.is_empty() && !self.zones.contains(&task.zone) {
            return false;
        }
        if self.from.is_some_and(|from| task.finish < from) {
            return false;
        }
        if self.to.is_some_and(|to| task.start > to) {
            return false;
        }
        match self.text.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                [&task.name, &task.resource, &task.notes]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Share of fully complete tasks, rounded to one decimal.
    pub completion_percentage: f64,
    pub category_counts: BTreeMap<Category, usize>,
    /// Counts for assigned zones only; zone 0 is left out.
    pub zone_counts: BTreeMap<u32, usize>,
}

impl ProjectSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!(
            "completed={}/{} ({}%)",
            self.completed_tasks, self.total_tasks, self.completion_percentage
        ));
        if !self.category_counts.is_empty() {
            let categories = self
                .category_counts
                .iter()
                .map(|(category, count)| format!("{category}={count}"))
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("categories: {categories}"));
        }
        if !self.zone_counts.is_empty() {
            let zones = self
                .zone_counts
                .iter()
                .map(|(zone, count)| format!("{zone}={count}"))
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("zones: {zones}"));
        }
        parts.join("\n")
    }
}

fn offset_from(today: NaiveDate, offset: i64) -> Result<NaiveDate, TaskValidationError> {
    shift_days(today, offset).ok_or_else(|| {
        TaskValidationError::new(format!("{today} plus {offset} days is outside the calendar"))
    })
}

/// Generic eight-task demo plan, with explicit resources and the build
/// phases folded onto the installation categories.
pub fn sample_tasks(today: NaiveDate) -> Result<Vec<TaskRecord>, TaskValidationError> {
    let rows: [(&str, &str, i64, i64, u8, u32, Category); 8] = [
        ("Project Planning", "Project Manager", 0, 3, 100, 0, Category::Planning),
        ("Requirements Gathering", "Analyst Team", 2, 4, 80, 0, Category::Planning),
        ("System Design", "Design Team", 5, 6, 60, 0, Category::Planning),
        ("Implementation Phase 1", "Development Team", 10, 6, 40, 1, Category::Installation),
        ("Implementation Phase 2", "Development Team", 15, 6, 20, 2, Category::Installation),
        ("Testing", "QA Team", 20, 5, 10, 0, Category::IssueResolution),
        ("Deployment", "Operations Team", 25, 3, 0, 0, Category::Delivery),
        ("Documentation", "Technical Writer", 22, 5, 0, 0, Category::Closeout),
    ];
    rows.into_iter()
        .map(|(name, resource, offset, days, pct, zone, category)| {
            Ok(TaskRecord::try_new(name, category, offset_from(today, offset)?, days)?
                .with_resource(resource)
                .with_completion(pct)
                .with_zone(zone))
        })
        .collect()
}

/// The editable task table behind the dashboard.
pub struct Project {
    df: DataFrame,
    metadata: ProjectMetadata,
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

impl Project {
    pub fn new() -> Self {
        Self::with_metadata(ProjectMetadata::default())
    }

    pub fn with_metadata(metadata: ProjectMetadata) -> Self {
        Self {
            df: DataFrame::empty_with_schema(&TaskRecord::schema()),
            metadata,
        }
    }

    pub fn with_tasks(metadata: ProjectMetadata, tasks: Vec<TaskRecord>) -> ProjectResult<Self> {
        let mut project = Self::with_metadata(metadata);
        project.replace_all(tasks)?;
        Ok(project)
    }

    /// The default rollout: planning, three zone deliveries and
    /// installations, one issue, one revisit and closeout.
    pub fn sample(today: NaiveDate) -> ProjectResult<Self> {
        let at = |offset: i64| offset_from(today, offset);
        let tasks = vec![
            TaskRecord::new("Planning & Preparation", Category::Planning, at(0)?, 2)
                .with_completion(100),
            TaskRecord::new("Data Closet Assessment", Category::Planning, at(1)?, 3)
                .with_completion(80)
                .with_resource("Technical Team"),
            TaskRecord::new("Team Assignments", Category::Planning, at(2)?, 1).with_completion(50),
            TaskRecord::new("Zone 1 - School A: Delivery", Category::Delivery, at(3)?, 1)
                .with_zone(1),
            TaskRecord::new("Zone 1 - School A: Installation", Category::Installation, at(4)?, 1)
                .with_zone(1),
            TaskRecord::new("Zone 1 - School B: Delivery", Category::Delivery, at(5)?, 1)
                .with_zone(1),
            TaskRecord::new("Zone 1 - School B: Installation", Category::Installation, at(6)?, 1)
                .with_zone(1),
            TaskRecord::new("Zone 2 - School C: Delivery", Category::Delivery, at(7)?, 1)
                .with_zone(2),
            TaskRecord::new("Zone 2 - School C: Installation", Category::Installation, at(8)?, 1)
                .with_zone(2),
            TaskRecord::new(
                "School with Issues - Arch St. PS",
                Category::IssueResolution,
                at(9)?,
                2,
            )
            .with_completion(30)
            .with_zone(1)
            .with_notes("Wall mounted rack issue"),
            TaskRecord::new("School for Revisit - Dunlop PS", Category::Revisit, at(10)?, 1)
                .with_zone(3)
                .with_notes("Faulty UPS replacement"),
            TaskRecord::new("Final Documentation", Category::Closeout, at(15)?, 3),
        ];
        Self::with_tasks(ProjectMetadata::default(), tasks)
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn metadata(&self) -> &ProjectMetadata {
        &self.metadata
    }

    pub fn set_project_name(&mut self, name: impl Into<String>) {
        self.metadata.project_name = name.into();
    }

    pub fn set_project_description(&mut self, description: impl Into<String>) {
        self.metadata.project_description = description.into();
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn tasks(&self) -> Result<Vec<TaskRecord>, PolarsError> {
        let mut tasks = Vec::with_capacity(self.df.height());
        for idx in 0..self.df.height() {
            tasks.push(TaskRecord::from_dataframe_row(&self.df, idx)?);
        }
        Ok(tasks)
    }

    pub fn task(&self, row: usize) -> ProjectResult<TaskRecord> {
        self.check_row(row)?;
        Ok(TaskRecord::from_dataframe_row(&self.df, row)?)
    }

    pub fn add_task(&mut self, task: TaskRecord) -> ProjectResult<()> {
        task_validation::validate_task(&task)?;
        let new_row = task.to_dataframe_row()?;
        self.df = self.df.vstack(&new_row)?;
        Ok(())
    }

    /// Replaces the whole table; nothing changes if any task is invalid.
    pub fn replace_all(&mut self, tasks: Vec<TaskRecord>) -> ProjectResult<()> {
        task_validation::validate_task_collection(&tasks)?;
        let mut df = DataFrame::empty_with_schema(&TaskRecord::schema());
        for task in &tasks {
            df = df.vstack(&task.to_dataframe_row()?)?;
        }
        self.df = df;
        Ok(())
    }

    /// Removes every row named `name`; returns how many went.
    pub fn delete_task(&mut self, name: &str) -> ProjectResult<usize> {
        let before = self.df.height();
        let keep: BooleanChunked = self
            .df
            .column(TASK_COLUMN)?
            .str()?
            .into_iter()
            .map(|task| Some(task != Some(name)))
            .collect();
        self.df = self.df.filter(&keep)?;
        Ok(before - self.df.height())
    }

    pub fn replace_task(&mut self, row: usize, task: TaskRecord) -> ProjectResult<()> {
        self.update_row(row, |current| {
            *current = task;
            Ok(())
        })
    }

    pub fn set_completion(&mut self, row: usize, completion_pct: u8) -> ProjectResult<()> {
        if completion_pct > 100 {
            return Err(TaskValidationError::new(format!(
                "completion {completion_pct} must be between 0 and 100"
            ))
            .into());
        }
        self.check_row(row)?;
        self.update_i32_column(COMPLETION_COLUMN, row, i32::from(completion_pct))
    }

    pub fn set_zone(&mut self, row: usize, zone: u32) -> ProjectResult<()> {
        self.check_row(row)?;
        self.update_u32_column(ZONE_COLUMN, row, zone)
    }

    pub fn set_notes(&mut self, row: usize, notes: &str) -> ProjectResult<()> {
        self.check_row(row)?;
        self.update_string_column(NOTES_COLUMN, row, notes)
    }

    pub fn set_resource(&mut self, row: usize, resource: &str) -> ProjectResult<()> {
        self.check_row(row)?;
        self.update_string_column(RESOURCE_COLUMN, row, resource)
    }

    pub fn set_category(&mut self, row: usize, category: Category) -> ProjectResult<()> {
        self.check_row(row)?;
        self.update_string_column(CATEGORY_COLUMN, row, category.as_str())
    }

    /// Moves the task to `start`, keeping its duration.
    pub fn set_start(&mut self, row: usize, start: NaiveDate) -> ProjectResult<()> {
        self.update_row(row, |task| {
            task.start = start;
            task.recalculate_finish()
        })
    }

    pub fn set_duration(&mut self, row: usize, duration_days: i64) -> ProjectResult<()> {
        self.update_row(row, |task| {
            task.duration = duration_days;
            task.recalculate_finish()
        })
    }

    /// `finish = start + duration` for every row that has both values.
    /// Nothing changes if any row would end outside the calendar.
    pub fn recalculate_finish_dates(&mut self) -> ProjectResult<()> {
        let height = self.df.height();
        let start = self.df.column(START_COLUMN)?.date()?;
        let finish = self.df.column(FINISH_COLUMN)?.date()?;
        let duration = self.df.column(DURATION_COLUMN)?.i64()?;

        let mut values: Vec<Option<i32>> = Vec::with_capacity(height);
        for idx in 0..height {
            let value = match (start.get(idx), duration.get(idx)) {
                (Some(start), Some(days)) => {
                    let recalculated = i32::try_from(days)
                        .ok()
                        .and_then(|days| start.checked_add(days))
                        .filter(|days| TaskRecord::date_from_i32(*days).is_some());
                    Some(recalculated.ok_or_else(|| {
                        TaskValidationError::new(format!(
                            "row {}: duration {days} ends outside the supported calendar",
                            idx + 1
                        ))
                    })?)
                }
                _ => None,
            };
            values.push(value.or_else(|| finish.get(idx)));
        }
        let series =
            Series::new(PlSmallStr::from_static(FINISH_COLUMN), values).cast(&DataType::Date)?;
        self.df.replace(FINISH_COLUMN, series)?;
        Ok(())
    }

    pub fn filtered_frame(&self, filter: &TaskFilter) -> ProjectResult<DataFrame> {
        let mask: BooleanChunked = self
            .tasks()?
            .iter()
            .map(|task| Some(filter.matches(task)))
            .collect();
        Ok(self.df.filter(&mask)?)
    }

    pub fn filter(&self, filter: &TaskFilter) -> ProjectResult<Vec<TaskRecord>> {
        Ok(self
            .tasks()?
            .into_iter()
            .filter(|task| filter.matches(task))
            .collect())
    }

    pub fn summary(&self) -> ProjectResult<ProjectSummary> {
        let total_tasks = self.df.height();
        let completion = self.df.column(COMPLETION_COLUMN)?.i32()?;
        let completed_tasks = completion
            .into_iter()
            .filter(|pct| *pct == Some(100))
            .count();
        let completion_percentage = if total_tasks > 0 {
            ((completed_tasks as f64 / total_tasks as f64) * 1000.0).round() / 10.0
        } else {
            0.0
        };

        let mut category_counts = BTreeMap::new();
        for raw in self.df.column(CATEGORY_COLUMN)?.str()?.into_iter().flatten() {
            if let Ok(category) = Category::from_str(raw) {
                *category_counts.entry(category).or_insert(0) += 1;
            }
        }

        let mut zone_counts = BTreeMap::new();
        for zone in self.df.column(ZONE_COLUMN)?.u32()?.into_iter().flatten() {
            if zone > 0 {
                *zone_counts.entry(zone).or_insert(0) += 1;
            }
        }

        Ok(ProjectSummary {
            total_tasks,
            completed_tasks,
            completion_percentage,
            category_counts,
            zone_counts,
        })
    }

    fn check_row(&self, row: usize) -> ProjectResult<()> {
        let len = self.df.height();
        if row >= len {
            return Err(ProjectError::RowOutOfRange { row, len });
        }
        Ok(())
    }

    fn update_row<F>(&mut self, row: usize, mutator: F) -> ProjectResult<()>
    where
        F: FnOnce(&mut TaskRecord) -> Result<(), TaskValidationError>,
    {
        self.check_row(row)?;
        let mut tasks = self.tasks()?;
        mutator(&mut tasks[row])?;
        self.replace_all(tasks)
    }

    fn update_string_column(
        &mut self,
        column_name: &str,
        row: usize,
        new_value: &str,
    ) -> ProjectResult<()> {
        let new_series = self
            .df
            .column(column_name)?
            .str()?
            .into_iter()
            .enumerate()
            .map(|(idx, val)| if idx == row { Some(new_value) } else { val })
            .collect::<StringChunked>()
            .into_series()
            .with_name(column_name.into());

        self.df.replace(column_name, new_series)?;
        Ok(())
    }

    fn update_i32_column(
        &mut self,
        column_name: &str,
        row: usize,
        new_value: i32,
    ) -> ProjectResult<()> {
        let new_series = self
            .df
            .column(column_name)?
            .i32()?
            .into_iter()
            .enumerate()
            .map(|(idx, val)| if idx == row { Some(new_value) } else { val })
            .collect::<Int32Chunked>()
            .into_series()
            .with_name(column_name.into());

        self.df.replace(column_name, new_series)?;
        Ok(())
    }

    fn update_u32_column(
        &mut self,
        column_name: &str,
        row: usize,
        new_value: u32,
    ) -> ProjectResult<()> {
        let new_series = self
            .df
            .column(column_name)?
            .u32()?
            .into_iter()
            .enumerate()
            .map(|(idx, val)| if idx == row { Some(new_value) } else { val })
            .collect::<UInt32Chunked>()
            .into_series()
            .with_name(column_name.into());

        self.df.replace(column_name, new_series)?;
        Ok(())
    }
}
