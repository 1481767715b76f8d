use crate::dates::shift_days;
use crate::task_validation::TaskValidationError;
use chrono::NaiveDate;
use polars::prelude::PlSmallStr;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const TASK_COLUMN: &str = "Task";
pub const RESOURCE_COLUMN: &str = "Resource";
pub const START_COLUMN: &str = "Start";
pub const FINISH_COLUMN: &str = "Finish";
pub const DURATION_COLUMN: &str = "Duration";
pub const COMPLETION_COLUMN: &str = "Completion_pct";
pub const ZONE_COLUMN: &str = "Trustee_Zone";
pub const CATEGORY_COLUMN: &str = "Category";
pub const NOTES_COLUMN: &str = "Notes";

/// Column order used by the task table, the CSV export and the dataframe.
pub const TASK_COLUMNS: [&str; 9] = [
    TASK_COLUMN,
    RESOURCE_COLUMN,
    START_COLUMN,
    FINISH_COLUMN,
    DURATION_COLUMN,
    COMPLETION_COLUMN,
    ZONE_COLUMN,
    CATEGORY_COLUMN,
    NOTES_COLUMN,
];

/// Fixed classification of a task. Drives the default resource and the
/// colour group on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Planning,
    Delivery,
    Installation,
    #[serde(rename = "Issue Resolution")]
    IssueResolution,
    Revisit,
    Closeout,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Planning,
        Category::Delivery,
        Category::Installation,
        Category::IssueResolution,
        Category::Revisit,
        Category::Closeout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Planning => "Planning",
            Category::Delivery => "Delivery",
            Category::Installation => "Installation",
            Category::IssueResolution => "Issue Resolution",
            Category::Revisit => "Revisit",
            Category::Closeout => "Closeout",
        }
    }

    pub fn default_resource(&self) -> &'static str {
        match self {
            Category::Planning | Category::Closeout => "Project Manager",
            Category::Delivery => "Delivery Team",
            Category::Installation => "Installation Team",
            Category::IssueResolution => "Specialized Team",
            Category::Revisit => "Maintenance Team",
        }
    }

    /// Timeline colour as an `rgb(r, g, b)` string.
    pub fn color(&self) -> &'static str {
        match self {
            Category::Planning => "rgb(46, 137, 205)",
            Category::Delivery => "rgb(114, 44, 121)",
            Category::Installation => "rgb(198, 47, 105)",
            Category::IssueResolution => "rgb(58, 149, 136)",
            Category::Revisit => "rgb(214, 39, 40)",
            Category::Closeout => "rgb(31, 119, 180)",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown category '{needle}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub name: String,
    pub resource: String,
    pub start: NaiveDate,
    pub finish: NaiveDate,
    pub duration: i64,
    pub completion_pct: u8,
    pub zone: u32,
    pub category: Category,
    #[serde(default)]
    pub notes: String,
}

impl TaskRecord {
    /// Builds a record whose finish is `start + duration_days` and whose
    /// resource is the category default. A finish past the calendar edge is
    /// left at `start`; validation rejects such a record.
    pub fn new(
        name: impl Into<String>,
        category: Category,
        start: NaiveDate,
        duration_days: i64,
    ) -> Self {
        Self {
            name: name.into(),
            resource: category.default_resource().to_string(),
            start,
            finish: shift_days(start, duration_days).unwrap_or(start),
            duration: duration_days,
            completion_pct: 0,
            zone: 0,
            category,
            notes: String::new(),
        }
    }

    /// Like [`TaskRecord::new`] but fails when the finish cannot be represented.
    pub fn try_new(
        name: impl Into<String>,
        category: Category,
        start: NaiveDate,
        duration_days: i64,
    ) -> Result<Self, TaskValidationError> {
        let mut task = Self::new(name, category, start, duration_days);
        task.recalculate_finish()?;
        Ok(task)
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn with_completion(mut self, completion_pct: u8) -> Self {
        self.completion_pct = completion_pct.min(100);
        self
    }

    pub fn with_zone(mut self, zone: u32) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Entity half of a `"<Entity>: <Action>"` name, if the name follows it.
    pub fn entity(&self) -> Option<&str> {
        self.name
            .rsplit_once(": ")
            .map(|(entity, _)| entity.rsplit_once(" - ").map_or(entity, |(_, e)| e).trim())
    }

    pub fn recalculate_finish(&mut self) -> Result<(), TaskValidationError> {
        self.finish = shift_days(self.start, self.duration).ok_or_else(|| {
            TaskValidationError::new(format!(
                "task '{}' starting {} for {} days ends outside the supported calendar",
                self.name, self.start, self.duration
            ))
        })?;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.completion_pct >= 100
    }

    /// True when the half-open windows `[start, finish)` share at least one day.
    pub fn overlaps(&self, other: &TaskRecord) -> bool {
        self.start < other.finish && other.start < self.finish
    }

    pub fn to_dataframe_row(&self) -> PolarsResult<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(TASK_COLUMNS.len());

        let name: [&str; 1] = [self.name.as_str()];
        columns.push(Series::new(PlSmallStr::from_static(TASK_COLUMN), name).into_column());

        let resource: [&str; 1] = [self.resource.as_str()];
        columns.push(
            Series::new(PlSmallStr::from_static(RESOURCE_COLUMN), resource).into_column(),
        );

        columns.push(Self::series_from_date(START_COLUMN, self.start)?.into_column());
        columns.push(Self::series_from_date(FINISH_COLUMN, self.finish)?.into_column());

        let duration: [i64; 1] = [self.duration];
        columns.push(
            Series::new(PlSmallStr::from_static(DURATION_COLUMN), duration).into_column(),
        );

        let completion: [i32; 1] = [i32::from(self.completion_pct)];
        columns.push(
            Series::new(PlSmallStr::from_static(COMPLETION_COLUMN), completion).into_column(),
        );

        let zone: [u32; 1] = [self.zone];
        columns.push(Series::new(PlSmallStr::from_static(ZONE_COLUMN), zone).into_column());

        let category: [&str; 1] = [self.category.as_str()];
        columns.push(
            Series::new(PlSmallStr::from_static(CATEGORY_COLUMN), category).into_column(),
        );

        let notes: [&str; 1] = [self.notes.as_str()];
        columns.push(Series::new(PlSmallStr::from_static(NOTES_COLUMN), notes).into_column());

        DataFrame::new(columns)
    }

    pub fn from_dataframe_row(df: &DataFrame, row_idx: usize) -> PolarsResult<Self> {
        let name = df
            .column(TASK_COLUMN)?
            .str()?
            .get(row_idx)
            .unwrap_or("")
            .to_string();
        let resource = df
            .column(RESOURCE_COLUMN)?
            .str()?
            .get(row_idx)
            .unwrap_or("")
            .to_string();
        let start = Self::required_date(df, START_COLUMN, row_idx)?;
        let finish = Self::required_date(df, FINISH_COLUMN, row_idx)?;
        let duration = df
            .column(DURATION_COLUMN)?
            .i64()?
            .get(row_idx)
            .unwrap_or_else(|| (finish - start).num_days());
        let completion_pct = df
            .column(COMPLETION_COLUMN)?
            .i32()?
            .get(row_idx)
            .unwrap_or(0)
            .clamp(0, 100) as u8;
        let zone = df
            .column(ZONE_COLUMN)?
            .u32()?
            .get(row_idx)
            .unwrap_or(0);
        let category_raw = df.column(CATEGORY_COLUMN)?.str()?.get(row_idx).unwrap_or("");
        let category = Category::from_str(category_raw)
            .map_err(|msg| PolarsError::ComputeError(msg.into()))?;
        let notes = df
            .column(NOTES_COLUMN)?
            .str()?
            .get(row_idx)
            .unwrap_or("")
            .to_string();

        Ok(Self {
            name,
            resource,
            start,
            finish,
            duration,
            completion_pct,
            zone,
            category,
            notes,
        })
    }

    pub(crate) fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new(TASK_COLUMN.into(), DataType::String),
            Field::new(RESOURCE_COLUMN.into(), DataType::String),
            Field::new(START_COLUMN.into(), DataType::Date),
            Field::new(FINISH_COLUMN.into(), DataType::Date),
            Field::new(DURATION_COLUMN.into(), DataType::Int64),
            Field::new(COMPLETION_COLUMN.into(), DataType::Int32),
            Field::new(ZONE_COLUMN.into(), DataType::UInt32),
            Field::new(CATEGORY_COLUMN.into(), DataType::String),
            Field::new(NOTES_COLUMN.into(), DataType::String),
        ])
    }

    fn required_date(df: &DataFrame, column: &str, row_idx: usize) -> PolarsResult<NaiveDate> {
        df.column(column)?
            .date()?
            .get(row_idx)
            .and_then(Self::date_from_i32)
            .ok_or_else(|| {
                PolarsError::ComputeError(
                    format!("task row {row_idx} has no usable {column}").into(),
                )
            })
    }

    fn series_from_date(name: &'static str, date: NaiveDate) -> PolarsResult<Series> {
        let data: [i32; 1] = [Self::date_to_i32(date)];
        Series::new(PlSmallStr::from_static(name), data).cast(&DataType::Date)
    }

    fn date_to_i32(date: NaiveDate) -> i32 {
        (date - NaiveDate::default()).num_days() as i32
    }

    pub(crate) fn date_from_i32(days: i32) -> Option<NaiveDate> {
        shift_days(NaiveDate::default(), i64::from(days))
    }
}
