//! Status-spreadsheet to task-schedule conversion.
//!
//! One pass over immutable input sheets. Tasks without an explicit date are
//! placed with a [`ScheduleCursor`] that is threaded through every scheduling
//! step and only ever moves forward. Rows carrying an explicit target date are
//! placed on that date and never touch the cursor, so a dated pair may share
//! calendar days with cursor-placed tasks; [`Conversion::overlapping_pairs`]
//! reports those instead of moving anything.

use crate::config::{ColumnAliases, ConverterConfig};
use crate::dates::{parse_calendar_date, shift_days};
use crate::sheet::{SheetTable, Workbook};
use crate::status::StatusClass;
use crate::task::{Category, TaskRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    MissingSheet(String),
    MissingColumn {
        sheet: String,
        column: String,
    },
    InvalidDate {
        sheet: String,
        /// 1-based data row, header excluded.
        row: usize,
        column: String,
        value: String,
    },
    /// A task would start or end outside chrono's calendar.
    DateOutOfRange {
        task: String,
    },
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::MissingSheet(name) => write!(f, "workbook has no '{name}' sheet"),
            ConvertError::MissingColumn { sheet, column } => {
                write!(f, "sheet '{sheet}' is missing required column: {column}")
            }
            ConvertError::InvalidDate {
                sheet,
                row,
                column,
                value,
            } => write!(
                f,
                "sheet '{sheet}' row {row}: invalid date '{value}' in column '{column}'"
            ),
            ConvertError::DateOutOfRange { task } => {
                write!(f, "task '{task}' falls outside the supported calendar")
            }
        }
    }
}

impl std::error::Error for ConvertError {}

pub type ConvertResult<T> = Result<T, ConvertError>;

/// The date after which the next undated task may begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScheduleCursor {
    date: NaiveDate,
}

impl ScheduleCursor {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// First day an undated task may start on; `None` at the calendar edge.
    pub fn next_start(&self) -> Option<NaiveDate> {
        shift_days(self.date, 1)
    }

    /// Moves the cursor to `date` unless that would move it backward.
    pub fn advance_to(&mut self, date: NaiveDate) {
        if date > self.date {
            self.date = date;
        }
    }
}

/// How a task got its dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOrigin {
    Planning,
    /// Placed on a target date taken from the primary sheet.
    Dated,
    /// Placed by the scheduling cursor.
    Cursor,
    Closeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub issues_sheet_present: bool,
    pub revisits_sheet_present: bool,
    pub dated_rows: usize,
    pub cursor_rows: usize,
    pub skipped_header_rows: usize,
    pub skipped_blank_rows: usize,
    /// Rows already in progress with no date to place them on.
    pub skipped_in_progress_rows: usize,
    pub issue_rows: usize,
    pub revisit_rows: usize,
    pub final_cursor: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub tasks: Vec<TaskRecord>,
    pub origins: Vec<TaskOrigin>,
    pub report: ConversionReport,
}

impl Conversion {
    pub fn into_tasks(self) -> Vec<TaskRecord> {
        self.tasks
    }

    pub fn cursor_tasks(&self) -> impl Iterator<Item = &TaskRecord> {
        self.tasks
            .iter()
            .zip(&self.origins)
            .filter(|(_, origin)| **origin == TaskOrigin::Cursor)
            .map(|(task, _)| task)
    }

    /// `(dated, cursor)` index pairs whose date windows overlap.
    pub fn overlapping_pairs(&self) -> Vec<(usize, usize)> {
        let indices_of = |wanted: TaskOrigin| {
            self.origins
                .iter()
                .enumerate()
                .filter(move |(_, origin)| **origin == wanted)
                .map(|(idx, _)| idx)
        };
        let mut pairs = Vec::new();
        for dated in indices_of(TaskOrigin::Dated) {
            for placed in indices_of(TaskOrigin::Cursor) {
                if self.tasks[dated].overlaps(&self.tasks[placed]) {
                    pairs.push((dated, placed));
                }
            }
        }
        pairs
    }
}

struct PrimaryColumns {
    entity: usize,
    status: usize,
    zone: Option<usize>,
    target_date: Option<usize>,
    notes: Option<usize>,
}

impl PrimaryColumns {
    fn resolve(sheet: &SheetTable, aliases: &ColumnAliases) -> ConvertResult<Self> {
        Ok(Self {
            entity: required_column(sheet, &aliases.entity)?,
            status: required_column(sheet, &aliases.status)?,
            zone: sheet.column_index(&aliases.zone),
            target_date: sheet.column_index(&aliases.target_date),
            notes: sheet.column_index(&aliases.notes),
        })
    }
}

/// Accumulates tasks in insertion order alongside their origin.
struct TaskSink {
    tasks: Vec<TaskRecord>,
    origins: Vec<TaskOrigin>,
}

impl TaskSink {
    fn push(&mut self, task: TaskRecord, origin: TaskOrigin) {
        self.tasks.push(task);
        self.origins.push(origin);
    }
}

pub struct ScheduleNormalizer {
    config: ConverterConfig,
    reference_date: NaiveDate,
}

impl ScheduleNormalizer {
    pub fn new(config: ConverterConfig, reference_date: NaiveDate) -> Self {
        Self {
            config,
            reference_date,
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    /// Picks the configured sheets out of `workbook`. A workbook holding a
    /// single sheet uses it as the primary sheet whatever its name.
    pub fn convert_workbook(&self, workbook: &Workbook) -> ConvertResult<Conversion> {
        let primary = workbook
            .sheet(&self.config.primary_sheet)
            .or_else(|| match workbook.sheets() {
                [only] => Some(only),
                _ => None,
            })
            .ok_or_else(|| ConvertError::MissingSheet(self.config.primary_sheet.clone()))?;
        let issues = workbook.sheet(&self.config.issues_sheet);
        let revisits = workbook.sheet(&self.config.revisits_sheet);
        self.convert(primary, issues, revisits)
    }

    pub fn convert(
        &self,
        primary: &SheetTable,
        issues: Option<&SheetTable>,
        revisits: Option<&SheetTable>,
    ) -> ConvertResult<Conversion> {
        let columns = PrimaryColumns::resolve(primary, &self.config.columns)?;
        let mut sink = TaskSink {
            tasks: Vec::new(),
            origins: Vec::new(),
        };
        let mut report = ConversionReport {
            issues_sheet_present: issues.is_some(),
            revisits_sheet_present: revisits.is_some(),
            dated_rows: 0,
            cursor_rows: 0,
            skipped_header_rows: 0,
            skipped_blank_rows: 0,
            skipped_in_progress_rows: 0,
            issue_rows: 0,
            revisit_rows: 0,
            final_cursor: self.reference_date,
        };

        let mut cursor = self.seed_planning(&mut sink)?;
        self.schedule_primary(primary, &columns, &mut cursor, &mut sink, &mut report)?;
        if let Some(issues) = issues {
            self.schedule_issues(issues, primary, &columns, &mut cursor, &mut sink, &mut report)?;
        } else {
            tracing::debug!(sheet = %self.config.issues_sheet, "issues sheet absent");
        }
        if let Some(revisits) = revisits {
            self.schedule_revisits(revisits, primary, &columns, &mut cursor, &mut sink, &mut report)?;
        } else {
            tracing::debug!(sheet = %self.config.revisits_sheet, "revisits sheet absent");
        }
        self.append_closeout(cursor, &mut sink)?;
        report.final_cursor = cursor.date();

        let conversion = Conversion {
            tasks: sink.tasks,
            origins: sink.origins,
            report,
        };
        let overlaps = conversion.overlapping_pairs();
        if !overlaps.is_empty() {
            tracing::warn!(
                count = overlaps.len(),
                "dated tasks share calendar days with cursor-scheduled tasks"
            );
        }
        tracing::info!(
            tasks = conversion.tasks.len(),
            dated = conversion.report.dated_rows,
            scheduled = conversion.report.cursor_rows,
            final_cursor = %conversion.report.final_cursor,
            "converted status workbook"
        );
        Ok(conversion)
    }

    fn seed_planning(&self, sink: &mut TaskSink) -> ConvertResult<ScheduleCursor> {
        let first = self
            .config
            .planning
            .first()
            .map_or("planning", |template| template.name.as_str());
        let mut start = self
            .config
            .planning_lead_days
            .checked_neg()
            .and_then(|lead| shift_days(self.reference_date, lead))
            .ok_or_else(|| out_of_range(first))?;
        for template in &self.config.planning {
            let task = place(
                template.name.clone(),
                Category::Planning,
                Some(start),
                template.duration_days,
            )?
            .with_completion(template.completion_pct)
            .with_resource(template.resource());
            start = task.finish;
            sink.push(task, TaskOrigin::Planning);
        }
        Ok(ScheduleCursor::new(start))
    }

    fn schedule_primary(
        &self,
        primary: &SheetTable,
        columns: &PrimaryColumns,
        cursor: &mut ScheduleCursor,
        sink: &mut TaskSink,
        report: &mut ConversionReport,
    ) -> ConvertResult<()> {
        for row in 0..primary.len() {
            let Some(entity) = primary.cell(row, columns.entity) else {
                report.skipped_blank_rows += 1;
                continue;
            };
            if self.config.is_section_header(entity) {
                tracing::debug!(row = row + 1, entity, "skipping section header");
                report.skipped_header_rows += 1;
                continue;
            }

            let completion = StatusClass::classify(primary.cell(row, columns.status))
                .primary_completion();
            let zone = columns
                .zone
                .and_then(|col| primary.cell(row, col))
                .map_or(0, parse_zone);
            let notes = columns
                .notes
                .and_then(|col| primary.cell(row, col))
                .unwrap_or_default();
            let target = match columns.target_date.and_then(|col| primary.cell(row, col)) {
                Some(raw) => Some(parse_calendar_date(raw).ok_or_else(|| {
                    ConvertError::InvalidDate {
                        sheet: primary.name().to_string(),
                        row: row + 1,
                        column: primary.headers()[columns.target_date.unwrap_or_default()]
                            .clone(),
                        value: raw.to_string(),
                    }
                })?),
                None => None,
            };

            let (delivery_start, origin) = match target {
                Some(target) => (shift_days(target, -1), TaskOrigin::Dated),
                None if completion == 0 => (cursor.next_start(), TaskOrigin::Cursor),
                None => {
                    tracing::debug!(row = row + 1, entity, completion, "in progress with no date");
                    report.skipped_in_progress_rows += 1;
                    continue;
                }
            };

            let delivery = place(
                entity_task_name(entity, zone, "Delivery"),
                Category::Delivery,
                delivery_start,
                1,
            )?
            .with_completion(completion)
            .with_zone(zone)
            .with_notes(notes);
            let installation = place(
                entity_task_name(entity, zone, "Installation"),
                Category::Installation,
                Some(delivery.finish),
                1,
            )?
            .with_completion(completion)
            .with_zone(zone)
            .with_notes(notes);

            match origin {
                TaskOrigin::Cursor => {
                    cursor.advance_to(installation.finish);
                    report.cursor_rows += 1;
                }
                _ => report.dated_rows += 1,
            }
            sink.push(delivery, origin);
            sink.push(installation, origin);
        }
        Ok(())
    }

    fn schedule_issues(
        &self,
        issues: &SheetTable,
        primary: &SheetTable,
        columns: &PrimaryColumns,
        cursor: &mut ScheduleCursor,
        sink: &mut TaskSink,
        report: &mut ConversionReport,
    ) -> ConvertResult<()> {
        let aliases = &self.config.columns;
        let entity_col = required_column(issues, &aliases.entity)?;
        let description_col = issues.column_index(&aliases.description);
        let status_col = issues.column_index(&aliases.status);

        for row in 0..issues.len() {
            let Some(entity) = issues.cell(row, entity_col) else {
                continue;
            };
            let completion = StatusClass::classify(status_col.and_then(|col| issues.cell(row, col)))
                .issue_completion();
            let zone = zone_for_entity(primary, columns, entity).unwrap_or(0);
            let description = description_col
                .and_then(|col| issues.cell(row, col))
                .unwrap_or_default();

            let task = place(
                format!("School with Issues - {entity}"),
                Category::IssueResolution,
                cursor.next_start(),
                self.config.issue_duration_days,
            )?
            .with_completion(completion)
            .with_zone(zone)
            .with_notes(description);
            cursor.advance_to(task.finish);
            report.issue_rows += 1;
            sink.push(task, TaskOrigin::Cursor);
        }
        Ok(())
    }

    fn schedule_revisits(
        &self,
        revisits: &SheetTable,
        primary: &SheetTable,
        columns: &PrimaryColumns,
        cursor: &mut ScheduleCursor,
        sink: &mut TaskSink,
        report: &mut ConversionReport,
    ) -> ConvertResult<()> {
        let aliases = &self.config.columns;
        let entity_col = required_column(revisits, &aliases.entity)?;
        let description_col = revisits.column_index(&aliases.description);
        let status_col = revisits.column_index(&aliases.status);
        let assignee_col = revisits.column_index(&aliases.assignee);

        for row in 0..revisits.len() {
            let Some(entity) = revisits.cell(row, entity_col) else {
                continue;
            };
            let completion =
                StatusClass::classify(status_col.and_then(|col| revisits.cell(row, col)))
                    .revisit_completion();
            let resource = assignee_col
                .and_then(|col| revisits.cell(row, col))
                .unwrap_or_else(|| Category::Revisit.default_resource());
            let zone = zone_for_entity(primary, columns, entity).unwrap_or(0);
            let description = description_col
                .and_then(|col| revisits.cell(row, col))
                .unwrap_or_default();

            let task = place(
                format!("School for Revisit - {entity}"),
                Category::Revisit,
                cursor.next_start(),
                self.config.revisit_duration_days,
            )?
            .with_completion(completion)
            .with_resource(resource)
            .with_zone(zone)
            .with_notes(description);
            cursor.advance_to(task.finish);
            report.revisit_rows += 1;
            sink.push(task, TaskOrigin::Cursor);
        }
        Ok(())
    }

    fn append_closeout(&self, cursor: ScheduleCursor, sink: &mut TaskSink) -> ConvertResult<()> {
        let anchor = cursor.date();
        let documentation = place(
            "Final Documentation".to_string(),
            Category::Closeout,
            shift_days(anchor, self.config.documentation_offset_days),
            self.config.documentation_duration_days,
        )?;
        let review = place(
            "Project Review".to_string(),
            Category::Closeout,
            shift_days(anchor, self.config.review_offset_days),
            self.config.review_duration_days,
        )?;
        sink.push(documentation, TaskOrigin::Closeout);
        sink.push(review, TaskOrigin::Closeout);
        Ok(())
    }
}

/// Zone recorded for `entity` in the primary sheet.
///
/// Linear scan in row order; when several rows carry the same (trimmed) name
/// the first one wins. `None` when no row matches; a matching row with an
/// unusable zone cell yields `Some(0)`.
pub fn lookup_zone(primary: &SheetTable, aliases: &ColumnAliases, entity: &str) -> Option<u32> {
    let entity_col = primary.column_index(&aliases.entity)?;
    let zone_col = primary.column_index(&aliases.zone);
    find_zone(primary, entity_col, zone_col, entity)
}

fn zone_for_entity(primary: &SheetTable, columns: &PrimaryColumns, entity: &str) -> Option<u32> {
    find_zone(primary, columns.entity, columns.zone, entity)
}

fn find_zone(
    primary: &SheetTable,
    entity_col: usize,
    zone_col: Option<usize>,
    entity: &str,
) -> Option<u32> {
    let entity = entity.trim();
    let row = (0..primary.len()).find(|&row| primary.cell(row, entity_col) == Some(entity))?;
    Some(
        zone_col
            .and_then(|col| primary.cell(row, col))
            .map_or(0, parse_zone),
    )
}

/// Numeric zone; anything non-numeric, negative or non-finite becomes 0.
pub fn parse_zone(raw: &str) -> u32 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value.trunc() as u32,
        _ => 0,
    }
}

/// A task starting on `start` for `days`, or `DateOutOfRange` when either end
/// leaves the calendar.
fn place(
    name: String,
    category: Category,
    start: Option<NaiveDate>,
    days: i64,
) -> ConvertResult<TaskRecord> {
    let Some(start) = start else {
        return Err(out_of_range(&name));
    };
    TaskRecord::try_new(name.as_str(), category, start, days).map_err(|_| out_of_range(&name))
}

fn out_of_range(task: &str) -> ConvertError {
    ConvertError::DateOutOfRange {
        task: task.to_string(),
    }
}

fn entity_task_name(entity: &str, zone: u32, action: &str) -> String {
    if zone > 0 {
        format!("Zone {zone} - {entity}: {action}")
    } else {
        format!("{entity}: {action}")
    }
}

fn required_column(sheet: &SheetTable, aliases: &[String]) -> ConvertResult<usize> {
    sheet
        .column_index(aliases)
        .ok_or_else(|| ConvertError::MissingColumn {
            sheet: sheet.name().to_string(),
            column: aliases.first().cloned().unwrap_or_default(),
        })
}
