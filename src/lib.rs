pub mod config;
pub mod convert;
pub mod dates;
pub mod metadata;
pub mod persistence;
pub mod project;
pub mod sheet;
pub mod status;
pub mod task;
pub(crate) mod task_validation;

pub use config::{ColumnAliases, ConverterConfig, PlanningTemplate};
pub use convert::{
    Conversion, ConversionReport, ConvertError, ScheduleCursor, ScheduleNormalizer, TaskOrigin,
    lookup_zone, parse_zone,
};
pub use metadata::ProjectMetadata;
pub use persistence::{
    PersistenceError, load_project_from_csv, load_project_from_json, load_tasks_from_csv,
    save_project_to_csv, save_project_to_json, save_tasks_to_csv, tasks_from_csv_str,
    tasks_to_csv_string, validate_columns, validate_tasks,
};
pub use project::{Project, ProjectError, ProjectSummary, TaskFilter, sample_tasks};
pub use sheet::{SheetError, SheetTable, Workbook};
pub use status::StatusClass;
pub use task::{Category, TaskRecord};
pub use task_validation::TaskValidationError;
