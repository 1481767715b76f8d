use crate::task::Category;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::Path;

/// A seeded planning-phase task. Templates are chained back to back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningTemplate {
    pub name: String,
    pub duration_days: i64,
    pub completion_pct: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl PlanningTemplate {
    pub fn new(name: impl Into<String>, duration_days: i64, completion_pct: u8) -> Self {
        Self {
            name: name.into(),
            duration_days,
            completion_pct,
            resource: None,
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn resource(&self) -> &str {
        self.resource
            .as_deref()
            .unwrap_or_else(|| Category::Planning.default_resource())
    }
}

/// Header aliases tried in order for each logical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnAliases {
    pub entity: Vec<String>,
    pub status: Vec<String>,
    pub zone: Vec<String>,
    pub target_date: Vec<String>,
    pub notes: Vec<String>,
    pub description: Vec<String>,
    pub assignee: Vec<String>,
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self {
            entity: strings(&["School", "School Name", "Site", "Location", "Name"]),
            status: strings(&["Status", "UPS Status", "Installation Status"]),
            zone: strings(&["Trustee Zone", "Trustee_Zone", "Zone"]),
            target_date: strings(&[
                "Installation Date",
                "Install Date",
                "Target Date",
                "Scheduled Date",
                "Date",
            ]),
            notes: strings(&["Notes", "Comments", "Comment"]),
            description: strings(&["Issue", "Issues", "Description", "Reason", "Notes"]),
            assignee: strings(&["Assigned To", "Assignee", "Technician", "Resource"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub primary_sheet: String,
    pub issues_sheet: String,
    pub revisits_sheet: String,
    /// Entity-name literals that mark section headers rather than data rows.
    pub section_headers: Vec<String>,
    pub columns: ColumnAliases,
    pub planning: Vec<PlanningTemplate>,
    /// Days before the reference date at which the first planning task starts.
    pub planning_lead_days: i64,
    pub issue_duration_days: i64,
    pub revisit_duration_days: i64,
    pub documentation_offset_days: i64,
    pub documentation_duration_days: i64,
    pub review_offset_days: i64,
    pub review_duration_days: i64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            primary_sheet: "Project status".to_string(),
            issues_sheet: "school with issues".to_string(),
            revisits_sheet: "Schools to be revisted".to_string(),
            section_headers: strings(&["ELEMENTARY SCHOOLS", "SECONDARY SCHOOLS"]),
            columns: ColumnAliases::default(),
            planning: vec![
                PlanningTemplate::new("Planning & Preparation", 2, 100),
                PlanningTemplate::new("Data Closet Assessment", 3, 80)
                    .with_resource("Technical Team"),
                PlanningTemplate::new("Team Assignments", 1, 50),
            ],
            planning_lead_days: 5,
            issue_duration_days: 2,
            revisit_duration_days: 1,
            documentation_offset_days: 3,
            documentation_duration_days: 3,
            review_offset_days: 4,
            review_duration_days: 1,
        }
    }
}

impl ConverterConfig {
    /// Reads a JSON config; absent fields keep their defaults.
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        serde_json::from_reader(file).map_err(io::Error::from)
    }

    pub fn is_section_header(&self, entity: &str) -> bool {
        let entity = entity.trim();
        self.section_headers
            .iter()
            .any(|header| header.trim().eq_ignore_ascii_case(entity))
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
