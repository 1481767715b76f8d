use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub project_name: String,
    pub project_description: String,
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            project_name: "UPS Installation Project".to_string(),
            project_description:
                "Tracking UPS installations across school board sites".to_string(),
        }
    }
}
