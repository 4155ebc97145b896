use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Review state of an application.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Declined,
}

/// A student's application to an opportunity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Application {
    pub id: i64,
    pub student_id: i64,
    pub opportunity_id: i64,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub resume_file: Option<String>,
    #[serde(default)]
    pub applied_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub opportunity_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationListResponse {
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationEnvelope {
    #[serde(default)]
    pub message: Option<String>,
    pub application: Application,
}

/// Body for `PUT /alumni/applications/{id}/status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusUpdateRequest {
    pub status: ApplicationStatus,
}
