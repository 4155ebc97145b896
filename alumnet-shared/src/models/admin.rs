use serde::{Deserialize, Serialize};

use super::Identity;

/// Account entry in the admin user listing, with the role profile attached
/// verbatim when one exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(default)]
    pub profile: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserListResponse {
    pub users: Vec<UserRecord>,
}

/// Account counts per role.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminStats {
    pub total_users: u64,
    pub admin_count: u64,
    pub alumni_count: u64,
    pub student_count: u64,
}
