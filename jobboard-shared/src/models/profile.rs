use serde::{Deserialize, Serialize};

use super::UserId;

/// Company profile owned by an employer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployerProfile {
    pub user_id: UserId,
    pub company_name: String,
    #[serde(default)]
    pub company_description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Candidate profile for an ITI graduate ("itian") account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItianProfile {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub graduation_year: Option<u16>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl ItianProfile {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}
