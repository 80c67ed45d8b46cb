use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{LiaPeriodId, ProgramId, SchoolId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub user_id: UserId,
    pub full_name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub school_id: Option<SchoolId>,
    pub program_id: Option<ProgramId>,
    pub lia_period_id: Option<LiaPeriodId>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub cv_path: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StudentProfile {
    /// Share of the optional profile sections a student has filled in, 0-100.
    pub fn completeness(&self) -> u8 {
        let checks = [
            self.phone.is_some(),
            self.city.is_some(),
            self.school_id.is_some(),
            self.program_id.is_some(),
            self.bio.is_some(),
            !self.skills.is_empty(),
            self.cv_path.is_some(),
            self.linkedin_url.is_some() || self.portfolio_url.is_some(),
        ];
        let filled = checks.iter().filter(|check| **check).count();
        ((filled * 100) / checks.len()) as u8
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub school_id: Option<SchoolId>,
    #[serde(default)]
    pub program_id: Option<ProgramId>,
    #[serde(default)]
    pub lia_period_id: Option<LiaPeriodId>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub portfolio_url: Option<String>,
}
