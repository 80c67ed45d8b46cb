use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CompanyId, LiaPeriodId, PostingId};

/// Publication state of a job posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingStatus {
    Draft,
    Active,
    Closed,
}

impl PostingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PostingStatus::Draft => "draft",
            PostingStatus::Active => "active",
            PostingStatus::Closed => "closed",
        }
    }

    pub const fn all() -> [Self; 3] {
        [Self::Draft, Self::Active, Self::Closed]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: PostingId,
    pub company_id: CompanyId,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub remote: bool,
    pub positions: u32,
    pub lia_period_id: Option<LiaPeriodId>,
    pub requirements: Vec<String>,
    pub deadline: Option<NaiveDate>,
    pub status: PostingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobPosting {
    /// Whether students can still apply on `today`.
    pub fn accepts_applications(&self, today: NaiveDate) -> bool {
        self.status == PostingStatus::Active
            && self.deadline.map_or(true, |deadline| deadline >= today)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostingForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub positions: Option<u32>,
    #[serde(default)]
    pub lia_period_id: Option<LiaPeriodId>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    /// Publish immediately instead of saving a draft.
    #[serde(default)]
    pub publish: bool,
}

/// Public search filters for the posting board.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostingFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, rename = "q")]
    pub query: Option<String>,
    #[serde(default)]
    pub remote_only: bool,
}

impl PostingFilter {
    pub fn matches(&self, posting: &JobPosting) -> bool {
        if let Some(category) = non_blank(&self.category) {
            if posting.category.to_lowercase() != category.to_lowercase() {
                return false;
            }
        }

        if let Some(location) = non_blank(&self.location) {
            let needle = location.to_lowercase();
            let found = posting
                .location
                .as_deref()
                .map(|value| value.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !found {
                return false;
            }
        }

        if let Some(query) = non_blank(&self.query) {
            let needle = query.to_lowercase();
            let in_title = posting.title.to_lowercase().contains(&needle);
            let in_description = posting
                .description
                .as_deref()
                .map(|value| value.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !in_title && !in_description {
                return false;
            }
        }

        !self.remote_only || posting.remote
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Posting board row: the posting stitched to its company name.
#[derive(Debug, Clone, Serialize)]
pub struct PostingListing {
    #[serde(flatten)]
    pub posting: JobPosting,
    pub company_name: Option<String>,
}

/// A company's own posting with its application pipeline counts.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyPostingView {
    #[serde(flatten)]
    pub posting: JobPosting,
    pub applications_total: usize,
    pub applications_by_status: std::collections::BTreeMap<&'static str, usize>,
}
