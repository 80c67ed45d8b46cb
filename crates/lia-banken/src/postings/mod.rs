pub mod domain;
pub mod router;
pub mod service;

pub use domain::{
    CompanyPostingView, JobPosting, PostingFilter, PostingForm, PostingListing, PostingStatus,
};
pub use router::posting_router;
pub use service::{PostingError, PostingService};
