pub mod domain;
pub mod router;
pub mod service;

pub use domain::{
    Company, CompanyForm, EducationProgram, LiaPeriod, LiaPeriodForm, ProgramForm, School,
    SchoolForm, Supervisor,
};
pub use router::directory_router;
pub use service::{DirectoryError, DirectoryService};
