//! Row-level access rules shared by every service.
//!
//! Each rule is a pure predicate over the caller and the rows involved; the
//! services load the rows and turn a `false` into their own `Forbidden` error.

use crate::applications::domain::{Application, ApplicationStatus};
use crate::auth::domain::{Principal, Role};
use crate::directory::domain::{Company, School};
use crate::profiles::domain::StudentProfile;

pub fn owns_school(principal: &Principal, school: &School) -> bool {
    principal.is_admin() || (principal.role == Role::School && school.owner == principal.user_id)
}

pub fn owns_company(principal: &Principal, company: &Company) -> bool {
    principal.is_admin()
        || (principal.role == Role::Company && company.owner == principal.user_id)
}

/// Students see themselves, their school sees its students, companies see applicants.
pub fn can_read_student(
    principal: &Principal,
    profile: &StudentProfile,
    viewer_school: Option<&School>,
    applied_to_viewer: bool,
) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Student => profile.user_id == principal.user_id,
        Role::School => viewer_school
            .filter(|school| school.owner == principal.user_id)
            .map_or(false, |school| profile.school_id == Some(school.id)),
        Role::Company => applied_to_viewer,
    }
}

/// `posting_company` is the company that owns the posting applied to;
/// `student_school` is the school the applicant is linked to.
pub fn can_read_application(
    principal: &Principal,
    application: &Application,
    posting_company: Option<&Company>,
    student_school: Option<&School>,
) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Student => application.student_id == principal.user_id,
        Role::Company => posting_company.map_or(false, |company| owns_company(principal, company)),
        Role::School => student_school.map_or(false, |school| owns_school(principal, school)),
    }
}

/// Companies move their own pipeline freely; students may only withdraw.
pub fn can_set_application_status(
    principal: &Principal,
    application: &Application,
    posting_company: Option<&Company>,
    next: ApplicationStatus,
) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Company => posting_company.map_or(false, |company| owns_company(principal, company)),
        Role::Student => {
            application.student_id == principal.user_id && next == ApplicationStatus::Withdrawn
        }
        Role::School => false,
    }
}
