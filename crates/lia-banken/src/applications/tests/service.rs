use std::sync::Arc;

use super::common::*;
use crate::applications::domain::{ApplicationStatus, ApplyRequest};
use crate::applications::{ApplicationError, ApplicationService};
use crate::auth::{AuthError, Role};
use crate::notifications::{ApplicationEvent, RecordingNotifier};
use crate::postings::domain::PostingStatus;
use crate::store::{ApplicationRepository, PostingRepository, RepositoryError};

#[test]
fn apply_creates_pending_application_and_publishes_event() {
    let world = World::new();
    let (owner, _) = world.company("Kodverket AB");
    let posting = world.active_posting(&owner, "Backend-LIA");
    let (student, _) = world.student("Amir Haddad", None);

    let application = world.apply(&student, &posting);

    assert_eq!(application.status, ApplicationStatus::Pending);
    assert_eq!(application.student_id, student.user_id);
    assert_eq!(
        world.notifier.events(),
        vec![ApplicationEvent::Submitted {
            application_id: application.id,
            posting_id: posting.id,
            student_id: student.user_id,
        }]
    );
}

#[test]
fn second_application_to_same_posting_conflicts() {
    let world = World::new();
    let (owner, _) = world.company("Kodverket AB");
    let posting = world.active_posting(&owner, "Backend-LIA");
    let (student, _) = world.student("Amir Haddad", None);
    world.apply(&student, &posting);

    let err = world
        .service()
        .apply(
            &student,
            ApplyRequest {
                posting_id: posting.id,
                cover_letter: None,
            },
        )
        .expect_err("duplicate");
    assert!(matches!(err, ApplicationError::AlreadyApplied));
    assert_eq!(world.notifier.events().len(), 1);
}

#[test]
fn apply_requires_profile_and_open_posting() {
    let world = World::new();
    let (owner, _) = world.company("Kodverket AB");
    let posting = world.active_posting(&owner, "Backend-LIA");

    let no_profile = principal(Role::Student);
    assert!(matches!(
        world.service().apply(
            &no_profile,
            ApplyRequest {
                posting_id: posting.id,
                cover_letter: None,
            }
        ),
        Err(ApplicationError::MissingProfile)
    ));

    world
        .platform
        .postings()
        .set_status(&owner, &posting.id, PostingStatus::Closed)
        .expect("close");
    let (student, _) = world.student("Amir Haddad", None);
    assert!(matches!(
        world.service().apply(
            &student,
            ApplyRequest {
                posting_id: posting.id,
                cover_letter: None,
            }
        ),
        Err(ApplicationError::PostingClosed)
    ));
}

#[test]
fn companies_cannot_apply() {
    let world = World::new();
    let (owner, _) = world.company("Kodverket AB");
    let posting = world.active_posting(&owner, "Backend-LIA");
    let err = world
        .service()
        .apply(
            &owner,
            ApplyRequest {
                posting_id: posting.id,
                cover_letter: None,
            },
        )
        .expect_err("wrong role");
    assert!(matches!(err, ApplicationError::Auth(AuthError::Forbidden { .. })));
}

#[test]
fn owning_company_moves_status_freely() {
    let world = World::new();
    let (owner, _) = world.company("Kodverket AB");
    let posting = world.active_posting(&owner, "Backend-LIA");
    let (student, _) = world.student("Amir Haddad", None);
    let application = world.apply(&student, &posting);

    for status in [
        ApplicationStatus::Accepted,
        ApplicationStatus::Pending,
        ApplicationStatus::Interview,
    ] {
        let updated = world
            .service()
            .update_status(&owner, &application.id, status)
            .expect("status set");
        assert_eq!(updated.status, status);
        assert!(updated.updated_at >= application.updated_at);
    }

    let last = world.notifier.events().pop().expect("event");
    assert_eq!(
        last,
        ApplicationEvent::StatusChanged {
            application_id: application.id,
            student_id: student.user_id,
            from: ApplicationStatus::Pending,
            to: ApplicationStatus::Interview,
            changed_by: owner.user_id,
        }
    );
}

#[test]
fn other_company_and_school_cannot_change_status() {
    let world = World::new();
    let (owner, _) = world.company("Kodverket AB");
    let (rival, _) = world.company("Konkurrenten AB");
    let (school_owner, school) = world.school("Yrkeshögskolan Syd");
    let posting = world.active_posting(&owner, "Backend-LIA");
    let (student, _) = world.student("Amir Haddad", Some(&school));
    let application = world.apply(&student, &posting);

    for caller in [&rival, &school_owner] {
        assert!(matches!(
            world
                .service()
                .update_status(caller, &application.id, ApplicationStatus::Accepted),
            Err(ApplicationError::Forbidden)
        ));
    }
}

#[test]
fn students_may_only_withdraw_their_own_application() {
    let world = World::new();
    let (owner, _) = world.company("Kodverket AB");
    let posting = world.active_posting(&owner, "Backend-LIA");
    let (student, _) = world.student("Amir Haddad", None);
    let (other, _) = world.student("Lisa Nyström", None);
    let application = world.apply(&student, &posting);

    assert!(matches!(
        world
            .service()
            .update_status(&student, &application.id, ApplicationStatus::Accepted),
        Err(ApplicationError::Forbidden)
    ));
    assert!(matches!(
        world
            .service()
            .update_status(&other, &application.id, ApplicationStatus::Withdrawn),
        Err(ApplicationError::Forbidden)
    ));
    let withdrawn = world
        .service()
        .update_status(&student, &application.id, ApplicationStatus::Withdrawn)
        .expect("withdraw");
    assert_eq!(withdrawn.status, ApplicationStatus::Withdrawn);
}

#[test]
fn listings_are_scoped_by_role_and_joined() {
    let world = World::new();
    let (owner, _) = world.company("Kodverket AB");
    let (rival, _) = world.company("Konkurrenten AB");
    let (school_owner, school) = world.school("Yrkeshögskolan Syd");
    let ours = world.active_posting(&owner, "Backend-LIA");
    let theirs = world.active_posting(&rival, "Frontend-LIA");
    let (linked, _) = world.student("Amir Haddad", Some(&school));
    let (unlinked, _) = world.student("Lisa Nyström", None);
    world.apply(&linked, &ours);
    world.apply(&unlinked, &theirs);

    let company_rows = world.service().list_for(&owner).expect("company");
    assert_eq!(company_rows.len(), 1);
    let row = &company_rows[0];
    assert_eq!(row.posting.as_ref().map(|p| p.title.as_str()), Some("Backend-LIA"));
    assert_eq!(row.company.as_ref().map(|c| c.name.as_str()), Some("Kodverket AB"));
    assert_eq!(row.student.as_ref().map(|s| s.full_name.as_str()), Some("Amir Haddad"));

    let school_rows = world.service().list_for(&school_owner).expect("school");
    assert_eq!(school_rows.len(), 1);
    assert_eq!(school_rows[0].application.student_id, linked.user_id);

    let student_rows = world.service().list_for(&unlinked).expect("student");
    assert_eq!(student_rows.len(), 1);
    assert_eq!(student_rows[0].application.posting_id, theirs.id);

    let admin = principal(Role::Admin);
    assert_eq!(world.service().list_for(&admin).expect("admin").len(), 2);
    assert!(matches!(
        world.service().list_all(&owner),
        Err(ApplicationError::Auth(AuthError::Forbidden { .. }))
    ));
}

#[test]
fn join_keeps_rows_whose_posting_disappeared() {
    let world = World::new();
    let (owner, _) = world.company("Kodverket AB");
    let posting = world.active_posting(&owner, "Backend-LIA");
    let (student, _) = world.student("Amir Haddad", None);
    let application = world.apply(&student, &posting);
    world.db.delete_posting(&posting.id).expect("delete");

    let rows = world
        .service()
        .list_all(&principal(Role::Admin))
        .expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].application.id, application.id);
    assert!(rows[0].posting.is_none());
    assert!(rows[0].company.is_none());
    assert!(rows[0].student.is_some());
}

#[test]
fn listings_are_newest_first() {
    let world = World::new();
    let (owner, _) = world.company("Kodverket AB");
    let first = world.active_posting(&owner, "Första");
    let second = world.active_posting(&owner, "Andra");
    let (student, _) = world.student("Amir Haddad", None);
    let older = world.apply(&student, &first);
    std::thread::sleep(std::time::Duration::from_millis(5));
    let newer = world.apply(&student, &second);

    let rows = world.service().list_for(&student).expect("rows");
    let ids: Vec<_> = rows.iter().map(|row| row.application.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
}

#[test]
fn export_is_admin_only_csv() {
    let world = World::new();
    let (owner, _) = world.company("Kodverket AB");
    let posting = world.active_posting(&owner, "Backend-LIA");
    let (student, _) = world.student("Amir Haddad", None);
    world.apply(&student, &posting);

    let csv = world
        .service()
        .export_csv(&principal(Role::Admin))
        .expect("csv");
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("Backend-LIA"));
    assert!(world.service().export_csv(&owner).is_err());
}

#[test]
fn repository_failures_surface_unchanged() {
    let world = World::new();
    let (owner, _) = world.company("Kodverket AB");
    let posting = world.active_posting(&owner, "Backend-LIA");
    let (student, _) = world.student("Amir Haddad", None);

    let conflicting = ApplicationService::new(
        Arc::new(ConflictApplications),
        world.db.clone(),
        world.db.clone(),
        world.db.clone(),
        Arc::new(RecordingNotifier::default()),
    );
    assert!(matches!(
        conflicting.apply(
            &student,
            ApplyRequest {
                posting_id: posting.id,
                cover_letter: None,
            }
        ),
        Err(ApplicationError::AlreadyApplied)
    ));

    let offline = ApplicationService::new(
        Arc::new(UnavailableApplications),
        world.db.clone(),
        world.db.clone(),
        world.db.clone(),
        Arc::new(RecordingNotifier::default()),
    );
    assert!(matches!(
        offline.list_for(&student),
        Err(ApplicationError::Repository(RepositoryError::Unavailable(_)))
    ));
}

#[test]
fn stray_rows_without_profiles_still_list() {
    let world = World::new();
    let (owner, _) = world.company("Kodverket AB");
    let posting = world.active_posting(&owner, "Backend-LIA");
    let ghost = principal(Role::Student);
    world
        .db
        .insert_application(stray_application(posting.id, ghost.user_id))
        .expect("insert");

    let rows = world.service().list_for(&owner).expect("rows");
    assert_eq!(rows.len(), 1);
    assert!(rows[0].student.is_none());
    assert!(rows[0].posting.is_some());
}
