use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{ProfileForm, StudentProfile};
use crate::access;
use crate::auth::{require_role, AuthError, Principal, Role};
use crate::directory::domain::clean;
use crate::ids::{SchoolId, UserId};
use crate::storage::{guess_content_type, object_path, ObjectStore, StorageError, StoredObject};
use crate::store::{
    ApplicationRepository, DirectoryRepository, PostingRepository, ProfileRepository,
    RepositoryError,
};

const CV_PREFIX: &str = "cvs";
const CV_EXTENSIONS: [&str; 5] = ["pdf", "doc", "docx", "odt", "txt"];

/// Student profiles and their uploaded CVs.
pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
    directory: Arc<dyn DirectoryRepository>,
    postings: Arc<dyn PostingRepository>,
    applications: Arc<dyn ApplicationRepository>,
    objects: Arc<dyn ObjectStore>,
    max_upload_bytes: u64,
}

impl ProfileService {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        directory: Arc<dyn DirectoryRepository>,
        postings: Arc<dyn PostingRepository>,
        applications: Arc<dyn ApplicationRepository>,
        objects: Arc<dyn ObjectStore>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            profiles,
            directory,
            postings,
            applications,
            objects,
            max_upload_bytes,
        }
    }

    pub fn upsert_profile(
        &self,
        principal: &Principal,
        form: ProfileForm,
    ) -> Result<StudentProfile, ProfileError> {
        require_role(principal, &[Role::Student])?;
        let full_name = form.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(ProfileError::Validation("full_name is required".to_string()));
        }
        self.check_links(&form)?;

        let skills = normalize_skills(form.skills);
        let existing = self.profiles.profile(&principal.user_id)?;
        let profile = StudentProfile {
            user_id: principal.user_id,
            full_name,
            phone: clean(form.phone),
            city: clean(form.city),
            school_id: form.school_id,
            program_id: form.program_id,
            lia_period_id: form.lia_period_id,
            bio: clean(form.bio),
            skills,
            linkedin_url: clean(form.linkedin_url),
            portfolio_url: clean(form.portfolio_url),
            cv_path: existing.and_then(|profile| profile.cv_path),
            updated_at: Utc::now(),
        };
        Ok(self.profiles.save_profile(profile)?)
    }

    /// School, program, and period must exist and belong together.
    fn check_links(&self, form: &ProfileForm) -> Result<(), ProfileError> {
        if let Some(school_id) = &form.school_id {
            if self.directory.school(school_id)?.is_none() {
                return Err(ProfileError::Validation("unknown school_id".to_string()));
            }
        }

        if let Some(program_id) = &form.program_id {
            let program = self
                .directory
                .program(program_id)?
                .ok_or_else(|| ProfileError::Validation("unknown program_id".to_string()))?;
            if form.school_id != Some(program.school_id) {
                return Err(ProfileError::Validation(
                    "program does not belong to the selected school".to_string(),
                ));
            }
        }

        if let Some(period_id) = &form.lia_period_id {
            let period = self
                .directory
                .lia_period(period_id)?
                .ok_or_else(|| ProfileError::Validation("unknown lia_period_id".to_string()))?;
            if form.program_id != Some(period.program_id) {
                return Err(ProfileError::Validation(
                    "LIA period does not belong to the selected program".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn own_profile(&self, principal: &Principal) -> Result<StudentProfile, ProfileError> {
        self.profiles
            .profile(&principal.user_id)?
            .ok_or(ProfileError::NotFound)
    }

    pub fn get_profile(
        &self,
        principal: &Principal,
        user_id: &UserId,
    ) -> Result<StudentProfile, ProfileError> {
        let profile = self.profiles.profile(user_id)?.ok_or(ProfileError::NotFound)?;
        if self.can_read(principal, &profile)? {
            Ok(profile)
        } else {
            Err(ProfileError::Forbidden)
        }
    }

    fn can_read(
        &self,
        principal: &Principal,
        profile: &StudentProfile,
    ) -> Result<bool, ProfileError> {
        let viewer_school = match principal.role {
            Role::School => self.directory.school_by_owner(&principal.user_id)?,
            _ => None,
        };
        let applied_to_viewer = match principal.role {
            Role::Company => self.applied_to_company_of(principal, &profile.user_id)?,
            _ => false,
        };
        Ok(access::can_read_student(
            principal,
            profile,
            viewer_school.as_ref(),
            applied_to_viewer,
        ))
    }

    fn applied_to_company_of(
        &self,
        principal: &Principal,
        student: &UserId,
    ) -> Result<bool, ProfileError> {
        let Some(company) = self.directory.company_by_owner(&principal.user_id)? else {
            return Ok(false);
        };
        let posting_ids: Vec<_> = self
            .postings
            .postings_for_company(&company.id)?
            .into_iter()
            .map(|posting| posting.id)
            .collect();
        Ok(self
            .applications
            .applications_for_postings(&posting_ids)?
            .iter()
            .any(|application| &application.student_id == student))
    }

    pub fn list_students_for_school(
        &self,
        principal: &Principal,
        school_id: &SchoolId,
    ) -> Result<Vec<StudentProfile>, ProfileError> {
        let school = self
            .directory
            .school(school_id)?
            .ok_or(ProfileError::NotFound)?;
        if !access::owns_school(principal, &school) {
            return Err(ProfileError::Forbidden);
        }
        let mut students = self.profiles.profiles_for_school(school_id)?;
        students.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(students)
    }

    /// Store a CV under the student's prefix and point the profile at it.
    ///
    /// The replaced CV is only removed once the profile is saved and no
    /// application still carries its path.
    pub fn upload_cv(
        &self,
        principal: &Principal,
        filename: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, ProfileError> {
        require_role(principal, &[Role::Student])?;
        let mut profile = self.own_profile(principal)?;

        if bytes.is_empty() {
            return Err(ProfileError::Validation("uploaded file is empty".to_string()));
        }
        if bytes.len() as u64 > self.max_upload_bytes {
            return Err(ProfileError::TooLarge {
                limit: self.max_upload_bytes,
            });
        }
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !CV_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ProfileError::Validation(format!(
                "CV must be one of: {}",
                CV_EXTENSIONS.join(", ")
            )));
        }

        let path = object_path(CV_PREFIX, principal.user_id, filename, Utc::now());
        let content_type = guess_content_type(filename);
        let stored = self.objects.put(&path, bytes, content_type.as_ref())?;

        let replaced = profile.cv_path.replace(stored.path.clone());
        let overwrote_previous = replaced.as_deref() == Some(stored.path.as_str());
        profile.updated_at = Utc::now();
        if let Err(err) = self.profiles.save_profile(profile) {
            if !overwrote_previous {
                self.discard_object(&stored.path, "failed to remove unsaved CV");
            }
            return Err(err.into());
        }

        let previous = replaced.filter(|previous| previous != &stored.path);

        if let Some(previous) = previous {
            if self.cv_referenced_by_applications(&principal.user_id, &previous)? {
                info!(path = %previous, "replaced CV kept for existing applications");
            } else {
                self.discard_object(&previous, "failed to remove replaced CV");
            }
        }

        info!(user_id = %principal.user_id, path = %stored.path, size = stored.size, "CV uploaded");
        Ok(stored)
    }

    fn cv_referenced_by_applications(
        &self,
        student: &UserId,
        path: &str,
    ) -> Result<bool, ProfileError> {
        Ok(self
            .applications
            .applications_for_student(student)?
            .iter()
            .any(|application| application.cv_path.as_deref() == Some(path)))
    }

    fn discard_object(&self, path: &str, message: &str) {
        if let Err(err) = self.objects.remove(path) {
            warn!(path = %path, error = %err, "{message}");
        }
    }

    pub fn download_cv(
        &self,
        principal: &Principal,
        user_id: &UserId,
    ) -> Result<(StoredObject, Vec<u8>), ProfileError> {
        let profile = self.get_profile(principal, user_id)?;
        let path = profile.cv_path.ok_or(ProfileError::NotFound)?;
        Ok(self.objects.get(&path)?)
    }
}

fn normalize_skills(skills: Vec<String>) -> Vec<String> {
    let mut folded = HashSet::new();
    let mut kept = Vec::new();
    for skill in skills {
        let skill = skill.trim().to_string();
        if !skill.is_empty() && folded.insert(skill.to_lowercase()) {
            kept.push(skill);
        }
    }
    kept
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("{0}")]
    Validation(String),
    #[error("profile not found")]
    NotFound,
    #[error("not allowed to view this profile")]
    Forbidden,
    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applications::{Application, ApplicationStatus};
    use crate::directory::domain::{Company, EducationProgram, LiaPeriod, School, Supervisor};
    use crate::ids::{ApplicationId, CompanyId, LiaPeriodId, PostingId, ProgramId};
    use crate::postings::{JobPosting, PostingStatus};
    use crate::storage::MemoryObjectStore;
    use crate::store::MemoryDatabase;
    use chrono::NaiveDate;

    const MAX_UPLOAD: u64 = 1024;

    struct Fixture {
        db: Arc<MemoryDatabase>,
        objects: Arc<MemoryObjectStore>,
        service: ProfileService,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(MemoryDatabase::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let service = service_with(db.clone(), &db, &objects);
        Fixture {
            db,
            objects,
            service,
        }
    }

    fn service_with(
        profiles: Arc<dyn ProfileRepository>,
        db: &Arc<MemoryDatabase>,
        objects: &Arc<MemoryObjectStore>,
    ) -> ProfileService {
        ProfileService::new(
            profiles,
            db.clone(),
            db.clone(),
            db.clone(),
            objects.clone(),
            MAX_UPLOAD,
        )
    }

    /// Reads from the database but refuses every save.
    struct ReadOnlyProfiles(Arc<MemoryDatabase>);

    impl ProfileRepository for ReadOnlyProfiles {
        fn save_profile(&self, _: StudentProfile) -> Result<StudentProfile, RepositoryError> {
            Err(RepositoryError::Unavailable("disk full".to_string()))
        }

        fn profile(&self, user: &UserId) -> Result<Option<StudentProfile>, RepositoryError> {
            self.0.profile(user)
        }

        fn profiles_by_ids(&self, ids: &[UserId]) -> Result<Vec<StudentProfile>, RepositoryError> {
            self.0.profiles_by_ids(ids)
        }

        fn profiles_for_school(
            &self,
            school: &SchoolId,
        ) -> Result<Vec<StudentProfile>, RepositoryError> {
            self.0.profiles_for_school(school)
        }
    }

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: UserId::new(),
            role,
        }
    }

    fn school(db: &MemoryDatabase, owner: &Principal) -> School {
        let now = Utc::now();
        db.save_school(School {
            id: SchoolId::new(),
            owner: owner.user_id,
            name: "Nackademin".to_string(),
            city: Some("Stockholm".to_string()),
            contact_email: None,
            website: None,
            description: None,
            created_at: now,
            updated_at: now,
        })
        .expect("school")
    }

    fn program(db: &MemoryDatabase, school: &School) -> EducationProgram {
        db.save_program(EducationProgram {
            id: ProgramId::new(),
            school_id: school.id,
            name: "Undersköterska".to_string(),
            field: "Vård".to_string(),
            description: None,
            lia_weeks: 8,
            created_at: Utc::now(),
        })
        .expect("program")
    }

    fn period(db: &MemoryDatabase, program: &EducationProgram) -> LiaPeriod {
        db.save_lia_period(LiaPeriod {
            id: LiaPeriodId::new(),
            program_id: program.id,
            school_id: program.school_id,
            name: "LIA 2".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 9, 7).expect("valid"),
            end_date: NaiveDate::from_ymd_opt(2026, 11, 1).expect("valid"),
            slots: 4,
            created_at: Utc::now(),
        })
        .expect("period")
    }

    fn form(name: &str) -> ProfileForm {
        ProfileForm {
            full_name: name.to_string(),
            ..ProfileForm::default()
        }
    }

    fn application(
        student_id: UserId,
        posting_id: PostingId,
        cv_path: Option<String>,
    ) -> Application {
        let now = Utc::now();
        Application {
            id: ApplicationId::new(),
            posting_id,
            student_id,
            cover_letter: None,
            cv_path,
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn program_must_belong_to_the_selected_school() {
        let fx = fixture();
        let chosen = school(&fx.db, &principal(Role::School));
        let other = school(&fx.db, &principal(Role::School));
        let foreign_program = program(&fx.db, &other);

        let err = fx
            .service
            .upsert_profile(
                &principal(Role::Student),
                ProfileForm {
                    school_id: Some(chosen.id),
                    program_id: Some(foreign_program.id),
                    ..form("Amina Yusuf")
                },
            )
            .expect_err("mismatched program");
        assert!(matches!(err, ProfileError::Validation(_)));
    }

    #[test]
    fn period_must_belong_to_the_selected_program() {
        let fx = fixture();
        let school_row = school(&fx.db, &principal(Role::School));
        let chosen = program(&fx.db, &school_row);
        let sibling = program(&fx.db, &school_row);
        let sibling_period = period(&fx.db, &sibling);

        let err = fx
            .service
            .upsert_profile(
                &principal(Role::Student),
                ProfileForm {
                    school_id: Some(school_row.id),
                    program_id: Some(chosen.id),
                    lia_period_id: Some(sibling_period.id),
                    ..form("Amina Yusuf")
                },
            )
            .expect_err("mismatched period");
        assert!(matches!(err, ProfileError::Validation(_)));

        let saved = fx
            .service
            .upsert_profile(
                &principal(Role::Student),
                ProfileForm {
                    school_id: Some(school_row.id),
                    program_id: Some(sibling.id),
                    lia_period_id: Some(sibling_period.id),
                    ..form("Amina Yusuf")
                },
            )
            .expect("consistent links");
        assert_eq!(saved.lia_period_id, Some(sibling_period.id));
    }

    #[test]
    fn skills_are_deduplicated_across_swedish_case() {
        let fx = fixture();
        let saved = fx
            .service
            .upsert_profile(
                &principal(Role::Student),
                ProfileForm {
                    skills: vec![
                        "Vård".to_string(),
                        " VÅRD ".to_string(),
                        "Omsorg".to_string(),
                        "   ".to_string(),
                    ],
                    ..form("Åsa Öberg")
                },
            )
            .expect("profile");
        assert_eq!(saved.skills, vec!["Vård".to_string(), "Omsorg".to_string()]);
    }

    #[test]
    fn upload_rejects_empty_oversized_and_unknown_files() {
        let fx = fixture();
        let student = principal(Role::Student);
        fx.service
            .upsert_profile(&student, form("Jonas Berg"))
            .expect("profile");

        let empty = fx.service.upload_cv(&student, "cv.pdf", b"");
        assert!(matches!(empty, Err(ProfileError::Validation(_))));

        let oversized = fx
            .service
            .upload_cv(&student, "cv.pdf", &vec![b'x'; MAX_UPLOAD as usize + 1]);
        assert!(matches!(oversized, Err(ProfileError::TooLarge { limit: MAX_UPLOAD })));

        let executable = fx.service.upload_cv(&student, "cv.exe", b"MZ");
        assert!(matches!(executable, Err(ProfileError::Validation(_))));

        assert!(fx.objects.paths().is_empty());
        assert!(fx.service.own_profile(&student).expect("profile").cv_path.is_none());
    }

    #[test]
    fn upload_requires_an_existing_profile() {
        let fx = fixture();
        let err = fx
            .service
            .upload_cv(&principal(Role::Student), "cv.pdf", b"%PDF")
            .expect_err("no profile");
        assert!(matches!(err, ProfileError::NotFound));
    }

    #[test]
    fn second_upload_replaces_an_unreferenced_cv() {
        let fx = fixture();
        let student = principal(Role::Student);
        fx.service
            .upsert_profile(&student, form("Jonas Berg"))
            .expect("profile");

        let first = fx
            .service
            .upload_cv(&student, "cv-vt.pdf", b"%PDF first")
            .expect("first upload");
        let second = fx
            .service
            .upload_cv(&student, "cv-ht.pdf", b"%PDF second")
            .expect("second upload");

        let profile = fx.service.own_profile(&student).expect("profile");
        assert_eq!(profile.cv_path.as_deref(), Some(second.path.as_str()));
        assert_eq!(fx.objects.paths(), vec![second.path.clone()]);
        assert!(matches!(
            fx.objects.get(&first.path),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn replaced_cv_survives_while_an_application_points_at_it() {
        let fx = fixture();
        let student = principal(Role::Student);
        fx.service
            .upsert_profile(&student, form("Jonas Berg"))
            .expect("profile");
        let first = fx
            .service
            .upload_cv(&student, "cv-vt.pdf", b"%PDF first")
            .expect("first upload");
        fx.db
            .insert_application(application(
                student.user_id,
                PostingId::new(),
                Some(first.path.clone()),
            ))
            .expect("application");

        let second = fx
            .service
            .upload_cv(&student, "cv-ht.pdf", b"%PDF second")
            .expect("second upload");

        let (_, bytes) = fx.objects.get(&first.path).expect("old CV kept");
        assert_eq!(bytes, b"%PDF first");
        let profile = fx.service.own_profile(&student).expect("profile");
        assert_eq!(profile.cv_path.as_deref(), Some(second.path.as_str()));
    }

    #[test]
    fn failed_profile_save_discards_the_new_upload() {
        let fx = fixture();
        let student = principal(Role::Student);
        fx.service
            .upsert_profile(&student, form("Jonas Berg"))
            .expect("profile");
        let first = fx
            .service
            .upload_cv(&student, "cv-vt.pdf", b"%PDF first")
            .expect("first upload");

        let read_only = Arc::new(ReadOnlyProfiles(fx.db.clone()));
        let failing = service_with(read_only, &fx.db, &fx.objects);
        let err = failing
            .upload_cv(&student, "cv-ht.pdf", b"%PDF second")
            .expect_err("save fails");
        assert!(matches!(err, ProfileError::Repository(RepositoryError::Unavailable(_))));

        assert_eq!(fx.objects.paths(), vec![first.path.clone()]);
        let profile = fx.service.own_profile(&student).expect("profile");
        assert_eq!(profile.cv_path.as_deref(), Some(first.path.as_str()));
    }

    #[test]
    fn companies_see_applicants_and_schools_see_their_students() {
        let fx = fixture();
        let school_owner = principal(Role::School);
        let school_row = school(&fx.db, &school_owner);
        let student = principal(Role::Student);
        fx.service
            .upsert_profile(
                &student,
                ProfileForm {
                    school_id: Some(school_row.id),
                    ..form("Amina Yusuf")
                },
            )
            .expect("profile");

        fx.service
            .get_profile(&school_owner, &student.user_id)
            .expect("linked school reads");
        let rival_school = principal(Role::School);
        school(&fx.db, &rival_school);
        let err = fx
            .service
            .get_profile(&rival_school, &student.user_id)
            .expect_err("other school");
        assert!(matches!(err, ProfileError::Forbidden));

        let company_owner = principal(Role::Company);
        let now = Utc::now();
        let company = fx
            .db
            .save_company(Company {
                id: CompanyId::new(),
                owner: company_owner.user_id,
                name: "Omsorgshuset AB".to_string(),
                org_number: None,
                industry: Some("Vård".to_string()),
                city: None,
                website: None,
                description: None,
                supervisor: Supervisor::default(),
                created_at: now,
                updated_at: now,
            })
            .expect("company");
        let err = fx
            .service
            .get_profile(&company_owner, &student.user_id)
            .expect_err("no application yet");
        assert!(matches!(err, ProfileError::Forbidden));

        let posting = fx
            .db
            .insert_posting(JobPosting {
                id: PostingId::new(),
                company_id: company.id,
                title: "Undersköterska LIA".to_string(),
                category: "Vård".to_string(),
                description: None,
                location: None,
                remote: false,
                positions: 1,
                lia_period_id: None,
                requirements: Vec::new(),
                deadline: None,
                status: PostingStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .expect("posting");
        fx.db
            .insert_application(application(student.user_id, posting.id, None))
            .expect("application");

        let profile = fx
            .service
            .get_profile(&company_owner, &student.user_id)
            .expect("applicant visible");
        assert_eq!(profile.full_name, "Amina Yusuf");
    }
}
