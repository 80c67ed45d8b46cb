use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{
    ApplicationRepository, DirectoryRepository, PostingRepository, ProfileRepository,
    RepositoryError, UserRepository,
};
use crate::applications::domain::Application;
use crate::auth::domain::{Session, UserAccount};
use crate::directory::domain::{Company, EducationProgram, LiaPeriod, School};
use crate::ids::{
    ApplicationId, CompanyId, LiaPeriodId, PostingId, ProgramId, SchoolId, UserId,
};
use crate::postings::domain::JobPosting;
use crate::profiles::domain::StudentProfile;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    users: HashMap<UserId, UserAccount>,
    #[serde(default)]
    sessions: HashMap<String, Session>,
    #[serde(default)]
    schools: HashMap<SchoolId, School>,
    #[serde(default)]
    companies: HashMap<CompanyId, Company>,
    #[serde(default)]
    programs: HashMap<ProgramId, EducationProgram>,
    #[serde(default)]
    lia_periods: HashMap<LiaPeriodId, LiaPeriod>,
    #[serde(default)]
    profiles: HashMap<UserId, StudentProfile>,
    #[serde(default)]
    postings: HashMap<PostingId, JobPosting>,
    #[serde(default)]
    applications: HashMap<ApplicationId, Application>,
}

/// Mutex-guarded tables, optionally mirrored to a JSON snapshot after each write.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
    snapshot: Option<PathBuf>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a snapshot-backed database, loading the file when it exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let tables = if path.exists() {
            let raw = fs::read(&path).map_err(|err| unavailable(&path, err))?;
            let tables: Tables = serde_json::from_slice(&raw).map_err(|err| {
                RepositoryError::Unavailable(format!(
                    "snapshot {} is not valid: {err}",
                    path.display()
                ))
            })?;
            info!(
                path = %path.display(),
                users = tables.users.len(),
                postings = tables.postings.len(),
                applications = tables.applications.len(),
                "loaded database snapshot"
            );
            tables
        } else {
            Tables::default()
        };

        Ok(Self {
            tables: Mutex::new(tables),
            snapshot: Some(path),
        })
    }

    fn read(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("database mutex poisoned".to_string()))
    }

    /// Apply a mutation under the lock. With a snapshot, the mutation runs on a
    /// staged copy that only replaces the live tables once it is on disk.
    fn write<T>(
        &self,
        mutate: impl FnOnce(&mut Tables) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.read()?;
        let Some(path) = &self.snapshot else {
            return mutate(&mut guard);
        };
        let mut staged = guard.clone();
        let value = mutate(&mut staged)?;
        persist(path, &staged)?;
        *guard = staged;
        Ok(value)
    }
}

fn persist(path: &Path, tables: &Tables) -> Result<(), RepositoryError> {
    let encoded = serde_json::to_vec_pretty(tables)
        .map_err(|err| RepositoryError::Unavailable(format!("snapshot encode failed: {err}")))?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| unavailable(path, err))?;
    }

    let staging = path.with_extension("json.tmp");
    let result = fs::File::create(&staging)
        .and_then(|mut file| {
            file.write_all(&encoded)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&staging, path));

    result.map_err(|err| {
        warn!(path = %path.display(), error = %err, "failed to persist database snapshot");
        unavailable(path, err)
    })
}

fn unavailable(path: &Path, err: std::io::Error) -> RepositoryError {
    RepositoryError::Unavailable(format!("{}: {err}", path.display()))
}

fn pick<K, V>(table: &HashMap<K, V>, ids: &[K]) -> Vec<V>
where
    K: std::hash::Hash + Eq,
    V: Clone,
{
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(*id))
        .filter_map(|id| table.get(id).cloned())
        .collect()
}

impl UserRepository for MemoryDatabase {
    fn insert_user(&self, account: UserAccount) -> Result<UserAccount, RepositoryError> {
        self.write(|tables| {
            let taken = tables
                .users
                .values()
                .any(|existing| existing.email.eq_ignore_ascii_case(&account.email));
            if taken || tables.users.contains_key(&account.id) {
                return Err(RepositoryError::Conflict);
            }
            tables.users.insert(account.id, account.clone());
            Ok(account)
        })
    }

    fn user(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        Ok(self.read()?.users.get(id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError> {
        let guard = self.read()?;
        Ok(guard
            .users
            .values()
            .find(|account| account.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn users(&self) -> Result<Vec<UserAccount>, RepositoryError> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    fn insert_session(&self, session: Session) -> Result<(), RepositoryError> {
        self.write(|tables| {
            let now = session.created_at;
            tables.sessions.retain(|_, existing| !existing.is_expired(now));
            tables.sessions.insert(session.token.clone(), session);
            Ok(())
        })
    }

    fn session(&self, token: &str) -> Result<Option<Session>, RepositoryError> {
        Ok(self.read()?.sessions.get(token).cloned())
    }

    fn remove_session(&self, token: &str) -> Result<(), RepositoryError> {
        self.write(|tables| {
            tables.sessions.remove(token);
            Ok(())
        })
    }
}

impl DirectoryRepository for MemoryDatabase {
    fn save_school(&self, school: School) -> Result<School, RepositoryError> {
        self.write(|tables| {
            let owned_elsewhere = tables
                .schools
                .values()
                .any(|existing| existing.owner == school.owner && existing.id != school.id);
            if owned_elsewhere {
                return Err(RepositoryError::Conflict);
            }
            tables.schools.insert(school.id, school.clone());
            Ok(school)
        })
    }

    fn school(&self, id: &SchoolId) -> Result<Option<School>, RepositoryError> {
        Ok(self.read()?.schools.get(id).cloned())
    }

    fn school_by_owner(&self, owner: &UserId) -> Result<Option<School>, RepositoryError> {
        let guard = self.read()?;
        Ok(guard
            .schools
            .values()
            .find(|school| &school.owner == owner)
            .cloned())
    }

    fn schools(&self) -> Result<Vec<School>, RepositoryError> {
        Ok(self.read()?.schools.values().cloned().collect())
    }

    fn save_company(&self, company: Company) -> Result<Company, RepositoryError> {
        self.write(|tables| {
            let owned_elsewhere = tables
                .companies
                .values()
                .any(|existing| existing.owner == company.owner && existing.id != company.id);
            if owned_elsewhere {
                return Err(RepositoryError::Conflict);
            }
            tables.companies.insert(company.id, company.clone());
            Ok(company)
        })
    }

    fn company(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError> {
        Ok(self.read()?.companies.get(id).cloned())
    }

    fn company_by_owner(&self, owner: &UserId) -> Result<Option<Company>, RepositoryError> {
        let guard = self.read()?;
        Ok(guard
            .companies
            .values()
            .find(|company| &company.owner == owner)
            .cloned())
    }

    fn companies(&self) -> Result<Vec<Company>, RepositoryError> {
        Ok(self.read()?.companies.values().cloned().collect())
    }

    fn companies_by_ids(&self, ids: &[CompanyId]) -> Result<Vec<Company>, RepositoryError> {
        Ok(pick(&self.read()?.companies, ids))
    }

    fn save_program(
        &self,
        program: EducationProgram,
    ) -> Result<EducationProgram, RepositoryError> {
        self.write(|tables| {
            if !tables.schools.contains_key(&program.school_id) {
                return Err(RepositoryError::NotFound);
            }
            tables.programs.insert(program.id, program.clone());
            Ok(program)
        })
    }

    fn program(&self, id: &ProgramId) -> Result<Option<EducationProgram>, RepositoryError> {
        Ok(self.read()?.programs.get(id).cloned())
    }

    fn programs_for_school(
        &self,
        school: &SchoolId,
    ) -> Result<Vec<EducationProgram>, RepositoryError> {
        let guard = self.read()?;
        Ok(guard
            .programs
            .values()
            .filter(|program| &program.school_id == school)
            .cloned()
            .collect())
    }

    fn delete_program(&self, id: &ProgramId) -> Result<(), RepositoryError> {
        self.write(|tables| {
            tables
                .programs
                .remove(id)
                .map(|_| ())
                .ok_or(RepositoryError::NotFound)
        })
    }

    fn save_lia_period(&self, period: LiaPeriod) -> Result<LiaPeriod, RepositoryError> {
        self.write(|tables| {
            if !tables.programs.contains_key(&period.program_id) {
                return Err(RepositoryError::NotFound);
            }
            tables.lia_periods.insert(period.id, period.clone());
            Ok(period)
        })
    }

    fn lia_period(&self, id: &LiaPeriodId) -> Result<Option<LiaPeriod>, RepositoryError> {
        Ok(self.read()?.lia_periods.get(id).cloned())
    }

    fn lia_periods_for_school(
        &self,
        school: &SchoolId,
    ) -> Result<Vec<LiaPeriod>, RepositoryError> {
        let guard = self.read()?;
        Ok(guard
            .lia_periods
            .values()
            .filter(|period| &period.school_id == school)
            .cloned()
            .collect())
    }

    fn delete_lia_period(&self, id: &LiaPeriodId) -> Result<(), RepositoryError> {
        self.write(|tables| {
            tables
                .lia_periods
                .remove(id)
                .map(|_| ())
                .ok_or(RepositoryError::NotFound)
        })
    }
}

impl ProfileRepository for MemoryDatabase {
    fn save_profile(&self, profile: StudentProfile) -> Result<StudentProfile, RepositoryError> {
        self.write(|tables| {
            tables.profiles.insert(profile.user_id, profile.clone());
            Ok(profile)
        })
    }

    fn profile(&self, user: &UserId) -> Result<Option<StudentProfile>, RepositoryError> {
        Ok(self.read()?.profiles.get(user).cloned())
    }

    fn profiles_by_ids(&self, ids: &[UserId]) -> Result<Vec<StudentProfile>, RepositoryError> {
        Ok(pick(&self.read()?.profiles, ids))
    }

    fn profiles_for_school(
        &self,
        school: &SchoolId,
    ) -> Result<Vec<StudentProfile>, RepositoryError> {
        let guard = self.read()?;
        Ok(guard
            .profiles
            .values()
            .filter(|profile| profile.school_id.as_ref() == Some(school))
            .cloned()
            .collect())
    }
}

impl PostingRepository for MemoryDatabase {
    fn insert_posting(&self, posting: JobPosting) -> Result<JobPosting, RepositoryError> {
        self.write(|tables| {
            if tables.postings.contains_key(&posting.id) {
                return Err(RepositoryError::Conflict);
            }
            if !tables.companies.contains_key(&posting.company_id) {
                return Err(RepositoryError::NotFound);
            }
            tables.postings.insert(posting.id, posting.clone());
            Ok(posting)
        })
    }

    fn update_posting(&self, posting: JobPosting) -> Result<(), RepositoryError> {
        self.write(|tables| match tables.postings.get_mut(&posting.id) {
            Some(existing) => {
                *existing = posting;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        })
    }

    fn posting(&self, id: &PostingId) -> Result<Option<JobPosting>, RepositoryError> {
        Ok(self.read()?.postings.get(id).cloned())
    }

    fn postings_by_ids(&self, ids: &[PostingId]) -> Result<Vec<JobPosting>, RepositoryError> {
        Ok(pick(&self.read()?.postings, ids))
    }

    fn postings_for_company(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<JobPosting>, RepositoryError> {
        let guard = self.read()?;
        Ok(guard
            .postings
            .values()
            .filter(|posting| &posting.company_id == company)
            .cloned()
            .collect())
    }

    fn postings(&self) -> Result<Vec<JobPosting>, RepositoryError> {
        Ok(self.read()?.postings.values().cloned().collect())
    }

    fn delete_posting(&self, id: &PostingId) -> Result<(), RepositoryError> {
        self.write(|tables| {
            tables
                .postings
                .remove(id)
                .map(|_| ())
                .ok_or(RepositoryError::NotFound)
        })
    }
}

impl ApplicationRepository for MemoryDatabase {
    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        self.write(|tables| {
            let duplicate = tables.applications.values().any(|existing| {
                existing.posting_id == application.posting_id
                    && existing.student_id == application.student_id
            });
            if duplicate || tables.applications.contains_key(&application.id) {
                return Err(RepositoryError::Conflict);
            }
            tables.applications.insert(application.id, application.clone());
            Ok(application)
        })
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        self.write(|tables| match tables.applications.get_mut(&application.id) {
            Some(existing) => {
                *existing = application;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        })
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.read()?.applications.get(id).cloned())
    }

    fn applications_for_student(
        &self,
        student: &UserId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.read()?;
        Ok(guard
            .applications
            .values()
            .filter(|application| &application.student_id == student)
            .cloned()
            .collect())
    }

    fn applications_for_postings(
        &self,
        postings: &[PostingId],
    ) -> Result<Vec<Application>, RepositoryError> {
        let wanted: HashSet<&PostingId> = postings.iter().collect();
        let guard = self.read()?;
        Ok(guard
            .applications
            .values()
            .filter(|application| wanted.contains(&application.posting_id))
            .cloned()
            .collect())
    }

    fn applications_for_students(
        &self,
        students: &[UserId],
    ) -> Result<Vec<Application>, RepositoryError> {
        let wanted: HashSet<&UserId> = students.iter().collect();
        let guard = self.read()?;
        Ok(guard
            .applications
            .values()
            .filter(|application| wanted.contains(&application.student_id))
            .cloned()
            .collect())
    }

    fn applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Ok(self.read()?.applications.values().cloned().collect())
    }
}
