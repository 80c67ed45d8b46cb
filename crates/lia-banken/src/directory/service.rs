use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{
    clean, Company, CompanyForm, EducationProgram, LiaPeriod, LiaPeriodForm, ProgramForm, School,
    SchoolForm,
};
use crate::access;
use crate::auth::{require_role, AuthError, Principal, Role};
use crate::ids::{CompanyId, LiaPeriodId, ProgramId, SchoolId};
use crate::store::{DirectoryRepository, RepositoryError};

/// Schools, companies, and the programs and LIA periods schools publish.
pub struct DirectoryService {
    repository: Arc<dyn DirectoryRepository>,
}

impl DirectoryService {
    pub fn new(repository: Arc<dyn DirectoryRepository>) -> Self {
        Self { repository }
    }

    /// Create or update the caller's school.
    pub fn upsert_school(
        &self,
        principal: &Principal,
        form: SchoolForm,
    ) -> Result<School, DirectoryError> {
        require_role(principal, &[Role::School])?;
        let name = required(&form.name, "name")?;
        let now = Utc::now();

        let school = match self.repository.school_by_owner(&principal.user_id)? {
            Some(existing) => School {
                name,
                city: clean(form.city),
                contact_email: clean(form.contact_email),
                website: clean(form.website),
                description: clean(form.description),
                updated_at: now,
                ..existing
            },
            None => School {
                id: SchoolId::new(),
                owner: principal.user_id,
                name,
                city: clean(form.city),
                contact_email: clean(form.contact_email),
                website: clean(form.website),
                description: clean(form.description),
                created_at: now,
                updated_at: now,
            },
        };

        let stored = self.repository.save_school(school)?;
        info!(school_id = %stored.id, "school saved");
        Ok(stored)
    }

    pub fn school(&self, id: &SchoolId) -> Result<School, DirectoryError> {
        self.repository
            .school(id)?
            .ok_or(DirectoryError::NotFound("school"))
    }

    pub fn list_schools(&self) -> Result<Vec<School>, DirectoryError> {
        let mut schools = self.repository.schools()?;
        schools.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(schools)
    }

    /// Create or update the caller's company.
    pub fn upsert_company(
        &self,
        principal: &Principal,
        form: CompanyForm,
    ) -> Result<Company, DirectoryError> {
        require_role(principal, &[Role::Company])?;
        let name = required(&form.name, "name")?;
        let now = Utc::now();
        let supervisor = super::domain::Supervisor {
            name: clean(form.supervisor.name),
            email: clean(form.supervisor.email),
            phone: clean(form.supervisor.phone),
        };

        let company = match self.repository.company_by_owner(&principal.user_id)? {
            Some(existing) => Company {
                name,
                org_number: clean(form.org_number),
                industry: clean(form.industry),
                city: clean(form.city),
                website: clean(form.website),
                description: clean(form.description),
                supervisor,
                updated_at: now,
                ..existing
            },
            None => Company {
                id: CompanyId::new(),
                owner: principal.user_id,
                name,
                org_number: clean(form.org_number),
                industry: clean(form.industry),
                city: clean(form.city),
                website: clean(form.website),
                description: clean(form.description),
                supervisor,
                created_at: now,
                updated_at: now,
            },
        };

        let stored = self.repository.save_company(company)?;
        info!(company_id = %stored.id, "company saved");
        Ok(stored)
    }

    pub fn company(&self, id: &CompanyId) -> Result<Company, DirectoryError> {
        self.repository
            .company(id)?
            .ok_or(DirectoryError::NotFound("company"))
    }

    pub fn list_companies(&self) -> Result<Vec<Company>, DirectoryError> {
        let mut companies = self.repository.companies()?;
        companies.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(companies)
    }

    pub fn create_program(
        &self,
        principal: &Principal,
        form: ProgramForm,
    ) -> Result<EducationProgram, DirectoryError> {
        let school = self.caller_school(principal)?;
        let program = EducationProgram {
            id: ProgramId::new(),
            school_id: school.id,
            name: required(&form.name, "name")?,
            field: required(&form.field, "field")?,
            description: clean(form.description),
            lia_weeks: positive_weeks(form.lia_weeks)?,
            created_at: Utc::now(),
        };
        Ok(self.repository.save_program(program)?)
    }

    pub fn update_program(
        &self,
        principal: &Principal,
        id: &ProgramId,
        form: ProgramForm,
    ) -> Result<EducationProgram, DirectoryError> {
        let existing = self.program(id)?;
        self.ensure_school_owner(principal, &existing.school_id)?;
        let program = EducationProgram {
            name: required(&form.name, "name")?,
            field: required(&form.field, "field")?,
            description: clean(form.description),
            lia_weeks: positive_weeks(form.lia_weeks)?,
            ..existing
        };
        Ok(self.repository.save_program(program)?)
    }

    pub fn delete_program(&self, principal: &Principal, id: &ProgramId) -> Result<(), DirectoryError> {
        let existing = self.program(id)?;
        self.ensure_school_owner(principal, &existing.school_id)?;
        let in_use = self
            .repository
            .lia_periods_for_school(&existing.school_id)?
            .iter()
            .any(|period| &period.program_id == id);
        if in_use {
            return Err(DirectoryError::InUse("program has LIA periods"));
        }
        Ok(self.repository.delete_program(id)?)
    }

    pub fn program(&self, id: &ProgramId) -> Result<EducationProgram, DirectoryError> {
        self.repository
            .program(id)?
            .ok_or(DirectoryError::NotFound("program"))
    }

    pub fn list_programs(&self, school: &SchoolId) -> Result<Vec<EducationProgram>, DirectoryError> {
        let mut programs = self.repository.programs_for_school(school)?;
        programs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(programs)
    }

    pub fn create_lia_period(
        &self,
        principal: &Principal,
        form: LiaPeriodForm,
    ) -> Result<LiaPeriod, DirectoryError> {
        let program = self.program(&form.program_id)?;
        self.ensure_school_owner(principal, &program.school_id)?;
        if form.end_date <= form.start_date {
            return Err(DirectoryError::Validation(
                "end_date must be after start_date".to_string(),
            ));
        }
        if form.slots == 0 {
            return Err(DirectoryError::Validation(
                "slots must be greater than zero".to_string(),
            ));
        }

        let period = LiaPeriod {
            id: LiaPeriodId::new(),
            program_id: program.id,
            school_id: program.school_id,
            name: required(&form.name, "name")?,
            start_date: form.start_date,
            end_date: form.end_date,
            slots: form.slots,
            created_at: Utc::now(),
        };
        let stored = self.repository.save_lia_period(period)?;
        info!(lia_period_id = %stored.id, program_id = %stored.program_id, "LIA period created");
        Ok(stored)
    }

    pub fn lia_period(&self, id: &LiaPeriodId) -> Result<LiaPeriod, DirectoryError> {
        self.repository
            .lia_period(id)?
            .ok_or(DirectoryError::NotFound("LIA period"))
    }

    /// Periods for a school, optionally narrowed to one program, earliest first.
    pub fn list_lia_periods(
        &self,
        school: &SchoolId,
        program: Option<&ProgramId>,
    ) -> Result<Vec<LiaPeriod>, DirectoryError> {
        let mut periods: Vec<LiaPeriod> = self
            .repository
            .lia_periods_for_school(school)?
            .into_iter()
            .filter(|period| program.map_or(true, |program| &period.program_id == program))
            .collect();
        periods.sort_by_key(|period| period.start_date);
        Ok(periods)
    }

    pub fn delete_lia_period(
        &self,
        principal: &Principal,
        id: &LiaPeriodId,
    ) -> Result<(), DirectoryError> {
        let period = self.lia_period(id)?;
        self.ensure_school_owner(principal, &period.school_id)?;
        Ok(self.repository.delete_lia_period(id)?)
    }

    fn caller_school(&self, principal: &Principal) -> Result<School, DirectoryError> {
        require_role(principal, &[Role::School])?;
        self.repository
            .school_by_owner(&principal.user_id)?
            .ok_or(DirectoryError::MissingOrganization("school"))
    }

    fn ensure_school_owner(
        &self,
        principal: &Principal,
        school_id: &SchoolId,
    ) -> Result<(), DirectoryError> {
        let school = self.school(school_id)?;
        if access::owns_school(principal, &school) {
            Ok(())
        } else {
            Err(DirectoryError::Forbidden)
        }
    }
}

fn required(value: &str, field: &str) -> Result<String, DirectoryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DirectoryError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn positive_weeks(weeks: u16) -> Result<u16, DirectoryError> {
    if weeks == 0 {
        return Err(DirectoryError::Validation(
            "lia_weeks must be greater than zero".to_string(),
        ));
    }
    Ok(weeks)
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("register a {0} before managing its listings")]
    MissingOrganization(&'static str),
    #[error("{0}")]
    InUse(&'static str),
    #[error("not allowed to modify this record")]
    Forbidden,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
