use crate::infra::{open_database, parse_date};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use lia_banken::applications::{write_applications_csv, ApplicationStatus, ApplyRequest};
use lia_banken::auth::domain::SignUpRequest;
use lia_banken::auth::{Principal, Role};
use lia_banken::config::{AuthConfig, StorageConfig};
use lia_banken::dashboards::{Dashboard, StatusCounts};
use lia_banken::directory::{CompanyForm, LiaPeriodForm, ProgramForm, SchoolForm, Supervisor};
use lia_banken::error::AppError;
use lia_banken::notifications::{RecordingNotifier, TracingNotifier};
use lia_banken::postings::PostingForm;
use lia_banken::profiles::ProfileForm;
use lia_banken::storage::MemoryObjectStore;
use lia_banken::store::MemoryDatabase;
use lia_banken::Platform;
use serde_json::json;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_PASSWORD: &str = "lia-demo-2026";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// First day of the seeded LIA period (YYYY-MM-DD). Defaults to eight weeks from today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) lia_start: Option<NaiveDate>,
    /// Print the dashboards as JSON instead of text.
    #[arg(long)]
    pub(crate) output_json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Database snapshot written by the server (LIA_DATA_FILE)
    #[arg(long)]
    pub(crate) data_file: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct AdminArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) password: String,
    /// Database snapshot the server reads (LIA_DATA_FILE)
    #[arg(long)]
    pub(crate) data_file: PathBuf,
}

struct DemoCast {
    school: Principal,
    company: Principal,
    student: Principal,
    admin: Principal,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let notifier = Arc::new(RecordingNotifier::default());
    let platform = Platform::new(
        Arc::new(MemoryDatabase::new()),
        Arc::new(MemoryObjectStore::new()),
        notifier.clone(),
        AuthConfig::default(),
        &StorageConfig::default(),
    );
    let lia_start = args
        .lia_start
        .unwrap_or_else(|| Local::now().date_naive() + Duration::weeks(8));

    let cast = seed(&platform, lia_start)?;
    let dashboards = [
        ("school", platform.dashboards().dashboard(&cast.school)?),
        ("company", platform.dashboards().dashboard(&cast.company)?),
        ("student", platform.dashboards().dashboard(&cast.student)?),
        ("admin", platform.dashboards().dashboard(&cast.admin)?),
    ];

    if args.output_json {
        let payload = json!({
            "lia_start": lia_start,
            "events": notifier.events(),
            "dashboards": dashboards
                .iter()
                .map(|(role, dashboard)| (role.to_string(), json!(dashboard)))
                .collect::<serde_json::Map<_, _>>(),
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Dashboard payload unavailable: {err}"),
        }
        return Ok(());
    }

    println!("LIA Banken demo (LIA period starting {lia_start})");
    println!("- {} notification events dispatched", notifier.events().len());
    for (_, dashboard) in &dashboards {
        render_dashboard(dashboard);
    }
    Ok(())
}

fn seed(platform: &Platform, lia_start: NaiveDate) -> Result<DemoCast, AppError> {
    let school = register(platform, "lia@yh-norrland.se", Role::School)?;
    let company = register(platform, "rekrytering@kodverket.se", Role::Company)?;
    let student = register(platform, "elin.ek@student.se", Role::Student)?;
    let admin_account = platform
        .auth()
        .bootstrap_admin("admin@liabanken.se", DEMO_PASSWORD)?;
    let admin = Principal {
        user_id: admin_account.id,
        role: Role::Admin,
    };

    let directory = platform.directory();
    let school_row = directory.upsert_school(
        &school,
        SchoolForm {
            name: "YH Norrland".to_string(),
            city: Some("Umeå".to_string()),
            contact_email: Some("lia@yh-norrland.se".to_string()),
            ..SchoolForm::default()
        },
    )?;
    let program = directory.create_program(
        &school,
        ProgramForm {
            name: "Javautvecklare".to_string(),
            field: "IT".to_string(),
            description: Some("Tvåårig YH-utbildning med två LIA-perioder.".to_string()),
            lia_weeks: 12,
        },
    )?;
    let period = directory.create_lia_period(
        &school,
        LiaPeriodForm {
            program_id: program.id,
            name: "LIA 1".to_string(),
            start_date: lia_start,
            end_date: lia_start + Duration::weeks(i64::from(program.lia_weeks)),
            slots: 3,
        },
    )?;

    directory.upsert_company(
        &company,
        CompanyForm {
            name: "Kodverket AB".to_string(),
            industry: Some("Mjukvara".to_string()),
            city: Some("Umeå".to_string()),
            supervisor: Supervisor {
                name: Some("Maja Holm".to_string()),
                email: Some("maja.holm@kodverket.se".to_string()),
                phone: None,
            },
            ..CompanyForm::default()
        },
    )?;
    let posting = platform.postings().create_posting(
        &company,
        PostingForm {
            title: "Javautvecklare LIA".to_string(),
            category: "IT".to_string(),
            description: Some("Backendutveckling i Spring och PostgreSQL.".to_string()),
            location: Some("Umeå".to_string()),
            positions: Some(2),
            lia_period_id: Some(period.id),
            requirements: vec!["Java".to_string(), "SQL".to_string()],
            publish: true,
            ..PostingForm::default()
        },
    )?;

    platform.profiles().upsert_profile(
        &student,
        ProfileForm {
            full_name: "Elin Ek".to_string(),
            city: Some("Umeå".to_string()),
            school_id: Some(school_row.id),
            program_id: Some(program.id),
            lia_period_id: Some(period.id),
            skills: vec!["Java".to_string(), "Spring".to_string()],
            ..ProfileForm::default()
        },
    )?;
    platform
        .profiles()
        .upload_cv(&student, "elin-ek-cv.pdf", b"%PDF-1.7 demo")?;

    let application = platform.applications().apply(
        &student,
        ApplyRequest {
            posting_id: posting.id,
            cover_letter: Some("Jag vill gärna göra min första LIA hos er.".to_string()),
        },
    )?;
    platform
        .applications()
        .update_status(&company, &application.id, ApplicationStatus::Interview)?;

    Ok(DemoCast {
        school,
        company,
        student,
        admin,
    })
}

fn register(platform: &Platform, email: &str, role: Role) -> Result<Principal, AppError> {
    let account = platform.auth().sign_up(SignUpRequest {
        email: email.to_string(),
        password: DEMO_PASSWORD.to_string(),
        role,
    })?;
    Ok(Principal {
        user_id: account.id,
        role,
    })
}

fn render_counts(label: &str, counts: &StatusCounts) {
    let parts: Vec<String> = counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(status, count)| format!("{status} {count}"))
        .collect();
    if parts.is_empty() {
        println!("  {label}: none");
    } else {
        println!("  {label}: {}", parts.join(", "));
    }
}

fn render_dashboard(dashboard: &Dashboard) {
    match dashboard {
        Dashboard::School(view) => {
            println!(
                "\nSchool dashboard ({})",
                view.school_name.as_deref().unwrap_or("unregistered")
            );
            println!(
                "  {} programs | {} LIA periods | {} students",
                view.programs, view.lia_periods, view.students
            );
            println!(
                "  {} placed | {} of {} slots open",
                view.placed_students, view.open_slots, view.total_slots
            );
        }
        Dashboard::Company(view) => {
            println!(
                "\nCompany dashboard ({})",
                view.company_name.as_deref().unwrap_or("unregistered")
            );
            render_counts("postings", &view.postings_by_status);
            render_counts("applications", &view.applications_by_status);
            println!("  {} open positions", view.open_positions);
        }
        Dashboard::Student(view) => {
            println!("\nStudent dashboard");
            render_counts("applications", &view.applications_by_status);
            println!("  {} active postings to browse", view.active_postings);
            println!(
                "  profile {}% complete (CV: {}, school: {}, skills: {})",
                view.profile_completeness,
                yes_no(view.has_cv),
                yes_no(view.has_school),
                yes_no(view.has_skills)
            );
        }
        Dashboard::Admin(view) => {
            println!("\nAdmin dashboard");
            render_counts("users", &view.users_by_role);
            println!(
                "  {} schools | {} companies | {} postings ({} active) | {} applications",
                view.schools,
                view.companies,
                view.postings,
                view.active_postings,
                view.applications
            );
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    if !args.data_file.exists() {
        return Err(AppError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", args.data_file.display()),
        )));
    }
    let platform = Platform::new(
        open_database(Some(&args.data_file))?,
        Arc::new(MemoryObjectStore::new()),
        Arc::new(TracingNotifier),
        AuthConfig::default(),
        &StorageConfig::default(),
    );
    let views = platform.applications().all_views()?;
    let stdout = io::stdout();
    write_applications_csv(&views, stdout.lock())?;
    Ok(())
}

pub(crate) fn run_bootstrap_admin(args: AdminArgs) -> Result<(), AppError> {
    let platform = Platform::new(
        open_database(Some(&args.data_file))?,
        Arc::new(MemoryObjectStore::new()),
        Arc::new(TracingNotifier),
        AuthConfig::default(),
        &StorageConfig::default(),
    );
    let account = platform
        .auth()
        .bootstrap_admin(&args.email, &args.password)?;
    println!("Created administrator {} ({})", account.email, account.id);
    Ok(())
}
