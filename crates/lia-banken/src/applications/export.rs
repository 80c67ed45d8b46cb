use std::io::{self, Write};

use serde::Serialize;

use super::views::ApplicationView;

#[derive(Debug, Serialize)]
struct ApplicationRow<'a> {
    application_id: String,
    status: &'static str,
    submitted_at: String,
    updated_at: String,
    posting_title: &'a str,
    category: &'a str,
    company: &'a str,
    student: &'a str,
    student_city: &'a str,
    has_cv: bool,
}

impl<'a> From<&'a ApplicationView> for ApplicationRow<'a> {
    fn from(view: &'a ApplicationView) -> Self {
        let application = &view.application;
        Self {
            application_id: application.id.to_string(),
            status: application.status.label(),
            submitted_at: application.created_at.to_rfc3339(),
            updated_at: application.updated_at.to_rfc3339(),
            posting_title: view.posting.as_ref().map_or("", |p| p.title.as_str()),
            category: view.posting.as_ref().map_or("", |p| p.category.as_str()),
            company: view.company.as_ref().map_or("", |c| c.name.as_str()),
            student: view.student.as_ref().map_or("", |s| s.full_name.as_str()),
            student_city: view
                .student
                .as_ref()
                .and_then(|s| s.city.as_deref())
                .unwrap_or(""),
            has_cv: application.cv_path.is_some(),
        }
    }
}

/// Write joined applications as CSV with a header row.
pub fn write_applications_csv<W: Write>(
    views: &[ApplicationView],
    writer: W,
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);
    for view in views {
        csv_writer.serialize(ApplicationRow::from(view))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn applications_csv(views: &[ApplicationView]) -> Result<String, csv::Error> {
    let mut buffer = Vec::new();
    write_applications_csv(views, &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err).into())
}
