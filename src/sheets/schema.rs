//! Header-schema mapping for the Jobs and Applications sheets.
//!
//! Deployments have drifted through several header spellings (`ID` vs
//! `Job_ID`, `Status` vs `State`, odd casing, stray whitespace). Rather
//! than probing aliases on every field access, the accepted spellings
//! live in one table here and a [`HeaderIndex`] is resolved once per
//! store call from the actual header row.

use std::collections::HashMap;

/// Canonical Jobs header row, written when a sheet is missing its
/// header entirely.
pub const JOBS_HEADERS: [&str; 9] = [
    "ID",
    "Employer",
    "Title",
    "Category",
    "Salary",
    "Description",
    "Status",
    "Created_At",
    "Expires_At",
];

/// Canonical Applications header row.
pub const APPLICATIONS_HEADERS: [&str; 4] =
    ["Job_ID", "Seeker_Username", "CV_File_ID", "Applied_At"];

/// Fields of a Jobs row, independent of how the column is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobField {
    Id,
    Employer,
    Title,
    Category,
    Salary,
    Description,
    Status,
    CreatedAt,
    ExpiresAt,
}

impl JobField {
    /// Accepted header spellings, most canonical first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            JobField::Id => &["ID", "Id", "id", "Job_ID", "Job Id", "JobId"],
            JobField::Employer => &["Employer", "employer", "Employer_ID", "EmployerId"],
            JobField::Title => &["Title", "title"],
            JobField::Category => &["Category", "category"],
            JobField::Salary => &["Salary", "salary"],
            JobField::Description => &["Description", "description"],
            JobField::Status => &["Status", "status", "State"],
            JobField::CreatedAt => &["Created_At", "created_at", "CreatedAt", "createdAt"],
            JobField::ExpiresAt => &["Expires_At", "expires_at", "ExpiresAt", "expiresAt"],
        }
    }

    /// Column position in the canonical layout, used as a last-resort
    /// guess when the header row names the field under no known alias.
    /// Status has no safe positional fallback (older sheets lacked it).
    pub fn positional_fallback(self) -> Option<usize> {
        match self {
            JobField::Id => Some(0),
            JobField::Employer => Some(1),
            JobField::Title => Some(2),
            JobField::Category => Some(3),
            JobField::Salary => Some(4),
            JobField::Description => Some(5),
            JobField::Status => None,
            JobField::CreatedAt => Some(6),
            JobField::ExpiresAt => Some(7),
        }
    }

    const ALL: [JobField; 9] = [
        JobField::Id,
        JobField::Employer,
        JobField::Title,
        JobField::Category,
        JobField::Salary,
        JobField::Description,
        JobField::Status,
        JobField::CreatedAt,
        JobField::ExpiresAt,
    ];
}

/// Case- and whitespace-insensitive header comparison key.
fn norm(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Field-to-column mapping resolved from one concrete header row.
#[derive(Debug)]
pub struct HeaderIndex {
    columns: HashMap<JobField, usize>,
    width: usize,
}

impl HeaderIndex {
    /// Resolves every field against the given header row. Fields whose
    /// alias is absent fall back to their canonical column position.
    pub fn resolve(header_row: &[String]) -> Self {
        let normed: Vec<String> = header_row.iter().map(|h| norm(h)).collect();
        let mut columns = HashMap::new();
        for field in JobField::ALL {
            let by_alias = field
                .aliases()
                .iter()
                .find_map(|alias| normed.iter().position(|h| *h == norm(alias)));
            if let Some(col) = by_alias.or_else(|| field.positional_fallback()) {
                columns.insert(field, col);
            }
        }
        Self {
            columns,
            width: header_row.len(),
        }
    }

    /// Column index for a field, if the sheet has one.
    pub fn col(&self, field: JobField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// Cell for a field within a materialized row.
    pub fn cell<'a>(&self, row: &'a [String], field: JobField) -> Option<&'a str> {
        self.col(field)
            .and_then(|i| row.get(i))
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Number of columns in the header row.
    pub fn width(&self) -> usize {
        self.width
    }
}

/// True when a header row is effectively absent: no row at all, or
/// every cell blank.
pub fn header_is_blank(header_row: Option<&Vec<String>>) -> bool {
    match header_row {
        None => true,
        Some(row) => row.iter().all(|h| h.trim().is_empty()),
    }
}
