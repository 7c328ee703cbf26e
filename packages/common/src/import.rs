//! Bulk import of pasted `name,email[,phone]` lines.
//!
//! Used for customers and technicians alike. The caller checks each line
//! against an [`ImportBatch`], inserts candidates one by one and marks the
//! ones that were stored.

use std::collections::HashSet;

/// One accepted line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportEntry {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// How one pasted line is handled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportLine {
    /// Blank, fewer than two fields, or no name or email.
    Skipped,
    /// The email is already stored; carries the email as typed.
    Duplicate(String),
    /// Ready to insert.
    Candidate(ImportEntry),
}

/// Parse a single line. Returns `None` for lines that must be skipped.
pub fn parse_line(line: &str) -> Option<ImportEntry> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 2 {
        return None;
    }
    let (name, email) = (parts[0], parts[1]);
    if name.is_empty() || email.is_empty() {
        return None;
    }
    let phone = parts
        .get(2)
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string());

    Some(ImportEntry {
        name: name.to_string(),
        email: email.to_string(),
        phone,
    })
}

/// Duplicate tracking for one import run.
///
/// Emails compare case-insensitively. An email counts as present once it is
/// on file or once an earlier line with it was stored; a line whose insert
/// failed does not block a later line with the same email.
#[derive(Clone, Debug, Default)]
pub struct ImportBatch {
    seen: HashSet<String>,
}

impl ImportBatch {
    pub fn new<'a, I>(existing_emails: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            seen: existing_emails
                .into_iter()
                .map(|e| e.trim().to_lowercase())
                .collect(),
        }
    }

    /// The lines of `text`, in order, ignoring leading and trailing blank lines.
    pub fn lines(text: &str) -> std::str::Lines<'_> {
        text.trim().lines()
    }

    pub fn check(&self, line: &str) -> ImportLine {
        match parse_line(line) {
            None => ImportLine::Skipped,
            Some(entry) if self.seen.contains(&entry.email.to_lowercase()) => {
                ImportLine::Duplicate(entry.email)
            }
            Some(entry) => ImportLine::Candidate(entry),
        }
    }

    /// Record a stored email.
    pub fn mark_added(&mut self, email: &str) {
        self.seen.insert(email.trim().to_lowercase());
    }
}
