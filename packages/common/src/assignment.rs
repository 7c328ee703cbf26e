//! Technician assignment: display-name resolution and Student visibility.
//!
//! Repairs carry a technician id captured at assignment time plus the
//! free-text `assigned_to_name`. Older tickets only have the name, which may
//! hold either a technician's name or email in any casing, so both are
//! matched loosely here.

/// Assignee placeholder for tickets nobody has picked up yet.
pub const UNASSIGNED_SENTINEL: &str = "To Be Determined";

/// Shown when a ticket has no assignee at all.
pub const UNASSIGNED_LABEL: &str = "Unassigned";

/// The parts of a technician record needed for matching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TechnicianRef {
    pub id: i32,
    pub name: String,
    pub email: String,
}

/// Returns true when `identifier` is the unassigned sentinel.
pub fn is_sentinel(identifier: &str) -> bool {
    identifier.trim().eq_ignore_ascii_case(UNASSIGNED_SENTINEL)
}

/// Find the technician `identifier` refers to, by email first, then by name.
pub fn find_technician<'a>(
    identifier: &str,
    technicians: &'a [TechnicianRef],
) -> Option<&'a TechnicianRef> {
    let needle = identifier.trim();
    if needle.is_empty() {
        return None;
    }
    technicians
        .iter()
        .find(|t| t.email.eq_ignore_ascii_case(needle))
        .or_else(|| technicians.iter().find(|t| t.name.eq_ignore_ascii_case(needle)))
}

/// Display name for an assignee.
///
/// A matching technician yields their name; an unmatched value is returned
/// as-is; an empty value yields [`UNASSIGNED_LABEL`].
pub fn resolve_technician_name(identifier: &str, technicians: &[TechnicianRef]) -> String {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return UNASSIGNED_LABEL.to_string();
    }
    match find_technician(trimmed, technicians) {
        Some(t) => t.name.clone(),
        None => trimmed.to_string(),
    }
}

/// The identity of a signed-in Student, for filtering repairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StudentIdentity {
    pub technician_id: Option<i32>,
    pub email: String,
    pub name: Option<String>,
}

impl StudentIdentity {
    /// Whether a repair with these assignment fields is visible to this Student.
    ///
    /// A repair assigned by id is matched on the id alone, since names are not
    /// unique. Only legacy rows without an id fall back to name or email.
    pub fn can_see(&self, assigned_technician_id: Option<i32>, assigned_to_name: &str) -> bool {
        if let Some(theirs) = assigned_technician_id {
            return self.technician_id == Some(theirs);
        }
        let assignee = assigned_to_name.trim();
        if assignee.is_empty() {
            return false;
        }
        if assignee.eq_ignore_ascii_case(self.email.trim()) {
            return true;
        }
        self.name
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty() && assignee.eq_ignore_ascii_case(n.trim()))
    }
}
