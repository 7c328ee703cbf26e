use serde::{Deserialize, Serialize};

use super::account::OnboardingGrant;
use crate::error::AppError;

/// Pasted lines, one `name,email[,phone]` per line.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ImportRequest {
    #[schema(example = "Ann Lee,ann@example.com,555-0100\nBo Chen,bo@example.com")]
    pub text: String,
}

/// Reject an import with nothing pasted.
pub fn validate_import_request(payload: &ImportRequest) -> Result<(), AppError> {
    if payload.text.trim().is_empty() {
        return Err(AppError::Validation("No input: paste at least one line".into()));
    }
    Ok(())
}

#[derive(Default, Serialize, utoipa::ToSchema)]
pub struct ImportSummary {
    pub added: usize,
    /// Number of lines whose email already existed.
    pub duplicates: usize,
    /// Lines that were malformed.
    pub skipped: usize,
    /// Lines that failed to store.
    pub failed: usize,
    pub duplicate_emails: Vec<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TechnicianImportResponse {
    #[serde(flatten)]
    pub summary: ImportSummary,
    /// One onboarding grant per added technician.
    pub onboarding: Vec<OnboardingGrant>,
}
