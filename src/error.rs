//! Pipeline error taxonomy.
//!
//! Only two error classes originate inside the pipeline: schema violations
//! (hard failures) and scoring unavailability (recovered via the popularity
//! fallback). Everything else is an application-edge concern handled with
//! `anyhow` by the callers.

use std::fmt;

use crate::types::Entry;

/// Errors produced by the feature builder and predictor.
#[derive(Debug)]
pub enum PipelineError {
    /// A required identifying field is missing from the input. The whole
    /// prediction request fails; no partial table is returned.
    Schema(String),
    /// The scoring function is absent or raised. Recoverable: the caller
    /// downgrades to the popularity fallback.
    ScoringUnavailable(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Schema(msg) => write!(f, "Schema error: {}", msg),
            PipelineError::ScoringUnavailable(msg) => {
                write!(f, "Scoring unavailable: {}", msg)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// Validate a race's entry list before feature building.
///
/// The horse name is the only required identifying field; missing history is
/// handled by backfill, never here.
pub fn validate_entries(entries: &[Entry]) -> Result<(), PipelineError> {
    if entries.is_empty() {
        return Err(PipelineError::Schema(
            "at least one race entry is required".to_string(),
        ));
    }

    for (i, entry) in entries.iter().enumerate() {
        if entry.horse_name.trim().is_empty() {
            return Err(PipelineError::Schema(format!(
                "entry {} is missing a horse name",
                i + 1
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> Entry {
        Entry {
            horse_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_entries_ok() {
        assert!(validate_entries(&[entry("キンタロウ"), entry("ホクトタイガー")]).is_ok());
    }

    #[test]
    fn test_validate_empty_list() {
        let err = validate_entries(&[]).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn test_validate_missing_name() {
        let err = validate_entries(&[entry("キンタロウ"), entry("  ")]).unwrap_err();
        assert!(err.to_string().contains("entry 2"));
    }

    #[test]
    fn test_error_display() {
        let err = PipelineError::ScoringUnavailable("no model loaded".to_string());
        assert!(err.to_string().contains("Scoring unavailable"));
    }
}
