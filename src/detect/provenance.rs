//! Provenance validation at the findings write boundary.
//!
//! The writer refuses to emit any finding missing its provenance contract:
//! every finding carries a sourceType; code findings carry a
//! `file:line:col` sourceRef; runtime findings carry none. Violations are
//! invariant failures (exit 50) and are never recovered.

use crate::error::DetectError;
use crate::types::{Finding, SourceType, is_valid_source_ref};

/// Validate every finding prior to write.
pub fn validate(findings: &[Finding]) -> Result<(), DetectError> {
    for finding in findings {
        match finding.source_type {
            SourceType::Code => {
                let valid = finding
                    .source_ref
                    .as_deref()
                    .is_some_and(is_valid_source_ref);
                if !valid {
                    return Err(DetectError::MalformedSourceRef {
                        id: finding.id.clone(),
                        source_ref: finding.source_ref.clone(),
                    });
                }
            }
            SourceType::Runtime => {
                if finding.source_ref.is_some() {
                    return Err(DetectError::MalformedSourceRef {
                        id: finding.id.clone(),
                        source_ref: finding.source_ref.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Confidence, ConfidenceBucket, FindingStatus, FindingType, PromiseKind, PromiseSpec,
        Severity,
    };

    fn finding(source_type: SourceType, source_ref: Option<&str>) -> Finding {
        Finding {
            id: "f1".to_string(),
            kind: FindingType::Observed,
            status: FindingStatus::Observed,
            severity: Severity::Low,
            confidence: Confidence {
                score: 1.0,
                bucket: ConfidenceBucket::High,
            },
            silence_kind: None,
            evidence: Vec::new(),
            risk_summary: String::new(),
            expectation_id: "e1".to_string(),
            promise: PromiseSpec {
                kind: PromiseKind::Navigate,
                value: "/about".to_string(),
            },
            source_type,
            source_ref: source_ref.map(String::from),
        }
    }

    #[test]
    fn valid_code_finding_passes() {
        validate(&[finding(SourceType::Code, Some("src/App.jsx:10:4"))]).unwrap();
    }

    #[test]
    fn valid_runtime_finding_passes() {
        validate(&[finding(SourceType::Runtime, None)]).unwrap();
    }

    #[test]
    fn code_finding_without_source_ref_fails() {
        let err = validate(&[finding(SourceType::Code, None)]).unwrap_err();
        assert!(matches!(err, DetectError::MalformedSourceRef { .. }));
    }

    #[test]
    fn code_finding_with_malformed_ref_fails() {
        let err = validate(&[finding(SourceType::Code, Some("src/App.jsx"))]).unwrap_err();
        assert!(matches!(err, DetectError::MalformedSourceRef { .. }));
    }

    #[test]
    fn runtime_finding_with_source_ref_fails() {
        let err = validate(&[finding(SourceType::Runtime, Some("a.html:1:1"))]).unwrap_err();
        assert!(matches!(err, DetectError::MalformedSourceRef { .. }));
    }
}
