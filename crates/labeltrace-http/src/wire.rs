//! Response body interpretation

use labeltrace_core::{ScanError, TraceabilityRecord};
use serde::Deserialize;

const NOT_FOUND_MESSAGE: &str = "Product not found";

/// Outcome flags the service wraps around a record
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

/// Map an HTTP status and body to a lookup outcome.
///
/// - 200 with `success` absent or true: the body is the record
/// - 200 with `success: false`, or 404: `NotFound`
/// - anything else, or an undecodable record: `Unavailable`
pub fn interpret_response(status: u16, body: &[u8]) -> Result<TraceabilityRecord, ScanError> {
    let value: Option<serde_json::Value> = serde_json::from_slice(body).ok();
    let envelope = value
        .as_ref()
        .and_then(|v| Envelope::deserialize(v).ok())
        .unwrap_or_default();

    match status {
        200 => {
            if envelope.success == Some(false) {
                return Err(ScanError::NotFound(
                    envelope.error.unwrap_or_else(|| NOT_FOUND_MESSAGE.to_string()),
                ));
            }
            let value = value.ok_or_else(|| {
                ScanError::Unavailable("response body is not JSON".to_string())
            })?;
            serde_json::from_value(value).map_err(|e| {
                tracing::warn!(error = %e, "malformed traceability record");
                ScanError::Unavailable(format!("malformed traceability record: {e}"))
            })
        }
        404 => Err(ScanError::NotFound(
            envelope.error.unwrap_or_else(|| NOT_FOUND_MESSAGE.to_string()),
        )),
        other => Err(ScanError::Unavailable(match envelope.error {
            Some(message) => format!("HTTP {other}: {message}"),
            None => format!("HTTP {other}"),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labeltrace_core::{ComplianceStatus, ErrorKind};
    use pretty_assertions::assert_eq;

    const RECORD: &str = r#"{
        "success": true,
        "product": {
            "id": "p-1",
            "name": "Wheat Flour",
            "category": "Grains",
            "manufacturer": "Acme Mills",
            "batch_number": "BATCH77",
            "workflow_status": "completed"
        },
        "quality_checks": [
            {"parameter": "Moisture Content", "expected": "12.5", "actual_value": "12.1", "unit": "%", "status": "passed"},
            {"parameter": "Protein", "expected": "11", "actual_value": "9.8", "unit": "%", "status": "failed"}
        ],
        "labels": [
            {"label_type": "qr_code", "label_data": "https://trace.example/t/BATCH77", "is_verified": true}
        ],
        "workflow_logs": [
            {"action": "quality_check", "status": "success", "created_at": "2024-03-01T10:00:00"}
        ],
        "traceability_score": 85.0,
        "compliance_status": "compliant"
    }"#;

    #[test]
    fn success_body_decodes_record() {
        let record = interpret_response(200, RECORD.as_bytes()).unwrap();
        assert_eq!(record.product.name, "Wheat Flour");
        assert_eq!(record.product.batch_number.as_deref(), Some("BATCH77"));
        assert_eq!(record.compliance_status, ComplianceStatus::Compliant);
        assert_eq!(record.quality_checks[0].parameter_name, "Moisture Content");
        assert_eq!(record.failed_checks().count(), 1);
        assert_eq!(record.verified_label_count(), 1);
        assert_eq!(record.traceability_score, 85.0);
    }

    #[test]
    fn unsuccessful_200_is_not_found() {
        let err = interpret_response(200, br#"{"success": false, "error": "Product not found"}"#)
            .unwrap_err();
        assert_eq!(err, ScanError::NotFound("Product not found".into()));
    }

    #[test]
    fn status_404_is_not_found() {
        let err = interpret_response(404, b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = interpret_response(404, br#"{"error": "no such batch"}"#).unwrap_err();
        assert_eq!(err, ScanError::NotFound("no such batch".into()));
    }

    #[test]
    fn server_error_is_unavailable() {
        let err = interpret_response(500, br#"{"success": false, "error": "db down"}"#).unwrap_err();
        assert_eq!(err, ScanError::Unavailable("HTTP 500: db down".into()));

        let err = interpret_response(503, b"<html>busy</html>").unwrap_err();
        assert_eq!(err, ScanError::Unavailable("HTTP 503".into()));
    }

    #[test]
    fn garbage_200_is_unavailable() {
        let err = interpret_response(200, b"not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);

        let err = interpret_response(200, br#"{"success": true}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn unknown_compliance_value_is_tolerated() {
        let body = RECORD.replace("\"compliant\"", "\"under_review\"");
        let record = interpret_response(200, body.as_bytes()).unwrap();
        assert_eq!(record.compliance_status, ComplianceStatus::Unknown);
    }
}
