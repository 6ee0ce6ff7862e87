//! Turning final request outcomes into typed results.

use serde::de::DeserializeOwned;

use crate::error::{AuditdashError, Result};
use crate::transport::RequestOutcome;

/// Decode a successful body, or surface the final failure as an error.
pub(crate) fn decode<T: DeserializeOwned>(outcome: RequestOutcome) -> Result<T> {
    match outcome {
        RequestOutcome::Success(response) => serde_json::from_value(response.body)
            .map_err(|e| AuditdashError::InvalidResponse(e.to_string())),
        RequestOutcome::Failure(failure) => Err(AuditdashError::Request {
            status: failure.status,
            body: failure.message(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_decode_success() {
        let value: Vec<u32> = decode(RequestOutcome::success(200, json!([1, 2]))).unwrap();
        assert_eq!(value, vec![1, 2]);
    }

    #[test]
    fn test_decode_wrong_shape() {
        let result: Result<Vec<u32>> = decode(RequestOutcome::success(200, json!({"a": 1})));
        assert!(matches!(result, Err(AuditdashError::InvalidResponse(_))));
    }

    #[test]
    fn test_decode_failure_keeps_status() {
        let result: Result<Value> = decode(RequestOutcome::failure(404, json!("missing")));
        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("missing"));
    }
}
