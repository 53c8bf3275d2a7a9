//! Global logging initialization.
//!
//! Kept in its own test binary: the subscriber is process-wide, so everything runs in a
//! single test.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use contextfold::config::{LogFormat, LoggingConfig};
use contextfold::mcp::ToolRegistry;
use contextfold::observability::init_logging;
use contextfold::{CoreConfig, ServiceContainer};
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_json_logging_to_file_initializes_once() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("logs").join("contextfold.log");
    let config = LoggingConfig {
        format: LogFormat::Json,
        filter: "contextfold=debug".to_string(),
        file: Some(path.clone()),
    };

    init_logging(&config).unwrap();
    let err = init_logging(&config).unwrap_err();
    assert_eq!(err.code(), "backend_error");

    let services = ServiceContainer::from_config(&CoreConfig::default()).unwrap();
    let registry = ToolRegistry::new(Arc::new(services));
    let result = registry
        .execute(
            "branch_return",
            json!({"branch_id": "br_missing", "message": "done"}),
        )
        .unwrap();
    assert!(result.is_error);

    let logs = std::fs::read_to_string(&path).unwrap();
    let failure = logs
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .find(|event| event["fields"]["message"] == "tool call failed")
        .expect("tool failure was logged");
    assert_eq!(failure["level"], "WARN");
    assert_eq!(failure["fields"]["error_code"], "not_found");
    assert!(
        failure["span"]["request_id"]
            .as_str()
            .unwrap()
            .starts_with("req_")
    );
}
