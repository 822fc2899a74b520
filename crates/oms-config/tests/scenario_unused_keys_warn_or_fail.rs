//! Scenario: unused config keys
//!
//! # Invariant under test
//! - A misspelled key is reported as unused.
//! - `Warn` returns the report; `Fail` returns an error naming the key.
//! - Free-form maps (`collectors`, `product_mappings`) never report.

use oms_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

const YAML_WITH_TYPO: &str = r#"
collection:
  intervl_secs: 60
  lookback_minutes: 30
product_mappings:
  NAVER-PRD-9: "SKU-9"
collectors:
  NAVER:
    kind: mock
"#;

#[test]
fn warn_returns_report_with_typo() {
    let loaded = load_layered_yaml_from_strings(&[YAML_WITH_TYPO]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert!(!report.is_clean());
    assert_eq!(report.unused_leaf_pointers, vec!["/collection/intervl_secs".to_string()]);
}

#[test]
fn fail_errors_on_typo() {
    let loaded = load_layered_yaml_from_strings(&[YAML_WITH_TYPO]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CONFIG_UNUSED_KEYS"));
    assert!(msg.contains("/collection/intervl_secs"));
}

#[test]
fn clean_config_passes_fail_policy() {
    let yaml = r#"
business:
  timezone: "UTC"
processing:
  claim_ttl_secs: 120
  worker_id: "w1"
collectors:
  "11ST":
    kind: mock
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}
