use std::env;
use std::sync::{Mutex, OnceLock};

use chrono::NaiveDate;
use erpflow_cli::commands::{backfill, config, doctor, migrate, tax};
use rust_decimal::Decimal;
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("ERPFLOW_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("ERPFLOW_DATABASE_URL", "postgres://localhost/erp")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn tax_reports_breakdown_without_database() {
    let result = tax::run(Decimal::new(20_000, 0));
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "tax");
    assert_eq!(payload["data"]["gross_pay"], "20000");
    assert!(payload["data"]["deductions"].as_array().is_some_and(|lines| !lines.is_empty()));
    assert!(payload["data"]["trace"].as_array().is_some_and(|steps| steps.len() >= 3));
}

#[test]
fn tax_rejects_negative_gross() {
    let result = tax::run(Decimal::new(-5, 0));
    assert_eq!(result.exit_code, 2);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "validation");
}

#[test]
fn backfill_reports_counts_for_empty_database() {
    with_env(&[("ERPFLOW_DATABASE_URL", "sqlite::memory:")], || {
        let result = backfill::run(backfill::BackfillArgs {
            from: date(2026, 3, 2),
            to: date(2026, 3, 6),
            include_weekends: None,
            dry_run: true,
        });
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "backfill-absences");
        assert_eq!(payload["data"]["examined"], 0);
        assert_eq!(payload["data"]["inserted_absent"], 0);
    });
}

#[test]
fn backfill_rejects_inverted_range() {
    with_env(&[("ERPFLOW_DATABASE_URL", "sqlite::memory:")], || {
        let result = backfill::run(backfill::BackfillArgs {
            from: date(2026, 3, 6),
            to: date(2026, 3, 2),
            include_weekends: Some(true),
            dry_run: false,
        });
        assert_eq!(result.exit_code, 6);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "validation");
    });
}

#[test]
fn config_attributes_env_overrides() {
    with_env(
        &[("ERPFLOW_SERVER_PORT", "9090"), ("ERPFLOW_AUDIT_ENTITIES", "payroll,leave")],
        || {
            let output = config::run();
            assert!(output.contains("- server.port = 9090 (source: env (ERPFLOW_SERVER_PORT))"));
            assert!(output.contains("- audit.entities = payroll,leave"));
            assert!(output.contains("- database.url = sqlite://erpflow.db (source: default)"));
        },
    );
}

#[test]
fn doctor_flags_unmigrated_database() {
    with_env(&[("ERPFLOW_DATABASE_URL", "sqlite::memory:")], || {
        let report: Value = serde_json::from_str(&doctor::run(true)).expect("doctor json");
        assert_eq!(report["overall_status"], "fail");

        let checks = report["checks"].as_array().expect("checks");
        let status_of = |name: &str| {
            checks
                .iter()
                .find(|check| check["name"] == name)
                .map(|check| check["status"].clone())
                .expect("check present")
        };
        assert_eq!(status_of("config_validation"), "pass");
        assert_eq!(status_of("database_connectivity"), "pass");
        assert_eq!(status_of("migrations_current"), "fail");
    });
}

#[test]
fn doctor_skips_database_checks_when_config_is_invalid() {
    with_env(&[("ERPFLOW_LOG_FORMAT", "xml")], || {
        let output = doctor::run(false);
        assert!(output.starts_with("doctor: one or more readiness checks failed"));
        assert!(output.contains("- [fail] config_validation"));
        assert!(output.contains("- [skip] database_connectivity"));
    });
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "ERPFLOW_DATABASE_URL",
        "ERPFLOW_DATABASE_MAX_CONNECTIONS",
        "ERPFLOW_DATABASE_TIMEOUT_SECS",
        "ERPFLOW_SERVER_BIND_ADDRESS",
        "ERPFLOW_SERVER_PORT",
        "ERPFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "ERPFLOW_LOGGING_LEVEL",
        "ERPFLOW_LOGGING_FORMAT",
        "ERPFLOW_LOG_LEVEL",
        "ERPFLOW_LOG_FORMAT",
        "ERPFLOW_AUDIT_ENTITIES",
        "ERPFLOW_BACKFILL_INCLUDE_WEEKENDS",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
