use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use erpflow_core::config::{AppConfig, LoadOptions};
use toml::Value;

/// One rendered setting: dotted key, the env var that can override it, and
/// its effective value.
struct Setting {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for setting in settings(&config) {
        let source = field_source(
            setting.key,
            setting.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(setting.key, &setting.value, source));
    }

    lines.join("\n")
}

fn settings(config: &AppConfig) -> Vec<Setting> {
    let audit_entities = config
        .audit
        .entities
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(",");

    vec![
        Setting {
            key: "database.url",
            env_keys: &["ERPFLOW_DATABASE_URL"],
            value: config.database.url.clone(),
        },
        Setting {
            key: "database.max_connections",
            env_keys: &["ERPFLOW_DATABASE_MAX_CONNECTIONS"],
            value: config.database.max_connections.to_string(),
        },
        Setting {
            key: "database.timeout_secs",
            env_keys: &["ERPFLOW_DATABASE_TIMEOUT_SECS"],
            value: config.database.timeout_secs.to_string(),
        },
        Setting {
            key: "server.bind_address",
            env_keys: &["ERPFLOW_SERVER_BIND_ADDRESS"],
            value: config.server.bind_address.clone(),
        },
        Setting {
            key: "server.port",
            env_keys: &["ERPFLOW_SERVER_PORT"],
            value: config.server.port.to_string(),
        },
        Setting {
            key: "server.graceful_shutdown_secs",
            env_keys: &["ERPFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            value: config.server.graceful_shutdown_secs.to_string(),
        },
        Setting {
            key: "logging.level",
            env_keys: &["ERPFLOW_LOGGING_LEVEL", "ERPFLOW_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Setting {
            key: "logging.format",
            env_keys: &["ERPFLOW_LOGGING_FORMAT", "ERPFLOW_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format),
        },
        Setting {
            key: "audit.entities",
            env_keys: &["ERPFLOW_AUDIT_ENTITIES"],
            value: if audit_entities.is_empty() { "<none>".to_string() } else { audit_entities },
        },
        Setting {
            key: "backfill.include_weekends",
            env_keys: &["ERPFLOW_BACKFILL_INCLUDE_WEEKENDS"],
            value: config.backfill.include_weekends.to_string(),
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("erpflow.toml"), PathBuf::from("config/erpflow.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::contains_path;
    use toml::Value;

    #[test]
    fn nested_keys_are_found_in_config_documents() {
        let doc: Value = "[audit]\nentities = [\"payroll\", \"leave\"]\n".parse().expect("toml");
        assert!(contains_path(&doc, "audit.entities"));
        assert!(!contains_path(&doc, "audit.level"));
        assert!(!contains_path(&doc, "server.port"));
    }
}
