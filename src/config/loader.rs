//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{BatchFailurePolicy, HarvesterConfig};
use super::secret::secret_string;
use crate::domain::errors::HarvestError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Configuration path used when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "harvester.toml";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into HarvesterConfig
/// 4. Applies environment variable overrides (HARVESTER_* prefix and the
///    deployment variables START_DATE, END_DATE, VALKEY_URI, SQS_QUEUE_URL)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use harvester::config::loader::load_config;
///
/// let config = load_config("harvester.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<HarvesterConfig> {
    load_config_with(path, |_| {})
}

/// Loads configuration, applying caller overrides before validation
///
/// Command-line flags are applied through `overrides` so that values such as
/// the harvest window may come from the command line alone.
///
/// # Errors
///
/// Same as [`load_config`].
pub fn load_config_with<F>(path: impl AsRef<Path>, overrides: F) -> Result<HarvesterConfig>
where
    F: FnOnce(&mut HarvesterConfig),
{
    let mut config = load_config_unchecked(path)?;

    overrides(&mut config);

    config.validate().map_err(|e| {
        HarvestError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Loads configuration and environment overrides without validating
///
/// For commands that only need part of the configuration. A missing file at
/// [`DEFAULT_CONFIG_PATH`] is not an error: the built-in defaults are used and
/// the environment supplies the rest.
///
/// # Errors
///
/// Returns an error if an explicitly named file is missing, the file cannot be
/// read or parsed, or an override has an unparsable value.
pub fn load_config_unchecked(path: impl AsRef<Path>) -> Result<HarvesterConfig> {
    let path = path.as_ref();
    let mut config = if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
        tracing::debug!(
            path = %path.display(),
            "No configuration file, using defaults and environment"
        );
        HarvesterConfig::default()
    } else {
        parse_config(path)?
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Reads, substitutes and parses a configuration file without overrides or validation
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable or not valid TOML
pub fn parse_config(path: impl AsRef<Path>) -> Result<HarvesterConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(HarvestError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        HarvestError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    toml::from_str(&contents)
        .map_err(|e| HarvestError::Configuration(format!("Failed to parse TOML: {e}")))
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| HarvestError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(HarvestError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    value.parse().map_err(|_| {
        HarvestError::Configuration(format!("{name} must be true or false, got '{value}'"))
    })
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| HarvestError::Configuration(format!("{name} must be a number, got '{value}'")))
}

/// Applies environment variable overrides
///
/// Variables follow the pattern HARVESTER_<SECTION>_<KEY>, for example
/// HARVESTER_SOURCE_BASE_URL. The deployment variables START_DATE, END_DATE,
/// VALKEY_URI and SQS_QUEUE_URL are honoured as well; a HARVESTER_* value
/// wins when both are set.
fn apply_env_overrides(config: &mut HarvesterConfig) -> Result<()> {
    // Deployment variables first so the prefixed ones take precedence
    if let Ok(val) = std::env::var("START_DATE") {
        config.harvest.start_date = val;
    }
    if let Ok(val) = std::env::var("END_DATE") {
        config.harvest.end_date = val;
    }
    if let Ok(val) = std::env::var("VALKEY_URI") {
        config.checkpoint.url = val;
    }
    if let Ok(val) = std::env::var("SQS_QUEUE_URL") {
        config.queue.queue_url = val;
    }

    // Application overrides
    if let Ok(val) = std::env::var("HARVESTER_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("HARVESTER_APPLICATION_DRY_RUN") {
        config.application.dry_run = parse_bool("HARVESTER_APPLICATION_DRY_RUN", &val)?;
    }

    // Source overrides
    if let Ok(val) = std::env::var("HARVESTER_SOURCE_BASE_URL") {
        config.source.base_url = val;
    }
    if let Ok(val) = std::env::var("HARVESTER_SOURCE_TIMEOUT_SECONDS") {
        config.source.timeout_seconds = parse_number("HARVESTER_SOURCE_TIMEOUT_SECONDS", &val)?;
    }
    if let Ok(val) = std::env::var("HARVESTER_SOURCE_MAX_PAGES") {
        config.source.max_pages = parse_number("HARVESTER_SOURCE_MAX_PAGES", &val)?;
    }
    if let Ok(val) = std::env::var("HARVESTER_SOURCE_TLS_VERIFY") {
        config.source.tls_verify = parse_bool("HARVESTER_SOURCE_TLS_VERIFY", &val)?;
    }
    if let Ok(val) = std::env::var("HARVESTER_SOURCE_RETRY_MAX_ATTEMPTS") {
        config.source.retry.max_attempts =
            parse_number("HARVESTER_SOURCE_RETRY_MAX_ATTEMPTS", &val)?;
    }
    if let Ok(val) = std::env::var("HARVESTER_SOURCE_RETRY_INITIAL_DELAY_MS") {
        config.source.retry.initial_delay_ms =
            parse_number("HARVESTER_SOURCE_RETRY_INITIAL_DELAY_MS", &val)?;
    }
    if let Ok(val) = std::env::var("HARVESTER_SOURCE_RETRY_MAX_DELAY_MS") {
        config.source.retry.max_delay_ms =
            parse_number("HARVESTER_SOURCE_RETRY_MAX_DELAY_MS", &val)?;
    }
    if let Ok(val) = std::env::var("HARVESTER_SOURCE_RETRY_BACKOFF_MULTIPLIER") {
        config.source.retry.backoff_multiplier =
            parse_number("HARVESTER_SOURCE_RETRY_BACKOFF_MULTIPLIER", &val)?;
    }

    // Harvest overrides
    if let Ok(val) = std::env::var("HARVESTER_HARVEST_START_DATE") {
        config.harvest.start_date = val;
    }
    if let Ok(val) = std::env::var("HARVESTER_HARVEST_END_DATE") {
        config.harvest.end_date = val;
    }
    if let Ok(val) = std::env::var("HARVESTER_HARVEST_GROUP_KEYS") {
        // Comma-separated, e.g. "001,002"
        config.harvest.group_keys = val
            .split(',')
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();
    }
    if let Ok(val) = std::env::var("HARVESTER_HARVEST_MAX_CONCURRENCY") {
        config.harvest.max_concurrency =
            parse_number("HARVESTER_HARVEST_MAX_CONCURRENCY", &val)?;
    }
    if let Ok(val) = std::env::var("HARVESTER_HARVEST_STRICT_REFERENCES") {
        config.harvest.strict_references =
            parse_bool("HARVESTER_HARVEST_STRICT_REFERENCES", &val)?;
    }
    if let Ok(val) = std::env::var("HARVESTER_HARVEST_ON_BATCH_FAILURE") {
        config.harvest.on_batch_failure = match val.to_lowercase().as_str() {
            "halt" => BatchFailurePolicy::Halt,
            "skip" => BatchFailurePolicy::Skip,
            other => {
                return Err(HarvestError::Configuration(format!(
                    "HARVESTER_HARVEST_ON_BATCH_FAILURE must be halt or skip, got '{other}'"
                )))
            }
        };
    }

    // Checkpoint overrides
    if let Ok(val) = std::env::var("HARVESTER_CHECKPOINT_URL") {
        config.checkpoint.url = val;
    }
    if let Ok(val) = std::env::var("HARVESTER_CHECKPOINT_PASSWORD") {
        config.checkpoint.password = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("HARVESTER_CHECKPOINT_KEY_PREFIX") {
        config.checkpoint.key_prefix = val;
    }

    // Queue overrides
    if let Ok(val) = std::env::var("HARVESTER_QUEUE_QUEUE_URL") {
        config.queue.queue_url = val;
    }
    if let Ok(val) = std::env::var("HARVESTER_QUEUE_REGION") {
        config.queue.region = val;
    }
    if let Ok(val) = std::env::var("HARVESTER_QUEUE_ENDPOINT_URL") {
        config.queue.endpoint_url = Some(val);
    }
    if let Ok(val) = std::env::var("HARVESTER_QUEUE_ACCESS_KEY_ID") {
        config.queue.access_key_id = Some(val);
    }
    if let Ok(val) = std::env::var("HARVESTER_QUEUE_SECRET_ACCESS_KEY") {
        config.queue.secret_access_key = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("HARVESTER_QUEUE_CONTENT_BASED_DEDUPLICATION") {
        config.queue.content_based_deduplication =
            parse_bool("HARVESTER_QUEUE_CONTENT_BASED_DEDUPLICATION", &val)?;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("HARVESTER_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_bool("HARVESTER_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("HARVESTER_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("HARVESTER_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }
    if let Ok(val) = std::env::var("HARVESTER_LOGGING_MAX_FILES") {
        config.logging.max_files = parse_number("HARVESTER_LOGGING_MAX_FILES", &val)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("HARVESTER_LOADER_TEST_VAR", "test_value");
        let input = "password = \"${HARVESTER_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"");
        std::env::remove_var("HARVESTER_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("HARVESTER_LOADER_MISSING_VAR");
        let input = "password = \"${HARVESTER_LOADER_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("HARVESTER_LOADER_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        std::env::remove_var("HARVESTER_LOADER_COMMENTED_VAR");
        let input = "# password = \"${HARVESTER_LOADER_COMMENTED_VAR}\"\nregion = \"sa-east-1\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, input);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-harvester.toml");
        assert!(matches!(result, Err(HarvestError::Configuration(_))));
    }

    #[test]
    fn test_parse_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[source]
base_url = "http://localhost:8080/fhir"

[source.retry]
max_attempts = 5

[harvest]
start_date = "2025-01-01"
end_date = "2025-01-31"
on_batch_failure = "skip"

[checkpoint]
url = "redis://valkey:6379"
key_prefix = "harvester:"

[queue]
queue_url = "http://localstack:4566/000000000000/encounters.fifo"
endpoint_url = "http://localstack:4566"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = parse_config(temp_file.path()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.source.base_url, "http://localhost:8080/fhir");
        assert_eq!(config.source.retry.max_attempts, 5);
        assert_eq!(config.source.timeout_seconds, 20);
        assert_eq!(config.harvest.on_batch_failure, BatchFailurePolicy::Skip);
        assert_eq!(config.checkpoint.key_prefix, "harvester:");
        assert_eq!(config.queue.region, "sa-east-1");
    }

    #[test]
    fn test_parse_config_rejects_unquoted_date() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[harvest]\nstart_date = 2025-01-01\n")
            .unwrap();
        temp_file.flush().unwrap();

        assert!(parse_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_parse_bool_and_number() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", "yes").is_err());
        assert_eq!(parse_number::<usize>("X", "8").unwrap(), 8);
        assert!(parse_number::<usize>("X", "eight").is_err());
    }
}
