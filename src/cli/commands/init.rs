//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use crate::core::harvest::summary::{EXIT_CONFIG, EXIT_FATAL, EXIT_SUCCESS};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "harvester.toml")]
    pub output: String,

    /// Include every option with comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing harvester configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your FHIR server and date window", self.output);
                println!("  2. Set SQS_QUEUE_URL and VALKEY_URI, or put them in a .env file");
                println!("  3. Validate configuration: harvester validate-config");
                println!("  4. Try a dry run: harvester harvest --dry-run");
                println!("  5. Run the harvest: harvester harvest");
                println!();
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Harvester Configuration File
# Resumable FHIR encounter harvester

[source]
base_url = "https://hapi.fhir.org/baseR4"

[harvest]
start_date = "2025-01-01"
end_date = "2025-01-31"

[checkpoint]
url = "redis://localhost:6379"

[queue]
queue_url = "http://localhost:4566/000000000000/encounters.fifo"
"#
        .to_string()
    }

    /// Generate configuration with every option documented
    fn generate_config_with_examples() -> String {
        r#"# Harvester Configuration File
# Resumable FHIR encounter harvester
#
# Values may reference environment variables with ${VAR_NAME}.
# Any key can also be overridden with HARVESTER_<SECTION>_<KEY>, e.g.
# HARVESTER_SOURCE_RETRY_MAX_ATTEMPTS or HARVESTER_HARVEST_GROUP_KEYS="001,002"
# (lists are comma-separated). The deployment variables START_DATE, END_DATE,
# VALKEY_URI and SQS_QUEUE_URL are honoured as well. Without a harvester.toml
# in the working directory the defaults plus these variables are used.

[application]
log_level = "info"          # trace | debug | info | warn | error
dry_run = false             # keep checkpoints in memory and log messages only

[source]
base_url = "https://hapi.fhir.org/baseR4"
timeout_seconds = 20        # per request
max_pages = 1               # follow at most this many bundle pages per day
tls_verify = true

[source.retry]
max_attempts = 3            # total attempts per request (1-10)
initial_delay_ms = 2000     # 2s, then 4s
max_delay_ms = 60000
backoff_multiplier = 2.0

[harvest]
start_date = "2025-01-01"   # first day, inclusive
end_date = "2025-01-31"     # last day, inclusive
group_keys = ["001", "002"] # ordering lanes, assigned by position within a day
max_concurrency = 0         # concurrent record tasks per day (0 = unbounded)
strict_references = true    # quarantine encounters missing a practitioner or patient
on_batch_failure = "halt"   # halt | skip

[checkpoint]
url = "redis://localhost:6379"
# password = "${VALKEY_PASSWORD}"
key_prefix = ""

[queue]
queue_url = "http://localhost:4566/000000000000/encounters.fifo"
region = "sa-east-1"
# endpoint_url = "http://localhost:4566"
# access_key_id = "test"
# secret_access_key = "${AWS_SECRET_ACCESS_KEY}"
content_based_deduplication = false

[logging]
local_enabled = true
local_path = "/app/logs"
local_rotation = "daily"    # daily | hourly
max_files = 3
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarvesterConfig;
    use tempfile::TempDir;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "harvester.toml".to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "harvester.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generate_minimal_config() {
        let content = InitArgs::generate_minimal_config();
        let config: HarvesterConfig = toml::from_str(&content).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.harvest.start_date, "2025-01-01");
        assert_eq!(config.harvest.group_keys, vec!["001", "002"]);
    }

    #[test]
    fn test_generate_config_with_examples() {
        let content = InitArgs::generate_config_with_examples();
        let config: HarvesterConfig = toml::from_str(&content).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.source.retry.max_attempts, 3);
        assert_eq!(config.logging.max_files, 3);
        assert!(config.harvest.strict_references);
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("harvester.toml");
        fs::write(&path, "existing").unwrap();

        let args = InitArgs {
            output: path.to_string_lossy().to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.execute().await.unwrap(), EXIT_CONFIG);
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing");

        let args = InitArgs { force: true, ..args };
        assert_eq!(args.execute().await.unwrap(), EXIT_SUCCESS);
        assert!(fs::read_to_string(&path).unwrap().contains("[harvest]"));
    }
}
