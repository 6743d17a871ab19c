use crate::config::AppConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "notes-to-orders")]
#[command(about = "Extract equipment orders from physician notes and post them to the order service")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "notes-config.toml")]
    pub config: PathBuf,

    /// Override the notes directory from the config file
    #[arg(long)]
    pub input_dir: Option<String>,

    /// Do not post orders (dry run)
    #[arg(long)]
    pub bypass: bool,

    /// Exit with a non-zero code when any note fails
    #[arg(long)]
    pub fail_on_errors: bool,

    /// Write the run report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

impl CliArgs {
    /// Applies command-line overrides on top of the file configuration.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.input_dir {
            config.file_reader.directory_path = dir.clone();
        }
        if self.bypass {
            config.order_client.bypass = true;
        }
        if self.fail_on_errors {
            config.run.fail_on_note_errors = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[llm]
host = "https://api.openai.com/v1"
api_key = "sk-test"
model_name = "gpt-4o-mini"

[order_client]
host = "http://localhost:8080"
client_timeout = 30

[file_reader]
directory_path = "./notes"
"#;

    #[test]
    fn test_overrides_win_over_file() {
        let args = CliArgs::parse_from([
            "notes-to-orders",
            "--input-dir",
            "/tmp/other-notes",
            "--bypass",
            "--fail-on-errors",
        ]);
        let mut config = AppConfig::from_toml_str(CONFIG).unwrap();
        args.apply_overrides(&mut config);

        assert_eq!(config.file_reader.directory_path, "/tmp/other-notes");
        assert!(config.order_client.bypass);
        assert!(config.run.fail_on_note_errors);
    }

    #[test]
    fn test_defaults_leave_config_untouched() {
        let args = CliArgs::parse_from(["notes-to-orders"]);
        let mut config = AppConfig::from_toml_str(CONFIG).unwrap();
        args.apply_overrides(&mut config);

        assert_eq!(args.config, PathBuf::from("notes-config.toml"));
        assert_eq!(config.file_reader.directory_path, "./notes");
        assert!(!config.order_client.bypass);
    }
}
