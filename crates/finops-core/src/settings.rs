use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{FinopsError, Result};

/// Substrings that mark a service or resource as possibly idle.
pub const DEFAULT_WASTE_KEYWORDS: &[&str] = &[
    "snapshot", "volume", "storage", "ip", "unused", "idle", "stopped",
];

// ── ReportConfig ───────────────────────────────────────────────────────────────

/// Tunables for chunk generation, persisted to `~/.finops-chunker/config.json`.
///
/// Missing keys in the file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Services listed individually in the breakdown.
    pub top_services: usize,
    /// Regions listed in the region summary.
    pub top_regions: usize,
    /// Resources listed in the most-expensive section.
    pub top_resources: usize,
    /// Waste candidates listed when a resource id column exists.
    pub top_waste_resources: usize,
    /// Waste candidates listed when only services are known.
    pub top_waste_services: usize,
    /// Items listed in the lowest-cost fallback.
    pub lowest_cost_items: usize,
    /// Month-over-month change (percent, absolute) that raises an alert.
    pub alert_threshold_pct: f64,
    /// Rows strictly between zero and this cost count as low-cost debris.
    pub low_cost_threshold: f64,
    /// Lower-case substrings matched against service and resource id.
    pub waste_keywords: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_services: 10,
            top_regions: 5,
            top_resources: 10,
            top_waste_resources: 10,
            top_waste_services: 5,
            lowest_cost_items: 5,
            alert_threshold_pct: 10.0,
            low_cost_threshold: 5.0,
            waste_keywords: DEFAULT_WASTE_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

impl ReportConfig {
    /// Return the default path to the config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".finops-chunker").join("config.json")
    }

    /// Load the config from an explicit path.
    ///
    /// Returns `Default` when the file is absent, unparseable or invalid.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        let parsed = serde_json::from_str::<ReportConfig>(&content)
            .map_err(FinopsError::from)
            .and_then(|config| config.validate().map(|_| config));
        match parsed {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Atomically write the config to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Reject values that would make a report section meaningless.
    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("top_services", self.top_services),
            ("top_regions", self.top_regions),
            ("top_resources", self.top_resources),
            ("top_waste_resources", self.top_waste_resources),
            ("top_waste_services", self.top_waste_services),
            ("lowest_cost_items", self.lowest_cost_items),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(FinopsError::Config(format!("{} must be at least 1", name)));
        }
        if !(self.alert_threshold_pct.is_finite() && self.alert_threshold_pct >= 0.0) {
            return Err(FinopsError::Config(
                "alert_threshold_pct must be a non-negative number".to_string(),
            ));
        }
        if !(self.low_cost_threshold.is_finite() && self.low_cost_threshold >= 0.0) {
            return Err(FinopsError::Config(
                "low_cost_threshold must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Turn cloud billing exports into text chunks for cost-analysis Q&A
#[derive(Parser, Debug, Clone)]
#[command(
    name = "finops-chunker",
    about = "Turn cloud billing exports into text chunks for cost-analysis Q&A",
    version
)]
pub struct Settings {
    /// Billing exports or documents to ingest; directories are searched recursively
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// External program used to convert non-tabular documents to markdown
    #[arg(long, default_value = "markitdown")]
    pub converter: String,

    /// Extra argument passed to the converter before the file path (repeatable)
    #[arg(long = "converter-arg", allow_hyphen_values = true)]
    pub converter_args: Vec<String>,

    /// Month-over-month change (percent) that raises a spend alert
    #[arg(long)]
    pub alert_threshold: Option<f64>,

    /// Rows cheaper than this are flagged as low-cost debris
    #[arg(long)]
    pub low_cost_threshold: Option<f64>,

    /// Number of services listed individually
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub top_services: Option<u32>,

    /// Config file path (defaults to ~/.finops-chunker/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Persist the effective report configuration
    #[arg(long)]
    pub save_config: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse CLI arguments and resolve the effective [`ReportConfig`].
    pub fn load() -> (Self, ReportConfig) {
        Self::load_impl(std::env::args_os().collect(), &ReportConfig::config_path())
    }

    /// Full implementation – accepts args and the default config path so that
    /// tests can redirect to a temporary directory.
    ///
    /// CLI values always win over the config file. With `--save-config` the
    /// merged result is written back.
    pub fn load_impl(
        args: Vec<std::ffi::OsString>,
        default_config_path: &Path,
    ) -> (Self, ReportConfig) {
        let mut settings = Settings::parse_from(args);

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        let config_path = settings
            .config
            .clone()
            .unwrap_or_else(|| default_config_path.to_path_buf());
        let mut config = ReportConfig::load_from(&config_path);
        settings.apply_overrides(&mut config);

        if settings.save_config {
            if let Err(e) = config.save_to(&config_path) {
                warn!("could not save config to {}: {}", config_path.display(), e);
            }
        }

        (settings, config)
    }

    /// Copy explicitly supplied CLI values into `config`.
    ///
    /// Invalid overrides are logged and ignored.
    pub fn apply_overrides(&self, config: &mut ReportConfig) {
        let mut candidate = config.clone();
        if let Some(v) = self.alert_threshold {
            candidate.alert_threshold_pct = v;
        }
        if let Some(v) = self.low_cost_threshold {
            candidate.low_cost_threshold = v;
        }
        if let Some(v) = self.top_services {
            candidate.top_services = v as usize;
        }
        match candidate.validate() {
            Ok(()) => *config = candidate,
            Err(e) => warn!("ignoring command-line overrides: {}", e),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Vec<OsString> {
        std::iter::once("finops-chunker")
            .chain(list.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_config_values() {
        let config = ReportConfig::default();
        assert_eq!(config.top_services, 10);
        assert_eq!(config.top_regions, 5);
        assert_eq!(config.alert_threshold_pct, 10.0);
        assert_eq!(config.low_cost_threshold, 5.0);
        assert!(config.waste_keywords.iter().any(|k| k == "ip"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load_round_trip() {
        let tmp = TempDir::new().expect("tempdir");
        let path = ReportConfig::config_path_in(tmp.path());
        let config = ReportConfig {
            top_services: 3,
            alert_threshold_pct: 25.0,
            ..ReportConfig::default()
        };

        config.save_to(&path).expect("save");
        assert_eq!(ReportConfig::load_from(&path), config);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_config_load_missing_file_returns_default() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("absent.json");
        assert_eq!(ReportConfig::load_from(&path), ReportConfig::default());
    }

    #[test]
    fn test_config_partial_file_uses_defaults_for_missing_keys() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"top_regions": 2}"#).unwrap();

        let config = ReportConfig::load_from(&path);
        assert_eq!(config.top_regions, 2);
        assert_eq!(config.top_services, 10);
    }

    #[test]
    fn test_config_invalid_file_falls_back() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"top_services": 0}"#).unwrap();
        assert_eq!(ReportConfig::load_from(&path), ReportConfig::default());

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(ReportConfig::load_from(&path), ReportConfig::default());
    }

    #[test]
    fn test_validate_rejects_negative_threshold() {
        let config = ReportConfig {
            low_cost_threshold: -1.0,
            ..ReportConfig::default()
        };
        assert!(matches!(config.validate(), Err(FinopsError::Config(_))));
    }

    #[test]
    fn test_settings_cli_overrides_config_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = ReportConfig::config_path_in(tmp.path());
        ReportConfig {
            alert_threshold_pct: 30.0,
            top_services: 4,
            ..ReportConfig::default()
        }
        .save_to(&path)
        .unwrap();

        let (settings, config) =
            Settings::load_impl(args(&["bill.csv", "--alert-threshold", "12.5"]), &path);

        assert_eq!(settings.inputs, vec![PathBuf::from("bill.csv")]);
        assert_eq!(config.alert_threshold_pct, 12.5);
        assert_eq!(config.top_services, 4);
    }

    #[test]
    fn test_settings_save_config_persists_merged_values() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("cfg").join("config.json");

        let (_, config) = Settings::load_impl(
            args(&["bill.csv", "--top-services", "7", "--save-config"]),
            &path,
        );

        assert_eq!(config.top_services, 7);
        assert_eq!(ReportConfig::load_from(&path).top_services, 7);
    }

    #[test]
    fn test_settings_debug_flag_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("config.json");
        let (settings, _) = Settings::load_impl(args(&["a.csv", "--debug"]), &path);
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_settings_converter_args_collect_in_order() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("config.json");
        let (settings, _) = Settings::load_impl(
            args(&[
                "report.pdf",
                "--converter",
                "docling",
                "--converter-arg",
                "--to",
                "--converter-arg",
                "md",
            ]),
            &path,
        );
        assert_eq!(settings.converter, "docling");
        assert_eq!(settings.converter_args, vec!["--to", "md"]);
    }

    #[test]
    fn test_invalid_override_is_ignored() {
        let settings = Settings {
            inputs: vec![],
            format: "text".to_string(),
            converter: "markitdown".to_string(),
            converter_args: vec![],
            alert_threshold: Some(-5.0),
            low_cost_threshold: Some(2.0),
            top_services: None,
            config: None,
            save_config: false,
            log_level: "INFO".to_string(),
            debug: false,
        };
        let mut config = ReportConfig::default();
        settings.apply_overrides(&mut config);
        assert_eq!(config, ReportConfig::default());
    }
}
