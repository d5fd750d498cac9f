use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::model::Table;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "PALINSESTO_CONFIG";

/// Betting-market columns of the weekly schedule that get a range slider.
const PALINSESTO_NUMERIC: &[&str] = &[
    "ABBINATE", "1 PUNTA", "ABB 1 PUNTA", "2 PUNTA", "ABB 2 PUNTA", "PARI", "ABB PARI",
    "DISPARI", "ABB DISPARI", "GOAL", "ABB GOAL", "NOGOAL", "ABB NOGOAL", "OVER", "ABB OVER",
    "UNDER", "ABB UNDER", "GG", "ABB GG", "NG", "ABB NG", "1X", "ABB 1X", "X2", "ABB X2", "12",
    "ABB 12", "CASA", "ABB CASA", "FUORI", "ABB FUORI", "BANCA", "ABB 2 BANCA",
];

// ---------------------------------------------------------------------------
// Dataset profiles
// ---------------------------------------------------------------------------

/// Which columns hold decimal-comma numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericColumns {
    /// Columns listed by header name.
    Named(Vec<String>),
    /// Every column from this 0-based position onwards.
    FromIndex(usize),
    /// Only columns whose cells are typed numbers.
    Detect,
}

/// One logical dataset the viewer keeps a snapshot for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    /// Snapshot key, e.g. `palinsesto`.
    pub key: String,
    /// Label shown in the dataset selector.
    pub label: String,
    /// Worksheet to read; `None` asks when a workbook has several.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Column holding kick-off times.
    #[serde(default = "default_time_column")]
    pub time_column: String,
    #[serde(default = "default_numeric_columns")]
    pub numeric_columns: NumericColumns,
    /// Suggested file name for CSV exports.
    #[serde(default = "default_export_filename")]
    pub export_filename: String,
}

fn default_time_column() -> String {
    "ORA".to_string()
}

fn default_numeric_columns() -> NumericColumns {
    NumericColumns::Detect
}

fn default_export_filename() -> String {
    "export_filtrato.csv".to_string()
}

impl DatasetProfile {
    /// Whether the column at `col` is declared numeric for this dataset.
    pub fn declares_numeric(&self, table: &Table, col: usize) -> bool {
        match &self.numeric_columns {
            NumericColumns::Named(names) => table
                .columns
                .get(col)
                .is_some_and(|name| names.iter().any(|n| n == name)),
            NumericColumns::FromIndex(start) => col >= *start && col < table.columns.len(),
            NumericColumns::Detect => false,
        }
    }

    pub fn is_time_column(&self, name: &str) -> bool {
        self.time_column == name
    }
}

// ---------------------------------------------------------------------------
// ViewerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Directory holding `data_<key>.json` snapshots.
    pub snapshot_dir: PathBuf,
    /// Upper bound on simultaneously filtered columns.
    pub max_filter_columns: usize,
    /// Columns with at most this many distinct values get checkboxes.
    pub categorical_threshold: usize,
    pub datasets: Vec<DatasetProfile>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from(".palinsesto"),
            max_filter_columns: 5,
            categorical_threshold: 10,
            datasets: vec![
                DatasetProfile {
                    key: "palinsesto".to_string(),
                    label: "Palinsesto BF".to_string(),
                    sheet: None,
                    time_column: default_time_column(),
                    numeric_columns: NumericColumns::Named(
                        PALINSESTO_NUMERIC.iter().map(|s| s.to_string()).collect(),
                    ),
                    export_filename: "palinsesto_filtrato.csv".to_string(),
                },
                DatasetProfile {
                    key: "archivio".to_string(),
                    label: "Giornata Odierna FB".to_string(),
                    sheet: Some("Giornata Odierna".to_string()),
                    time_column: default_time_column(),
                    // Columns J onwards.
                    numeric_columns: NumericColumns::FromIndex(9),
                    export_filename: "giornata_odierna_filtrata.csv".to_string(),
                },
            ],
        }
    }
}

impl ViewerConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: ViewerConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Config from `PALINSESTO_CONFIG`, or the built-in defaults when the
    /// variable is unset or the file is unusable.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV) else {
            return Self::default();
        };
        let path = PathBuf::from(path);
        match Self::load(&path) {
            Ok(config) => {
                log::info!("Using config {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring config: {e:#}");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.datasets.is_empty() {
            bail!("config defines no datasets");
        }
        if self.max_filter_columns == 0 {
            bail!("max_filter_columns must be at least 1");
        }
        for (i, profile) in self.datasets.iter().enumerate() {
            if profile.key.is_empty()
                || !profile
                    .key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                bail!("dataset {i}: key '{}' must be non-empty [A-Za-z0-9_-]", profile.key);
            }
            if self.datasets[..i].iter().any(|p| p.key == profile.key) {
                bail!("dataset key '{}' is used twice", profile.key);
            }
        }
        Ok(())
    }
}
