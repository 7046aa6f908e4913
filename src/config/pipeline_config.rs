use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub folders: FoldersSection,
    pub files: FilesSection,
    pub filters: FilterSection,
    pub charts: ChartSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldersSection {
    pub data_csv: PathBuf,
    pub charts: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesSection {
    pub merged: String,
    pub title_basics: SourceFiles,
    pub title_ratings: SourceFiles,
    pub bom_gross: SourceFiles,
    pub tn_budgets: SourceFiles,
}

/// Compressed, raw and cleaned file names for one CSV source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFiles {
    /// Optional .gz archive the raw file is unpacked from.
    #[serde(default)]
    pub zip: Option<String>,
    pub raw: String,
    pub clean: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSection {
    pub year_min: u32,
    pub year_max: u32,
    pub runtime_min: u32,
    pub runtime_max: u32,
    pub rating_min: f64,
    pub rating_max: f64,
    /// Minimum vote count a rating row must carry to survive cleaning.
    pub votes_min: u64,
    /// Stricter per-title vote threshold applied by the reporting stage.
    pub votes_per_title_min: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSection {
    pub max_bars: usize,
    pub min_titles_per_genre: usize,
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Location of a raw or clean data file inside the data folder.
    pub fn data_path(&self, file_name: &str) -> PathBuf {
        self.folders.data_csv.join(file_name)
    }

    pub fn merged_path(&self) -> PathBuf {
        self.data_path(&self.files.merged)
    }

    pub fn chart_path(&self, file_name: &str) -> PathBuf {
        self.folders.charts.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[folders]
data_csv = "data"
charts = "charts"

[files]
merged = "merged.csv"

[files.title_basics]
zip = "basics.csv.gz"
raw = "basics.csv"
clean = "clean.basics.csv"

[files.title_ratings]
raw = "ratings.csv"
clean = "clean.ratings.csv"

[files.bom_gross]
raw = "bom.csv"
clean = "clean.bom.csv"

[files.tn_budgets]
raw = "tn.csv"
clean = "clean.tn.csv"

[filters]
year_min = 2010
year_max = 2019
runtime_min = 25
runtime_max = 360
rating_min = 1.0
rating_max = 10.0
votes_min = 100
votes_per_title_min = 1000

[charts]
max_bars = 20
min_titles_per_genre = 10
"#;

    #[test]
    fn test_parse_sample_config() {
        let config: PipelineConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.filters.year_min, 2010);
        assert_eq!(config.filters.year_max, 2019);
        assert_eq!(config.files.title_basics.clean, "clean.basics.csv");
        assert_eq!(config.files.title_basics.zip.as_deref(), Some("basics.csv.gz"));
        assert_eq!(config.files.title_ratings.zip, None);
        assert_eq!(config.charts.max_bars, 20);
    }

    #[test]
    fn test_path_helpers() {
        let config: PipelineConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(
            config.data_path(&config.files.bom_gross.raw),
            PathBuf::from("data/bom.csv")
        );
        assert_eq!(config.merged_path(), PathBuf::from("data/merged.csv"));
        assert_eq!(config.chart_path("genres.png"), PathBuf::from("charts/genres.png"));
    }
}
