//! Workflow configuration.
//!
//! The annotation form historically shipped as several near-identical
//! variants (with or without ranking, different column names, different
//! cache windows). Those differences are expressed here as data.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const MAX_METRICS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Collect a 1..=N ranking of the candidate metrics alongside the score.
    pub ranking_enabled: bool,

    /// How long a read of the Data and Finished sheets may be reused.
    pub cache_ttl_secs: u64,

    pub tables: TableNames,

    pub columns: ColumnMapping,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            ranking_enabled: true,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            tables: TableNames::default(),
            columns: ColumnMapping::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Loads `path` when given, else `fallback` if it exists, else defaults.
    pub fn load(path: Option<&Path>, fallback: &Path) -> Result<Self> {
        let config = match path {
            Some(path) => read_config(path)?,
            None if fallback.exists() => read_config(fallback)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.columns.metrics.len() > MAX_METRICS {
            bail!(
                "at most {MAX_METRICS} metric columns are supported, got {}",
                self.columns.metrics.len()
            );
        }

        let names = [&self.tables.data, &self.tables.score, &self.tables.finished];
        for (index, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                bail!("table names must be non-empty");
            }
            if names[index + 1..].contains(name) {
                bail!("table name {name} is used more than once");
            }
        }

        let headers = [
            (&self.tables.data, self.columns.data_header()),
            (&self.tables.score, self.columns.score_header()),
            (&self.tables.finished, self.columns.finished_header()),
        ];
        for (table, header) in headers {
            let mut seen = HashSet::new();
            for column in header {
                if !seen.insert(column.clone()) {
                    bail!("column {column} appears more than once in the {table} sheet");
                }
            }
        }
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<WorkflowConfig> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub data: String,
    pub score: String,
    pub finished: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            data: "Data".to_string(),
            score: "Score".to_string(),
            finished: "Finished".to_string(),
        }
    }
}

/// Declarative mapping from sheet column names to item fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub group: String,
    pub item_id: Option<String>,
    pub reference: String,
    pub candidate: String,
    pub metrics: Vec<MetricColumns>,
    pub annotator: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            group: "DataGroup".to_string(),
            item_id: None,
            reference: "Reference".to_string(),
            candidate: "Sentence".to_string(),
            metrics: ["S1", "S2", "S3"]
                .into_iter()
                .map(MetricColumns::named)
                .collect(),
            annotator: "Name".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricColumns {
    /// Display name used when `name` is unset or empty for a row.
    pub label: String,
    pub score: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl MetricColumns {
    pub fn named(column: &str) -> Self {
        Self {
            label: column.to_string(),
            score: column.to_string(),
            name: None,
        }
    }
}

impl ColumnMapping {
    pub fn data_header(&self) -> Vec<String> {
        let mut header = vec![self.group.clone()];
        header.extend(self.item_id.clone());
        header.push(self.reference.clone());
        header.push(self.candidate.clone());
        for metric in &self.metrics {
            header.extend(metric.name.clone());
            header.push(metric.score.clone());
        }
        header
    }

    /// `[group, item, annotator, reference, sentence, s1.., s1_rank.., human_score]`
    pub fn score_header(&self) -> Vec<String> {
        let mut header = vec![
            self.group.clone(),
            "ItemId".to_string(),
            self.annotator.clone(),
            self.reference.clone(),
            self.candidate.clone(),
        ];
        header.extend(metric_slot_labels(&self.metrics));
        header.extend(
            metric_slot_labels(&self.metrics)
                .into_iter()
                .map(|label| format!("{label}_rank")),
        );
        header.push("HumanScore".to_string());
        header
    }

    pub fn finished_header(&self) -> Vec<String> {
        vec![self.group.clone(), self.annotator.clone()]
    }
}

fn metric_slot_labels(metrics: &[MetricColumns]) -> Vec<String> {
    (0..MAX_METRICS)
        .map(|slot| {
            metrics
                .get(slot)
                .map(|metric| metric.label.clone())
                .unwrap_or_else(|| format!("S{}", slot + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_headers_follow_original_sheet_layout() {
        let columns = ColumnMapping::default();
        assert_eq!(
            columns.data_header(),
            vec!["DataGroup", "Reference", "Sentence", "S1", "S2", "S3"]
        );
        assert_eq!(
            columns.score_header(),
            vec![
                "DataGroup",
                "ItemId",
                "Name",
                "Reference",
                "Sentence",
                "S1",
                "S2",
                "S3",
                "S1_rank",
                "S2_rank",
                "S3_rank",
                "HumanScore"
            ]
        );
        assert_eq!(columns.finished_header(), vec!["DataGroup", "Name"]);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let raw = r#"{ "ranking_enabled": false, "columns": { "group": "Group" } }"#;
        let config: WorkflowConfig = serde_json::from_str(raw).expect("config should parse");

        assert!(!config.ranking_enabled);
        assert_eq!(config.cache_ttl_secs, DEFAULT_CACHE_TTL_SECS);
        assert_eq!(config.columns.group, "Group");
        assert_eq!(config.columns.reference, "Reference");
        assert_eq!(config.columns.metrics.len(), 3);
        assert_eq!(config.tables.finished, "Finished");
    }

    #[test]
    fn validate_rejects_too_many_metrics_and_shared_table_names() {
        let mut config = WorkflowConfig::default();
        config.columns.metrics.push(MetricColumns::named("S4"));
        assert!(config.validate().is_err());

        let mut config = WorkflowConfig::default();
        config.tables.score = "Data".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_columns_that_collide_in_written_sheets() {
        let mut config = WorkflowConfig::default();
        config.columns.annotator = "DataGroup".to_string();
        let err = config.validate().expect_err("annotator column would repeat DataGroup");
        assert!(err.to_string().contains("column DataGroup appears more than once"));

        let mut config = WorkflowConfig::default();
        config.columns.reference = "ItemId".to_string();
        let err = config.validate().expect_err("score header would repeat ItemId");
        assert!(err.to_string().contains("ItemId appears more than once in the Score sheet"));

        let mut config = WorkflowConfig::default();
        config.columns.item_id = Some("ItemId".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn data_header_includes_optional_item_and_metric_name_columns() {
        let columns = ColumnMapping {
            item_id: Some("ItemId".to_string()),
            metrics: vec![MetricColumns {
                label: "M1".to_string(),
                score: "Score1".to_string(),
                name: Some("Metric1".to_string()),
            }],
            ..ColumnMapping::default()
        };

        assert_eq!(
            columns.data_header(),
            vec!["DataGroup", "ItemId", "Reference", "Sentence", "Metric1", "Score1"]
        );
    }
}
