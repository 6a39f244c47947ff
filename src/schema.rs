//! Typed parsing of sheet records at the store boundary.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::config::ColumnMapping;
use crate::model::{ComparisonItem, MetricScore};
use crate::store::{Cell, Record};

static INTEGRAL_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(-?\d+)(?:\.0+)?\s*$").expect("group id pattern is valid")
});

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("table {table} row {row}: missing column {column}")]
    MissingColumn {
        table: String,
        row: usize,
        column: String,
    },

    #[error("table {table} row {row}: column {column} has invalid value {value:?}")]
    InvalidValue {
        table: String,
        row: usize,
        column: String,
        value: String,
    },
}

struct RowReader<'a> {
    table: &'a str,
    row: usize,
    record: &'a Record,
}

impl<'a> RowReader<'a> {
    fn cell(&self, column: &str) -> Result<&'a Cell, SchemaError> {
        self.record
            .get(column)
            .ok_or_else(|| SchemaError::MissingColumn {
                table: self.table.to_string(),
                row: self.row,
                column: column.to_string(),
            })
    }

    fn invalid(&self, column: &str, cell: &Cell) -> SchemaError {
        SchemaError::InvalidValue {
            table: self.table.to_string(),
            row: self.row,
            column: column.to_string(),
            value: cell.to_string(),
        }
    }

    fn group_id(&self, column: &str) -> Result<i64, SchemaError> {
        let cell = self.cell(column)?;
        parse_group_id(cell).ok_or_else(|| self.invalid(column, cell))
    }

    fn text(&self, column: &str) -> Result<String, SchemaError> {
        Ok(self.cell(column)?.to_string())
    }

    fn optional_real(&self, column: &str) -> Result<Option<f64>, SchemaError> {
        let cell = self.cell(column)?;
        match cell {
            Cell::Empty => Ok(None),
            Cell::Int(value) => Ok(Some(*value as f64)),
            Cell::Real(value) => Ok(Some(*value)),
            Cell::Text(value) if value.trim().is_empty() => Ok(None),
            Cell::Text(value) => value
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| self.invalid(column, cell)),
        }
    }
}

// Exact f64 bounds of the i64 range; the upper one is 2^63 itself.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

pub fn parse_group_id(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Int(value) => Some(*value),
        Cell::Real(value) if value.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(value) => {
            Some(*value as i64)
        }
        Cell::Text(value) => INTEGRAL_TEXT
            .captures(value)
            .and_then(|captures| captures.get(1))
            .and_then(|digits| digits.as_str().parse().ok()),
        _ => None,
    }
}

/// Parses every Data record into a [`ComparisonItem`], in sheet order.
///
/// Rows are numbered from 1 in errors and in generated item ids.
pub fn parse_items(
    table: &str,
    records: &[Record],
    columns: &ColumnMapping,
) -> Result<Vec<ComparisonItem>, SchemaError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let reader = RowReader {
                table,
                row: index + 1,
                record,
            };
            parse_item(&reader, columns)
        })
        .collect()
}

fn parse_item(reader: &RowReader<'_>, columns: &ColumnMapping) -> Result<ComparisonItem, SchemaError> {
    let group_id = reader.group_id(&columns.group)?;
    let item_id = match &columns.item_id {
        Some(column) => {
            let cell = reader.cell(column)?;
            if cell.is_empty() {
                return Err(reader.invalid(column, cell));
            }
            cell.to_string()
        }
        None => format!("row-{}", reader.row),
    };

    let mut metrics = Vec::with_capacity(columns.metrics.len());
    for (slot, metric) in columns.metrics.iter().enumerate() {
        let Some(score) = reader.optional_real(&metric.score)? else {
            continue;
        };
        let name = match &metric.name {
            Some(column) => {
                let name = reader.text(column)?;
                if name.trim().is_empty() {
                    metric.label.clone()
                } else {
                    name
                }
            }
            None => metric.label.clone(),
        };
        metrics.push(MetricScore { slot, name, score });
    }

    Ok(ComparisonItem {
        group_id,
        item_id,
        reference: reader.text(&columns.reference)?,
        candidate_sentence: reader.text(&columns.candidate)?,
        metrics,
    })
}

/// Group ids carrying a Finished marker.
pub fn finished_groups(
    table: &str,
    records: &[Record],
    columns: &ColumnMapping,
) -> Result<BTreeSet<i64>, SchemaError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            RowReader {
                table,
                row: index + 1,
                record,
            }
            .group_id(&columns.group)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricColumns;

    fn record(pairs: &[(&str, Cell)]) -> Record {
        pairs
            .iter()
            .map(|(column, cell)| (column.to_string(), cell.clone()))
            .collect()
    }

    fn data_record(group: Cell, s3: Cell) -> Record {
        record(&[
            ("DataGroup", group),
            ("Reference", Cell::text("the cat sat")),
            ("Sentence", Cell::text("a cat was sitting")),
            ("S1", Cell::Real(0.2)),
            ("S2", Cell::Text("0.6".to_string())),
            ("S3", s3),
        ])
    }

    #[test]
    fn group_id_accepts_spreadsheet_integer_forms() {
        assert_eq!(parse_group_id(&Cell::Int(4)), Some(4));
        assert_eq!(parse_group_id(&Cell::Real(2.0)), Some(2));
        assert_eq!(parse_group_id(&Cell::text(" 7 ")), Some(7));
        assert_eq!(parse_group_id(&Cell::text("3.00")), Some(3));
        assert_eq!(parse_group_id(&Cell::Real(2.5)), None);
        assert_eq!(parse_group_id(&Cell::text("group-1")), None);
        assert_eq!(parse_group_id(&Cell::Empty), None);
    }

    #[test]
    fn group_id_rejects_reals_outside_the_integer_range() {
        assert_eq!(parse_group_id(&Cell::Real(1e30)), None);
        assert_eq!(parse_group_id(&Cell::Real(-1e30)), None);
        assert_eq!(parse_group_id(&Cell::Real(9_223_372_036_854_775_808.0)), None);
        assert_eq!(parse_group_id(&Cell::Real(f64::INFINITY)), None);
        assert_eq!(parse_group_id(&Cell::Real(f64::NAN)), None);
        assert_eq!(parse_group_id(&Cell::Real(-4096.0)), Some(-4096));
    }

    #[test]
    fn parse_items_reads_metrics_and_skips_empty_slots() {
        let columns = ColumnMapping::default();
        let records = vec![
            data_record(Cell::Int(1), Cell::Real(0.9)),
            data_record(Cell::Real(1.0), Cell::Empty),
        ];

        let items = parse_items("Data", &records, &columns).expect("rows should parse");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item_id, "row-1");
        assert_eq!(items[0].metrics.len(), 3);
        assert_eq!(items[0].metrics[1].name, "S2");
        assert!((items[0].metrics[1].score - 0.6).abs() < f64::EPSILON);
        assert_eq!(items[1].group_id, 1);
        assert_eq!(items[1].metrics.len(), 2);
        assert_eq!(items[1].metrics[1].slot, 1);
    }

    #[test]
    fn parse_items_fails_fast_on_missing_column() {
        let columns = ColumnMapping::default();
        let mut broken = data_record(Cell::Int(1), Cell::Real(0.9));
        broken.remove("Reference");

        let err = parse_items("Data", &[data_record(Cell::Int(1), Cell::Empty), broken], &columns)
            .expect_err("missing column should fail");
        assert_eq!(
            err,
            SchemaError::MissingColumn {
                table: "Data".to_string(),
                row: 2,
                column: "Reference".to_string(),
            }
        );
    }

    #[test]
    fn parse_items_rejects_non_numeric_metric_scores() {
        let columns = ColumnMapping::default();
        let records = vec![data_record(Cell::Int(1), Cell::text("high"))];

        let err = parse_items("Data", &records, &columns).expect_err("bad score should fail");
        assert!(matches!(err, SchemaError::InvalidValue { ref column, .. } if column == "S3"));
    }

    #[test]
    fn parse_items_uses_mapped_item_and_metric_name_columns() {
        let columns = ColumnMapping {
            item_id: Some("Id".to_string()),
            metrics: vec![MetricColumns {
                label: "M1".to_string(),
                score: "Score1".to_string(),
                name: Some("Metric1".to_string()),
            }],
            ..ColumnMapping::default()
        };
        let records = vec![record(&[
            ("DataGroup", Cell::Int(9)),
            ("Id", Cell::text("pair-17")),
            ("Reference", Cell::text("r")),
            ("Sentence", Cell::text("c")),
            ("Metric1", Cell::text("bertscore")),
            ("Score1", Cell::Int(1)),
        ])];

        let items = parse_items("Data", &records, &columns).expect("row should parse");
        assert_eq!(items[0].item_id, "pair-17");
        assert_eq!(items[0].metrics[0].name, "bertscore");
        assert_eq!(items[0].metrics[0].score, 1.0);
    }

    #[test]
    fn finished_groups_collects_distinct_ids() {
        let columns = ColumnMapping::default();
        let records = vec![
            record(&[("DataGroup", Cell::Int(2)), ("Name", Cell::text("ana"))]),
            record(&[("DataGroup", Cell::text("2")), ("Name", Cell::text("bo"))]),
            record(&[("DataGroup", Cell::Int(5)), ("Name", Cell::text("ana"))]),
        ];

        let finished = finished_groups("Finished", &records, &columns).expect("should parse");
        assert_eq!(finished.into_iter().collect::<Vec<_>>(), vec![2, 5]);
    }
}
