//! Group-by aggregation over filtered and joined rows.

use std::collections::HashMap;

use super::plan::{Measure, MeasureOp};
use super::result::ResultRow;
use crate::record::Record;
use crate::value::{IndexKey, Value};

/// Collapse rows into one synthetic record per group.
///
/// Groups appear in first-seen order; a query without group fields always
/// produces exactly one row. Null group values form a group of their own.
pub(super) fn aggregate_rows(
    table: &str,
    rows: Vec<ResultRow>,
    group_by: &[String],
    measures: &[Measure],
) -> Vec<ResultRow> {
    let mut group_order: Vec<Vec<Option<IndexKey>>> = Vec::new();
    let mut groups: HashMap<Vec<Option<IndexKey>>, Vec<usize>> = HashMap::new();

    if group_by.is_empty() {
        group_order.push(Vec::new());
        groups.insert(Vec::new(), (0..rows.len()).collect());
    } else {
        for (i, row) in rows.iter().enumerate() {
            let key: Vec<Option<IndexKey>> = group_by
                .iter()
                .map(|field| row.base.get(field).and_then(IndexKey::from_value))
                .collect();
            if !groups.contains_key(&key) {
                group_order.push(key.clone());
            }
            groups.entry(key).or_default().push(i);
        }
    }

    group_order
        .into_iter()
        .enumerate()
        .map(|(ordinal, key)| {
            let members = &groups[&key];
            let mut fields: Vec<(String, Value)> = Vec::new();

            if let Some(&first) = members.first() {
                for field in group_by {
                    let value = rows[first].base.get(field).cloned().unwrap_or(Value::Null);
                    fields.push((field.clone(), value));
                }
            } else {
                for field in group_by {
                    fields.push((field.clone(), Value::Null));
                }
            }

            for measure in measures {
                let value = compute_measure(measure, members, &rows);
                fields.push((measure.name.clone(), value));
            }

            ResultRow {
                base: Record::new(table, ordinal as u32, fields),
                joined: Vec::new(),
            }
        })
        .collect()
}

fn compute_measure(measure: &Measure, members: &[usize], rows: &[ResultRow]) -> Value {
    match measure.op {
        MeasureOp::Count => match &measure.field {
            None => Value::Int(members.len() as i64),
            Some(field) => Value::Int(
                members
                    .iter()
                    .filter(|&&i| {
                        rows[i]
                            .base
                            .get(field)
                            .map(|v| !v.is_null())
                            .unwrap_or(false)
                    })
                    .count() as i64,
            ),
        },
        MeasureOp::Sum => Value::Float(numeric_values(measure, members, rows).sum()),
        MeasureOp::Avg => {
            let values: Vec<f64> = numeric_values(measure, members, rows).collect();
            if values.is_empty() {
                Value::Null
            } else {
                Value::Float(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        MeasureOp::Min => fold_by_compare(measure, members, rows, std::cmp::Ordering::Less),
        MeasureOp::Max => fold_by_compare(measure, members, rows, std::cmp::Ordering::Greater),
    }
}

fn numeric_values<'a>(
    measure: &'a Measure,
    members: &'a [usize],
    rows: &'a [ResultRow],
) -> impl Iterator<Item = f64> + 'a {
    members.iter().filter_map(move |&i| {
        measure
            .field
            .as_ref()
            .and_then(|field| rows[i].base.get(field))
            .and_then(Value::as_f64)
    })
}

fn fold_by_compare(
    measure: &Measure,
    members: &[usize],
    rows: &[ResultRow],
    keep: std::cmp::Ordering,
) -> Value {
    let mut best: Option<&Value> = None;
    for &i in members {
        let Some(value) = measure
            .field
            .as_ref()
            .and_then(|field| rows[i].base.get(field))
        else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        best = Some(match best {
            None => value,
            Some(current) => {
                if value.compare(current) == Some(keep) {
                    value
                } else {
                    current
                }
            }
        });
    }
    best.cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(group: &str, hours: Value) -> ResultRow {
        ResultRow {
            base: Record::new(
                "5BOOK",
                0,
                vec![
                    ("type".into(), Value::Text(group.into())),
                    ("hours".into(), hours),
                ],
            ),
            joined: Vec::new(),
        }
    }

    #[test]
    fn test_group_by_first_seen_order() {
        let rows = vec![
            row("b", Value::Float(1.0)),
            row("a", Value::Float(2.0)),
            row("b", Value::Float(3.0)),
        ];
        let result = aggregate_rows(
            "5BOOK",
            rows,
            &["type".to_string()],
            &[Measure::count("n")],
        );

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].get("type"), Some(&Value::Text("b".into())));
        assert_eq!(result[0].get("n"), Some(&Value::Int(2)));
        assert_eq!(result[1].get("type"), Some(&Value::Text("a".into())));
        assert_eq!(result[1].get("n"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_measures() {
        let rows = vec![
            row("a", Value::Float(2.0)),
            row("a", Value::Float(4.0)),
            row("a", Value::Null),
        ];
        let result = aggregate_rows(
            "5BOOK",
            rows,
            &["type".to_string()],
            &[
                Measure::count("n"),
                Measure::count_field("with_hours", "hours"),
                Measure::sum("total", "hours"),
                Measure::avg("mean", "hours"),
                Measure::min("low", "hours"),
                Measure::max("high", "hours"),
            ],
        );

        let only = &result[0];
        assert_eq!(only.get("n"), Some(&Value::Int(3)));
        assert_eq!(only.get("with_hours"), Some(&Value::Int(2)));
        assert_eq!(only.get("total"), Some(&Value::Float(6.0)));
        assert_eq!(only.get("mean"), Some(&Value::Float(3.0)));
        assert_eq!(only.get("low"), Some(&Value::Float(2.0)));
        assert_eq!(only.get("high"), Some(&Value::Float(4.0)));
    }

    #[test]
    fn test_no_groups_single_row() {
        let result = aggregate_rows("5BOOK", Vec::new(), &[], &[Measure::count("n")]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].get("n"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_avg_of_no_values_is_null() {
        let rows = vec![row("a", Value::Null)];
        let result = aggregate_rows(
            "5BOOK",
            rows,
            &["type".to_string()],
            &[Measure::avg("mean", "hours")],
        );
        assert_eq!(result[0].get("mean"), Some(&Value::Null));
    }
}
