//! Filter predicates and their evaluation.

use crate::record::Record;
use crate::value::Value;

/// A single filter condition over a base-table field.
///
/// A missing or null field value fails every predicate except
/// [`Predicate::IsNull`].
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field equals value (numeric kinds coerce).
    Eq { field: String, value: Value },
    /// Field does not equal value.
    Ne { field: String, value: Value },
    /// Field is strictly greater than value.
    Gt { field: String, value: Value },
    /// Field is greater than or equal to value.
    Ge { field: String, value: Value },
    /// Field is strictly less than value.
    Lt { field: String, value: Value },
    /// Field is less than or equal to value.
    Le { field: String, value: Value },
    /// Field lies in the inclusive range `[low, high]`.
    Between { field: String, low: Value, high: Value },
    /// Field equals one of the given values.
    In { field: String, values: Vec<Value> },
    /// Case-insensitive substring match on a text field.
    Contains { field: String, needle: String },
    /// Normalized Levenshtein similarity against `pattern` reaches
    /// `min_similarity` (0.0..=1.0). Case-insensitive.
    Fuzzy {
        field: String,
        pattern: String,
        min_similarity: f64,
    },
    /// Field is null or absent.
    IsNull { field: String },
    /// Field carries a non-null value.
    IsNotNull { field: String },
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Ge {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Le {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn between(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Predicate::Between {
            field: field.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn is_in(field: impl Into<String>, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Predicate::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Predicate::Contains {
            field: field.into(),
            needle: needle.into(),
        }
    }

    pub fn fuzzy(field: impl Into<String>, pattern: impl Into<String>, min_similarity: f64) -> Self {
        Predicate::Fuzzy {
            field: field.into(),
            pattern: pattern.into(),
            min_similarity,
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Predicate::IsNull {
            field: field.into(),
        }
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Predicate::IsNotNull {
            field: field.into(),
        }
    }

    /// The field this predicate reads.
    pub fn field(&self) -> &str {
        match self {
            Predicate::Eq { field, .. }
            | Predicate::Ne { field, .. }
            | Predicate::Gt { field, .. }
            | Predicate::Ge { field, .. }
            | Predicate::Lt { field, .. }
            | Predicate::Le { field, .. }
            | Predicate::Between { field, .. }
            | Predicate::In { field, .. }
            | Predicate::Contains { field, .. }
            | Predicate::Fuzzy { field, .. }
            | Predicate::IsNull { field }
            | Predicate::IsNotNull { field } => field,
        }
    }

    /// Evaluate against a record.
    pub fn matches(&self, record: &Record) -> bool {
        let value = record.get(self.field()).filter(|v| !v.is_null());

        match self {
            Predicate::IsNull { .. } => return value.is_none(),
            Predicate::IsNotNull { .. } => return value.is_some(),
            _ => {}
        }

        let Some(value) = value else {
            return false;
        };

        match self {
            Predicate::Eq { value: expected, .. } => value.loosely_equals(expected),
            Predicate::Ne { value: expected, .. } => !value.loosely_equals(expected),
            Predicate::Gt { value: bound, .. } => {
                value.compare(bound).map(|o| o.is_gt()).unwrap_or(false)
            }
            Predicate::Ge { value: bound, .. } => {
                value.compare(bound).map(|o| o.is_ge()).unwrap_or(false)
            }
            Predicate::Lt { value: bound, .. } => {
                value.compare(bound).map(|o| o.is_lt()).unwrap_or(false)
            }
            Predicate::Le { value: bound, .. } => {
                value.compare(bound).map(|o| o.is_le()).unwrap_or(false)
            }
            Predicate::Between { low, high, .. } => {
                value.compare(low).map(|o| o.is_ge()).unwrap_or(false)
                    && value.compare(high).map(|o| o.is_le()).unwrap_or(false)
            }
            Predicate::In { values, .. } => values.iter().any(|v| value.loosely_equals(v)),
            Predicate::Contains { needle, .. } => value
                .as_str()
                .map(|s| s.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            Predicate::Fuzzy {
                pattern,
                min_similarity,
                ..
            } => value
                .as_str()
                .map(|s| similarity(&s.to_lowercase(), &pattern.to_lowercase()) >= *min_similarity)
                .unwrap_or(false),
            Predicate::IsNull { .. } | Predicate::IsNotNull { .. } => unreachable!(),
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::Eq { field, value } => write!(f, "{field} = {value}"),
            Predicate::Ne { field, value } => write!(f, "{field} != {value}"),
            Predicate::Gt { field, value } => write!(f, "{field} > {value}"),
            Predicate::Ge { field, value } => write!(f, "{field} >= {value}"),
            Predicate::Lt { field, value } => write!(f, "{field} < {value}"),
            Predicate::Le { field, value } => write!(f, "{field} <= {value}"),
            Predicate::Between { field, low, high } => {
                write!(f, "{field} between {low} and {high}")
            }
            Predicate::In { field, values } => write!(f, "{field} in ({} values)", values.len()),
            Predicate::Contains { field, needle } => write!(f, "{field} contains {needle:?}"),
            Predicate::Fuzzy {
                field,
                pattern,
                min_similarity,
            } => write!(f, "{field} ~ {pattern:?} (>= {min_similarity})"),
            Predicate::IsNull { field } => write!(f, "{field} is null"),
            Predicate::IsNotNull { field } => write!(f, "{field} is not null"),
        }
    }
}

/// Normalized Levenshtein similarity in `0.0..=1.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let max_len = len_a.max(len_b);
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut matrix = vec![vec![0usize; b_chars.len() + 1]; a_chars.len() + 1];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b_chars.len() {
        matrix[0][j] = j;
    }

    for i in 1..=a_chars.len() {
        for j in 1..=b_chars.len() {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[a_chars.len()][b_chars.len()]
}
