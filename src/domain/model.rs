use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 一份 CSV：表頭加上與表頭位置對齊的字串儲存格
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub file_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            file_name: String::new(),
            headers,
            rows,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

/// Primary column index -> reference field name. Partial by nature.
pub type ColumnMapping = BTreeMap<usize, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Percentage,
}

impl Operator {
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Operator::Add => a + b,
            Operator::Subtract => a - b,
            Operator::Multiply => a * b,
            Operator::Divide => {
                if b != 0.0 {
                    a / b
                } else {
                    0.0
                }
            }
            Operator::Percentage => (a * b) / 100.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Add => "add",
            Operator::Subtract => "subtract",
            Operator::Multiply => "multiply",
            Operator::Divide => "divide",
            Operator::Percentage => "percentage",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "add" | "+" => Ok(Operator::Add),
            "subtract" | "-" => Ok(Operator::Subtract),
            "multiply" | "*" | "x" => Ok(Operator::Multiply),
            "divide" | "/" => Ok(Operator::Divide),
            "percentage" | "%" => Ok(Operator::Percentage),
            other => Err(format!(
                "unknown operator '{}', expected add, subtract, multiply, divide or percentage",
                other
            )),
        }
    }
}

/// Draft of a derived column as typed by the user. `operator: None` is the
/// "not selected yet" state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationForm {
    #[serde(default)]
    pub source_field: String,
    #[serde(default)]
    pub operator: Option<Operator>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub operand: String,
    #[serde(default)]
    pub new_field_name: String,
}

/// Config files may write the operand as `3` or `"3"`.
fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Operand {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match Operand::deserialize(deserializer)? {
        Operand::Text(text) => text,
        Operand::Integer(value) => value.to_string(),
        Operand::Float(value) => value.to_string(),
    })
}

impl OperationForm {
    pub fn new(
        source_field: impl Into<String>,
        operator: Operator,
        operand: impl Into<String>,
        new_field_name: impl Into<String>,
    ) -> Self {
        Self {
            source_field: source_field.into(),
            operator: Some(operator),
            operand: operand.into(),
            new_field_name: new_field_name.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// `SOURCE:OPERATOR:OPERAND:NEW_FIELD`, e.g. `Qty:multiply:3:Total`.
impl FromStr for OperationForm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(4, ':').collect();
        if parts.len() != 4 {
            return Err(format!(
                "invalid derived column '{}', expected SOURCE:OPERATOR:OPERAND:NEW_FIELD",
                s
            ));
        }

        Ok(Self {
            source_field: parts[0].to_string(),
            operator: Some(parts[1].parse()?),
            operand: parts[2].to_string(),
            new_field_name: parts[3].to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedColumnSpec {
    pub id: u64,
    pub source_field: String,
    pub operator: Operator,
    pub operand: String,
    pub new_field_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnknownSourceField,
    TargetExists,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownSourceField => f.write_str("source field not found"),
            SkipReason::TargetExists => f.write_str("target field already exists"),
        }
    }
}

/// Outcome of one derived-column batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: Vec<u64>,
    pub skipped: Vec<(u64, SkipReason)>,
}

/// One exported row. Keys keep header order; a repeated header keeps its
/// first position and takes the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// 後端成功回應的摘要
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReceipt {
    pub status: u16,
    pub body: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub record_count: usize,
}

/// Both tables as read from storage.
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub primary: Table,
    pub reference: Table,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub table: Table,
    pub mapping: ColumnMapping,
    pub report: ApplyReport,
    pub records: Vec<Record>,
}
