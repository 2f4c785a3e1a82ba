//! Flux query results decoded from the CSV dialect of the query endpoint.

use errors::{ClientResult, InfluxClientError};
use serde::Serialize;
use std::collections::BTreeMap;

/// One row of a Flux result table, keyed by column name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FluxRecord {
    values: BTreeMap<String, String>
}

impl FluxRecord {
    pub fn value_by_key(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn measurement(&self) -> Option<&str> {
        self.value_by_key("_measurement")
    }

    pub fn field(&self) -> Option<&str> {
        self.value_by_key("_field")
    }

    pub fn value(&self) -> Option<&str> {
        self.value_by_key("_value")
    }

    /// RFC3339 timestamp of the row as returned by the server.
    pub fn time(&self) -> Option<&str> {
        self.value_by_key("_time")
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

/// Rows sharing one value of the `table` column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FluxTable {
    pub id: String,
    pub columns: Vec<String>,
    pub records: Vec<FluxRecord>
}

/// CSV dialect requested from the server.
///
/// Annotation rows start every table block, which is how blocks with
/// different schemas are told apart.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Dialect {
    header: bool,
    delimiter: &'static str,
    annotations: [&'static str; 3]
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            header: true,
            delimiter: ",",
            annotations: ["datatype", "group", "default"]
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QueryRequest<'a> {
    pub query: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub dialect: Dialect
}

impl<'a> QueryRequest<'a> {
    pub fn flux(query: &'a str) -> Self {
        Self {
            query,
            kind: "flux",
            dialect: Dialect::default()
        }
    }
}

const ERROR_COLUMN: &str = "error";
const REFERENCE_COLUMN: &str = "reference";

/// Decode a query response into tables.
///
/// A `#` annotation row ends the current block; the first plain row after it
/// is the header. Rows are grouped by their `table` value. A block whose
/// header starts with `error` is a failed query and becomes
/// [`InfluxClientError::Query`].
pub(crate) fn parse_tables(body: &str) -> ClientResult<Vec<FluxTable>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut tables: Vec<FluxTable> = Vec::new();
    let mut header: Option<Vec<String>> = None;

    for row in reader.records() {
        let row = row.map_err(|e| decode_error(e.to_string()))?;
        if row.get(0).is_some_and(|cell| cell.starts_with('#')) {
            header = None;
            continue;
        }

        let Some(columns) = header.as_ref() else {
            header = Some(row.iter().map(str::to_string).collect());
            continue;
        };
        if row.len() != columns.len() {
            return Err(decode_error(format!(
                "row has {} cells but the header has {} columns",
                row.len(),
                columns.len()
            )));
        }

        let values: BTreeMap<String, String> = columns
            .iter()
            .zip(row.iter())
            .filter(|(column, _)| !column.is_empty())
            .map(|(column, cell)| (column.clone(), cell.to_string()))
            .collect();

        let named_columns: Vec<String> = columns.iter().filter(|c| !c.is_empty()).cloned().collect();
        if named_columns.first().is_some_and(|c| c == ERROR_COLUMN) {
            return Err(query_error(values));
        }

        let id = values.get("table").cloned().unwrap_or_default();
        let record = FluxRecord { values };
        match tables
            .iter_mut()
            .find(|t| t.id == id && t.columns == named_columns)
        {
            Some(table) => table.records.push(record),
            None => tables.push(FluxTable {
                id,
                columns: named_columns,
                records: vec![record]
            })
        }
    }

    Ok(tables)
}

fn query_error(mut values: BTreeMap<String, String>) -> InfluxClientError {
    let message = values.remove(ERROR_COLUMN).unwrap_or_default();
    let message = match values.remove(REFERENCE_COLUMN) {
        Some(reference) if !reference.is_empty() => format!("{} (reference {})", message, reference),
        _ => message
    };
    InfluxClientError::Query { message }
}

fn decode_error(reason: String) -> InfluxClientError {
    InfluxClientError::Decode {
        what: "query response".to_string(),
        reason
    }
}
