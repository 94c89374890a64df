//! CSV output table and its manifest.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use ledgerpipe_ia_rest::Record;

use crate::error::{Error, ErrorKind, Result};

/// Writes records to a CSV file.
///
/// The header is the column list set with [`TableWriter::set_columns`], or
/// the key order of the first row when none was set. Missing values are
/// empty cells. A row carrying a key outside the header is an error.
pub struct TableWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    columns: Vec<String>,
    rows: u64,
    header_written: bool,
}

impl std::fmt::Debug for TableWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableWriter")
            .field("path", &self.path)
            .field("columns", &self.columns)
            .field("rows", &self.rows)
            .finish()
    }
}

impl TableWriter {
    /// Create the file, and its parent directories.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let writer = csv::Writer::from_path(&path)?;

        Ok(Self {
            path,
            writer,
            columns: Vec::new(),
            rows: 0,
            header_written: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    pub fn write_rows(&mut self, rows: &[Record]) -> Result<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Fix the header before the first row is written.
    pub fn set_columns<I, S>(&mut self, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.header_written {
            return Err(Error::new(ErrorKind::Csv(format!(
                "{}: header already written",
                self.path.display()
            ))));
        }
        self.columns = columns.into_iter().map(Into::into).collect();
        Ok(())
    }

    pub fn write_row(&mut self, row: &Record) -> Result<()> {
        if !self.header_written {
            if self.columns.is_empty() {
                self.columns = row.keys().cloned().collect();
            }
            self.writer.write_record(&self.columns)?;
            self.header_written = true;
        }

        if let Some(extra) = row.keys().find(|k| !self.columns.contains(k)) {
            return Err(Error::new(ErrorKind::Csv(format!(
                "{}: column '{extra}' is not in the table header ({})",
                self.path.display(),
                self.columns.join(", ")
            ))));
        }

        let cells = self.columns.iter().map(|c| cell(row.get(c)));
        self.writer.write_record(cells)?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and close. Returns the header columns.
    pub fn finish(mut self) -> Result<Vec<String>> {
        self.writer.flush()?;
        Ok(self.columns)
    }
}

/// Table columns for a requested field list: the top-level key of each
/// field, in request order. `vendor.id` and `vendor.name` share `vendor`.
pub fn table_columns(fields: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(fields.len());
    for field in fields {
        let key = field.split('.').next().unwrap_or(field);
        if !columns.iter().any(|c| c == key) {
            columns.push(key.to_string());
        }
    }
    columns
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Table manifest written next to the CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub columns: Vec<String>,
    pub primary_key: Vec<String>,
    pub incremental: bool,
}

/// Write `<table>.manifest` for the table at `table_path`.
pub fn write_manifest(table_path: &Path, manifest: &Manifest) -> Result<PathBuf> {
    let mut name = table_path.as_os_str().to_owned();
    name.push(".manifest");
    let path = PathBuf::from(name);

    std::fs::write(&path, serde_json::to_string_pretty(manifest)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_header_from_first_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables/vendors.csv");

        let mut writer = TableWriter::create(&path).unwrap();
        writer
            .write_rows(&[
                record(json!({"key": "1", "name": "Acme", "total": 10.5})),
                record(json!({"name": "Globex", "key": "2"})),
            ])
            .unwrap();
        assert_eq!(writer.rows_written(), 2);
        let columns = writer.finish().unwrap();

        assert_eq!(columns, vec!["key", "name", "total"]);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "key,name,total\n1,Acme,10.5\n2,Globex,\n");
    }

    #[test]
    fn test_nested_and_null_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut writer = TableWriter::create(&path).unwrap();
        writer
            .write_row(&record(json!({
                "key": "1",
                "audit": {"createdBy": "admin"},
                "closed": null,
                "active": true,
                "extra_in_first": "x"
            })))
            .unwrap();
        writer.write_row(&record(json!({"key": "2"}))).unwrap();
        writer.finish().unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[0][1], r#"{"createdBy":"admin"}"#);
        assert_eq!(&rows[0][2], "");
        assert_eq!(&rows[0][3], "true");
        assert_eq!(rows[1].len(), 5);
        assert_eq!(&rows[1][0], "2");
        assert_eq!(&rows[1][4], "");
    }

    #[test]
    fn test_set_columns_keeps_values_missing_from_first_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vendors.csv");

        let mut writer = TableWriter::create(&path).unwrap();
        writer.set_columns(["key", "name"]).unwrap();
        writer
            .write_rows(&[
                record(json!({"key": "1"})),
                record(json!({"key": "2", "name": "Globex"})),
            ])
            .unwrap();
        let columns = writer.finish().unwrap();

        assert_eq!(columns, vec!["key", "name"]);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "key,name\n1,\n2,Globex\n"
        );
    }

    #[test]
    fn test_key_outside_header_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vendors.csv");

        let mut writer = TableWriter::create(&path).unwrap();
        writer.write_row(&record(json!({"key": "1"}))).unwrap();
        let err = writer
            .write_row(&record(json!({"key": "2", "name": "Globex"})))
            .unwrap_err();

        assert!(matches!(err.kind, ErrorKind::Csv(_)));
        assert!(err.to_string().contains("'name'"));
        assert_eq!(writer.rows_written(), 1);
        assert!(writer.set_columns(["key", "name"]).is_err());
    }

    #[test]
    fn test_table_columns_from_fields() {
        let fields: Vec<String> = ["key", "vendor.id", "name", "vendor.name"]
            .iter()
            .map(|f| f.to_string())
            .collect();
        assert_eq!(table_columns(&fields), vec!["key", "vendor", "name"]);
    }

    #[test]
    fn test_no_rows_no_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        let writer = TableWriter::create(&path).unwrap();
        assert!(writer.finish().unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_manifest_next_to_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("vendors.csv");

        let path = write_manifest(
            &table,
            &Manifest {
                columns: vec!["key".into(), "name".into()],
                primary_key: vec!["key".into()],
                incremental: true,
            },
        )
        .unwrap();

        assert_eq!(path, dir.path().join("vendors.csv.manifest"));
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(
            written,
            json!({"columns": ["key", "name"], "primary_key": ["key"], "incremental": true})
        );
    }
}
