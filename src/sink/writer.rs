use crate::error::Result;
use crate::table::Table;
use crate::types::Collection;
use serde_json::{Map, Value};
use std::io::Write;

/// Field added to tagged rows so mixed streams can be split again
pub const COLLECTION_FIELD: &str = "_collection";

/// Writes rows as JSON Lines, one object per line
pub struct RowWriter<W: Write> {
    writer: W,
    tag_collection: bool,
}

impl<W: Write> RowWriter<W> {
    /// Plain rows, as stored in a per-collection file
    pub fn new(writer: W) -> Self {
        RowWriter {
            writer,
            tag_collection: false,
        }
    }

    /// Rows carrying a `_collection` field, for a single mixed stream
    pub fn tagged(writer: W) -> Self {
        RowWriter {
            writer,
            tag_collection: true,
        }
    }

    pub fn write_row(&mut self, collection: Collection, row: &Map<String, Value>) -> Result<()> {
        let json = if self.tag_collection {
            let mut tagged = row.clone();
            tagged.insert(
                COLLECTION_FIELD.to_string(),
                Value::String(collection.name().to_string()),
            );
            serde_json::to_string(&tagged)?
        } else {
            serde_json::to_string(row)?
        };
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Write every padded row of a table; returns how many were written
    pub fn write_table(&mut self, table: &Table) -> Result<usize> {
        let mut written = 0;
        for row in table.rows() {
            self.write_row(table.collection(), &row)?;
            written += 1;
        }
        Ok(written)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;
    use serde_json::json;

    fn table() -> Table {
        Table::from_records(
            Collection::Teachers,
            vec![
                Record::new(
                    Collection::Teachers,
                    serde_json::from_value(json!({"courseId": "c1", "userId": "t1"})).unwrap(),
                ),
                Record::new(
                    Collection::Teachers,
                    serde_json::from_value(json!({"courseId": "c1", "userId": "t2", "x": 1}))
                        .unwrap(),
                ),
            ],
        )
    }

    #[test]
    fn test_tagged_writer() {
        let mut buffer = Vec::new();
        let mut writer = RowWriter::tagged(&mut buffer);
        assert_eq!(writer.write_table(&table()).unwrap(), 2);
        writer.flush().unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"_collection":"teachers","courseId":"c1","userId":"t1","x":null}"#
        );
    }

    #[test]
    fn test_plain_writer() {
        let mut buffer = Vec::new();
        let mut writer = RowWriter::new(&mut buffer);
        writer.write_table(&table()).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(!output.contains(COLLECTION_FIELD));
        assert!(output.contains(r#""userId":"t2","x":1"#));
    }
}
