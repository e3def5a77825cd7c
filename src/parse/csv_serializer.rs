use crate::model::scene::Record;

/// Serialize records as CSV under the given header.
///
/// Each row emits the record's value for every field in order, empty where
/// the record lacks it; keys outside `fields` are not written. Rows end in
/// `\r\n`.
pub fn serialize_records(fields: &[String], records: &[Record]) -> String {
    let mut out = String::new();
    push_row(&mut out, fields.iter().map(|f| f.as_str()));
    for record in records {
        push_row(
            &mut out,
            fields
                .iter()
                .map(|f| record.get(f).map(|v| v.as_str()).unwrap_or("")),
        );
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    let cells: Vec<&str> = cells.collect();
    if cells.len() == 1 && cells[0].is_empty() {
        // A bare empty line would read back as no row at all
        out.push_str("\"\"");
    } else {
        let escaped: Vec<String> = cells.iter().map(|c| escape_cell(c)).collect();
        out.push_str(&escaped.join(","));
    }
    out.push_str("\r\n");
}

fn escape_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
