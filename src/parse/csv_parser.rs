use crate::model::scene::Record;

/// Split CSV text into rows of cells. An empty line yields an empty row,
/// which is distinct from a row holding one empty quoted cell.
///
/// Comma-separated, `"`-quoted with doubled quotes as the escape. Quoted
/// cells may span lines. Accepts `\r\n` or `\n` row endings and a leading
/// byte-order mark.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut row_started = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cell.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                cell.push(c);
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                row_started = true;
            }
            ',' => {
                row.push(std::mem::take(&mut cell));
                row_started = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                if row_started {
                    row.push(std::mem::take(&mut cell));
                }
                rows.push(std::mem::take(&mut row));
                row_started = false;
            }
            _ => {
                cell.push(c);
                row_started = true;
            }
        }
    }

    if row_started {
        row.push(cell);
        rows.push(row);
    }
    rows
}

/// Parse CSV text into records keyed by the header row.
///
/// Short rows simply lack the trailing keys; cells beyond the header are
/// dropped. Blank lines are skipped. No check is made against any schema.
pub fn parse_records(text: &str) -> Vec<Record> {
    let mut rows = parse_rows(text).into_iter().skip_while(|r| r.is_empty());
    let header = match rows.next() {
        Some(h) => h,
        None => return Vec::new(),
    };

    rows.filter(|r| !is_blank_row(r))
        .map(|cells| {
            header
                .iter()
                .cloned()
                .zip(cells)
                .collect::<Record>()
        })
        .collect()
}

fn is_blank_row(row: &[String]) -> bool {
    row.is_empty()
}
