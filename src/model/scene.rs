use indexmap::IndexMap;

/// Scene name → ordered field names. Insertion order is the display order.
pub type Scenes = IndexMap<String, Vec<String>>;

/// One table row: field name → cell text, in column order
pub type Record = IndexMap<String, String>;

/// A scene together with its rows, as handed to a table view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneTable {
    pub name: String,
    pub fields: Vec<String>,
    pub records: Vec<Record>,
}

impl SceneTable {
    /// Cell text for `field` in row `row`, empty when the row lacks it
    pub fn cell(&self, row: usize, field: &str) -> &str {
        self.records
            .get(row)
            .and_then(|r| r.get(field))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}
