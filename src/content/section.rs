//! Content blocks that make up a dashboard page or facility.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A label/value pair in a details block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailRow {
    pub label: String,
    pub value: String,
}

/// Table column: `key` selects the value from each row object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub href: String,
}

/// One block of page content, tagged by `kind` in JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
    Text {
        #[serde(default)]
        heading: Option<String>,
        body: String,
    },
    List {
        #[serde(default)]
        heading: Option<String>,
        items: Vec<String>,
    },
    Details {
        #[serde(default)]
        heading: Option<String>,
        rows: Vec<DetailRow>,
    },
    Table {
        #[serde(default)]
        heading: Option<String>,
        columns: Vec<Column>,
        rows: Vec<Map<String, Value>>,
    },
    Links {
        #[serde(default)]
        heading: Option<String>,
        links: Vec<Link>,
    },
}

/// Render a JSON cell as display text. Arrays are joined with ", ".
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(cell_text).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}

impl Section {
    pub fn kind(&self) -> &'static str {
        match self {
            Section::Text { .. } => "text",
            Section::List { .. } => "list",
            Section::Details { .. } => "details",
            Section::Table { .. } => "table",
            Section::Links { .. } => "links",
        }
    }

    pub fn heading(&self) -> Option<&str> {
        match self {
            Section::Text { heading, .. }
            | Section::List { heading, .. }
            | Section::Details { heading, .. }
            | Section::Table { heading, .. }
            | Section::Links { heading, .. } => heading.as_deref(),
        }
    }

    /// Table keys missing from any row, as `(row index, key)`
    pub fn missing_cells(&self) -> Vec<(usize, String)> {
        let Section::Table { columns, rows, .. } = self else {
            return Vec::new();
        };
        rows.iter()
            .enumerate()
            .flat_map(|(i, row)| {
                columns
                    .iter()
                    .filter(|c| !row.contains_key(&c.key))
                    .map(move |c| (i, c.key.clone()))
            })
            .collect()
    }

    /// Flatten into the shape the templates render
    pub fn view(&self) -> SectionView {
        let mut view = SectionView {
            kind: self.kind(),
            heading: self.heading().map(str::to_string),
            ..SectionView::default()
        };
        match self {
            Section::Text { body, .. } => view.body = Some(body.clone()),
            Section::List { items, .. } => view.items = items.clone(),
            Section::Details { rows, .. } => view.details = rows.clone(),
            Section::Table { columns, rows, .. } => {
                view.columns = columns.iter().map(|c| c.label.clone()).collect();
                view.rows = rows
                    .iter()
                    .map(|row| {
                        columns
                            .iter()
                            .map(|c| row.get(&c.key).map(cell_text).unwrap_or_default())
                            .collect()
                    })
                    .collect();
            }
            Section::Links { links, .. } => view.links = links.clone(),
        }
        view
    }
}

/// Template-facing section with every cell already converted to text.
#[derive(Debug, Clone, Default)]
pub struct SectionView {
    pub kind: &'static str,
    pub heading: Option<String>,
    pub body: Option<String>,
    pub items: Vec<String>,
    pub details: Vec<DetailRow>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub links: Vec<Link>,
}

impl SectionView {
    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }

    pub fn is_list(&self) -> bool {
        self.kind == "list"
    }

    pub fn is_details(&self) -> bool {
        self.kind == "details"
    }

    pub fn is_table(&self) -> bool {
        self.kind == "table"
    }

    pub fn is_links(&self) -> bool {
        self.kind == "links"
    }
}
