/// Column Metadata Module
///
/// Per-column metadata of the live result cursor, plus the legacy
/// single-mapping layout some consumers still expect.
use crate::core::value::SemanticType;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// Metadata reported for a single result column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMeta {
    /// Column name as reported by the backend
    pub name: String,
    /// 0-based position in the result
    pub index: usize,
    /// Declared backend type, if the column maps to a table column
    pub native_type: Option<String>,
    /// Normalised type for the formatting layer
    pub semantic_type: SemanticType,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, index: usize, native_type: Option<String>) -> Self {
        let semantic_type = semantic_type_for(native_type.as_deref());
        Self {
            name: name.into(),
            index,
            native_type,
            semantic_type,
        }
    }
}

/// Metadata for every column of a result, in column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ColumnMetaMap {
    columns: Vec<ColumnMeta>,
}

impl ColumnMetaMap {
    pub fn new(columns: Vec<ColumnMeta>) -> Self {
        Self { columns }
    }

    /// Metadata for the named column. With duplicate names the last column wins.
    pub fn get(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().rev().find(|meta| meta.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|meta| meta.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnMeta> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The shape older consumers were built against: only the last column's
    /// metadata survives as top-level keys, plus one key named after that
    /// column holding a copy of the same metadata.
    pub fn legacy_layout(&self) -> JsonValue {
        let Some(last) = self.columns.last() else {
            return JsonValue::Object(Map::new());
        };

        let mut meta = match serde_json::to_value(last) {
            Ok(JsonValue::Object(map)) => map,
            _ => Map::new(),
        };
        let snapshot = JsonValue::Object(meta.clone());
        meta.insert(last.name.clone(), snapshot);
        JsonValue::Object(meta)
    }
}

impl<'a> IntoIterator for &'a ColumnMetaMap {
    type Item = &'a ColumnMeta;
    type IntoIter = std::slice::Iter<'a, ColumnMeta>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

/// Maps a declared column type onto a semantic type using SQLite's
/// substring affinity rules, refined for date and boolean declarations.
pub fn semantic_type_for(declared: Option<&str>) -> SemanticType {
    let Some(declared) = declared else {
        return SemanticType::Unknown;
    };
    let upper = declared.to_uppercase();

    if upper.contains("BOOL") {
        SemanticType::Bool
    } else if upper.contains("DATETIME") || upper.contains("TIMESTAMP") {
        SemanticType::DateTime
    } else if upper.contains("DATE") {
        SemanticType::Date
    } else if upper.contains("TIME") {
        SemanticType::Time
    } else if upper.contains("INT") {
        SemanticType::Integer
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        SemanticType::Text
    } else if upper.contains("BLOB") {
        SemanticType::Binary
    } else if upper.contains("REAL")
        || upper.contains("FLOA")
        || upper.contains("DOUB")
        || upper.contains("DECIMAL")
        || upper.contains("NUMERIC")
    {
        SemanticType::Float
    } else {
        SemanticType::Unknown
    }
}
