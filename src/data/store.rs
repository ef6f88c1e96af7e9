use std::collections::BTreeMap;

use crate::error::{MaskError, Result};

// ---------------------------------------------------------------------------
// Array – a dataset read from the hierarchical file
// ---------------------------------------------------------------------------

/// A dynamically-typed dataset value, mirroring what an HDF5/netCDF
/// variable can hold for the fields this tool reads.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    Scalar(f64),
    Float(Vec<f64>),
    Int(Vec<i64>),
    Text(Vec<String>),
    /// Variable-length rows (netCDF `vlen`), possibly nested.
    Ragged(Vec<Array>),
}

impl Array {
    /// Number of top-level elements.
    pub fn len(&self) -> usize {
        match self {
            Array::Scalar(_) => 1,
            Array::Float(v) => v.len(),
            Array::Int(v) => v.len(),
            Array::Text(v) => v.len(),
            Array::Ragged(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> &'static str {
        match self {
            Array::Scalar(_) => "scalar",
            Array::Float(_) => "float array",
            Array::Int(_) => "integer array",
            Array::Text(_) => "string array",
            Array::Ragged(_) => "ragged array",
        }
    }

    /// Interpret as a flat numeric array.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        match self {
            Array::Scalar(v) => Ok(vec![*v]),
            Array::Float(v) => Ok(v.clone()),
            Array::Int(v) => Ok(v.iter().map(|&i| i as f64).collect()),
            other => Err(MaskError::Store(format!(
                "expected numbers, found {}",
                other.kind()
            ))),
        }
    }

    /// Interpret as a flat integer array. Floats are accepted when integral.
    pub fn to_i64_vec(&self) -> Result<Vec<i64>> {
        match self {
            Array::Int(v) => Ok(v.clone()),
            Array::Float(v) => v
                .iter()
                .map(|&f| {
                    if f.fract() == 0.0 {
                        Ok(f as i64)
                    } else {
                        Err(MaskError::Store(format!("expected integers, found {f}")))
                    }
                })
                .collect(),
            other => Err(MaskError::Store(format!(
                "expected integers, found {}",
                other.kind()
            ))),
        }
    }

    pub fn to_string_vec(&self) -> Result<Vec<String>> {
        match self {
            Array::Text(v) => Ok(v.clone()),
            other => Err(MaskError::Store(format!(
                "expected strings, found {}",
                other.kind()
            ))),
        }
    }

    /// Interpret as a single number.
    pub fn to_scalar(&self) -> Result<f64> {
        match self {
            Array::Scalar(v) => Ok(*v),
            Array::Float(v) if v.len() == 1 => Ok(v[0]),
            Array::Int(v) if v.len() == 1 => Ok(v[0] as f64),
            other => Err(MaskError::Store(format!(
                "expected a scalar, found {} of length {}",
                other.kind(),
                other.len()
            ))),
        }
    }

    /// Rows of a ragged array. A flat array yields no rows when empty,
    /// which is how an empty vlen dataset comes back.
    pub fn rows(&self) -> Result<&[Array]> {
        match self {
            Array::Ragged(rows) => Ok(rows),
            other if other.is_empty() => Ok(&[]),
            other => Err(MaskError::Store(format!(
                "expected a ragged array, found {}",
                other.kind()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Enumeration table attached to a field
// ---------------------------------------------------------------------------

/// Label → code mapping, in the direction the file stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EnumTable(pub BTreeMap<String, i64>);

impl EnumTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        EnumTable(entries.into_iter().map(|(l, c)| (l.into(), c)).collect())
    }
}

// ---------------------------------------------------------------------------
// Store – read access to the hierarchical file
// ---------------------------------------------------------------------------

/// Read-only view of a hierarchical data file as arrays keyed by path
/// (`"Interpretation/v1/mask_times"`).
pub trait Store {
    fn array(&self, path: &str) -> Result<Array>;

    /// A string attribute of the dataset at `path`.
    fn attr(&self, path: &str, name: &str) -> Result<String>;

    /// The enumeration table attached to an enum-typed dataset.
    fn enum_table(&self, path: &str) -> Result<EnumTable>;
}

/// One dataset with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub data: Array,
    pub attrs: BTreeMap<String, String>,
    pub enum_table: Option<EnumTable>,
}

impl Variable {
    pub fn new(data: Array) -> Self {
        Variable {
            data,
            attrs: BTreeMap::new(),
            enum_table: None,
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_enum(mut self, table: EnumTable) -> Self {
        self.enum_table = Some(table);
        self
    }
}

/// A store held entirely in memory. Backs the JSON loader and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    variables: BTreeMap<String, Variable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, variable: Variable) {
        self.variables.insert(path.into(), variable);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, path: impl Into<String>, variable: Variable) -> Self {
        self.insert(path, variable);
        self
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    fn variable(&self, path: &str) -> Result<&Variable> {
        self.variables
            .get(path)
            .ok_or_else(|| MaskError::Store(format!("no dataset at '{path}'")))
    }
}

impl Store for MemoryStore {
    fn array(&self, path: &str) -> Result<Array> {
        Ok(self.variable(path)?.data.clone())
    }

    fn attr(&self, path: &str, name: &str) -> Result<String> {
        self.variable(path)?
            .attrs
            .get(name)
            .cloned()
            .ok_or_else(|| MaskError::Store(format!("'{path}' has no attribute '{name}'")))
    }

    fn enum_table(&self, path: &str) -> Result<EnumTable> {
        self.variable(path)?
            .enum_table
            .clone()
            .ok_or_else(|| MaskError::Store(format!("'{path}' is not an enumerated dataset")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with(
                "g/depths",
                Variable::new(Array::Float(vec![1.0, 2.5])).with_attr("units", "m"),
            )
            .with(
                "g/type",
                Variable::new(Array::Int(vec![0, 1]))
                    .with_enum(EnumTable::new([("TRACKING", 0), ("EXCLUDE", 1)])),
            )
    }

    #[test]
    fn reads_arrays_attrs_and_enums() {
        let s = store();
        assert_eq!(s.array("g/depths").unwrap(), Array::Float(vec![1.0, 2.5]));
        assert_eq!(s.attr("g/depths", "units").unwrap(), "m");
        assert_eq!(s.enum_table("g/type").unwrap().0.get("EXCLUDE"), Some(&1));
    }

    #[test]
    fn missing_entries_are_store_errors() {
        let s = store();
        assert!(matches!(s.array("g/nope"), Err(MaskError::Store(_))));
        assert!(matches!(s.attr("g/depths", "calendar"), Err(MaskError::Store(_))));
        assert!(matches!(s.enum_table("g/depths"), Err(MaskError::Store(_))));
    }

    #[test]
    fn integral_floats_convert_to_integers() {
        assert_eq!(Array::Float(vec![3.0, 4.0]).to_i64_vec().unwrap(), vec![3, 4]);
        assert!(Array::Float(vec![3.5]).to_i64_vec().is_err());
    }

    #[test]
    fn empty_flat_array_has_no_rows() {
        assert!(Array::Float(vec![]).rows().unwrap().is_empty());
        assert!(Array::Float(vec![1.0]).rows().is_err());
    }

    #[test]
    fn scalar_accepts_single_element_arrays() {
        assert_eq!(Array::Int(vec![1500]).to_scalar().unwrap(), 1500.0);
        assert!(Array::Float(vec![1.0, 2.0]).to_scalar().is_err());
    }
}
