use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value as JsonValue};

use super::store::{Array, EnumTable, MemoryStore, Store, Variable};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Open an interpretation file as a [`Store`]. Dispatch by extension.
///
/// Supported formats:
/// * `.nc`, `.h5`, `.hdf5` – the survey file itself (needs the `hdf5` feature)
/// * `.json` – a JSON export of the file's groups (see [`load_json`])
pub fn load_store(path: &Path) -> Result<Box<dyn Store>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => Ok(Box::new(load_json(path)?)),
        "nc" | "h5" | "hdf5" => load_hdf5(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

#[cfg(feature = "hdf5")]
fn load_hdf5(path: &Path) -> Result<Box<dyn Store>> {
    let store = super::hdf5_store::Hdf5Store::open(path)?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "hdf5"))]
fn load_hdf5(path: &Path) -> Result<Box<dyn Store>> {
    bail!(
        "{}: built without HDF5 support; rebuild with `--features hdf5` or pass a JSON export",
        path.display()
    )
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON layout: groups are objects, datasets are objects with a
/// `data` key. Group names may already contain slashes.
///
/// ```json
/// {
///   "Interpretation/v1": {
///     "mask_times":  { "data": [[100000, 200000]],
///                      "attrs": { "units": "milliseconds since 1601-01-01", "calendar": "gregorian" } },
///     "region_type": { "data": [0], "enum": { "TRACKING": 0, "EXCLUDE": 1 } },
///     ...
///   }
/// }
/// ```
pub fn load_json(path: &Path) -> Result<MemoryStore> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

/// Parse the JSON layout described on [`load_json`].
pub fn parse_json(text: &str) -> Result<MemoryStore> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let obj = root
        .as_object()
        .context("Expected top-level JSON object")?;

    let mut store = MemoryStore::new();
    walk_group(obj, "", &mut store)?;
    Ok(store)
}

fn walk_group(obj: &Map<String, JsonValue>, prefix: &str, store: &mut MemoryStore) -> Result<()> {
    for (name, node) in obj {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        let node = node
            .as_object()
            .with_context(|| format!("'{path}' is neither a group nor a dataset"))?;

        if node.contains_key("data") {
            let variable =
                json_to_variable(node).with_context(|| format!("reading dataset '{path}'"))?;
            store.insert(path, variable);
        } else {
            walk_group(node, &path, store)?;
        }
    }
    Ok(())
}

fn json_to_variable(node: &Map<String, JsonValue>) -> Result<Variable> {
    let data = json_to_array(&node["data"])?;

    let mut attrs = BTreeMap::new();
    if let Some(raw) = node.get("attrs") {
        let raw = raw.as_object().context("'attrs' must be an object")?;
        for (key, val) in raw {
            let text = match val {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            attrs.insert(key.clone(), text);
        }
    }

    let enum_table = match node.get("enum") {
        Some(raw) => Some(json_to_enum(raw)?),
        None => None,
    };

    Ok(Variable {
        data,
        attrs,
        enum_table,
    })
}

fn json_to_enum(val: &JsonValue) -> Result<EnumTable> {
    let obj = val.as_object().context("'enum' must be an object")?;
    let mut table = BTreeMap::new();
    for (label, code) in obj {
        let code = code
            .as_i64()
            .with_context(|| format!("enum label '{label}' has a non-integer code"))?;
        table.insert(label.clone(), code);
    }
    Ok(EnumTable(table))
}

fn json_to_array(val: &JsonValue) -> Result<Array> {
    match val {
        JsonValue::Number(n) => n
            .as_f64()
            .map(Array::Scalar)
            .context("number out of range"),
        JsonValue::Array(items) => json_items_to_array(items),
        other => bail!("unsupported dataset value: {other}"),
    }
}

fn json_items_to_array(items: &[JsonValue]) -> Result<Array> {
    if items.is_empty() {
        return Ok(Array::Float(Vec::new()));
    }

    if items.iter().all(JsonValue::is_array) {
        return items
            .iter()
            .map(json_to_array)
            .collect::<Result<Vec<_>>>()
            .map(Array::Ragged);
    }

    if items.iter().all(JsonValue::is_string) {
        return Ok(Array::Text(
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        ));
    }

    if items.iter().all(|v| v.is_i64()) {
        return Ok(Array::Int(items.iter().filter_map(JsonValue::as_i64).collect()));
    }

    items
        .iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("element [{j}]: not a number"))
        })
        .collect::<Result<Vec<_>>>()
        .map(Array::Float)
}
