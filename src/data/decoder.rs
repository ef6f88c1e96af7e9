use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::error::{MaskError, Result};

use super::model::{
    BoundingBox, CategoryAssignment, MaskGeometry, Region, SoundSpeed, Survey, Units,
};
use super::store::{Array, EnumTable, Store};

/// Group holding the interpretation datasets.
pub const INTERPRETATION_GROUP: &str = "Interpretation/v1";

// ---------------------------------------------------------------------------
// Region type names – inverted enumeration table
// ---------------------------------------------------------------------------

/// Code → label lookup built by inverting a field's enumeration table.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeNames(HashMap<i64, String>);

impl TypeNames {
    /// Invert a label → code table. When two labels share a code the one
    /// sorting last wins.
    pub fn invert(table: &EnumTable) -> Self {
        TypeNames(
            table
                .0
                .iter()
                .map(|(label, &code)| (code, label.clone()))
                .collect(),
        )
    }

    pub fn resolve(&self, code: i64) -> Result<&str> {
        self.0
            .get(&code)
            .map(String::as_str)
            .ok_or_else(|| MaskError::Decode(format!("region type code {code} has no label")))
    }

    /// Resolve every code, preserving order.
    pub fn resolve_all(&self, codes: &[i64]) -> Result<Vec<String>> {
        codes
            .iter()
            .map(|&c| self.resolve(c).map(str::to_string))
            .collect()
    }
}

/// Inverted tables, keyed by the enumeration definition they came from.
/// Each distinct table is inverted once.
#[derive(Debug, Default)]
pub struct TypeNameCache {
    tables: HashMap<EnumTable, Rc<TypeNames>>,
}

impl TypeNameCache {
    pub fn get(&mut self, table: EnumTable) -> Rc<TypeNames> {
        self.tables
            .entry(table)
            .or_insert_with_key(|t| Rc::new(TypeNames::invert(t)))
            .clone()
    }

    /// Number of distinct tables inverted so far.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Category diagnostics
// ---------------------------------------------------------------------------

/// One row of the flat `region_category_*` arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRow {
    pub region_id: i64,
    pub name: String,
    pub proportion: f64,
}

impl fmt::Display for CategoryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Region {} has category \"{}\" with proportion {}",
            self.region_id, self.name, self.proportion
        )
    }
}

// ---------------------------------------------------------------------------
// RegionDecoder
// ---------------------------------------------------------------------------

/// Reads the interpretation group of a store into a [`Survey`].
#[derive(Debug)]
pub struct RegionDecoder {
    group: String,
    type_names: TypeNameCache,
}

impl Default for RegionDecoder {
    fn default() -> Self {
        Self::with_group(INTERPRETATION_GROUP)
    }
}

impl RegionDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(group: &str) -> Self {
        RegionDecoder {
            group: group.trim_end_matches('/').to_string(),
            type_names: TypeNameCache::default(),
        }
    }

    /// Inverted enumeration tables seen so far.
    pub fn type_name_cache(&self) -> &TypeNameCache {
        &self.type_names
    }

    fn path(&self, name: &str) -> String {
        format!("{}/{name}", self.group)
    }

    /// Read a dataset and convert it, reporting conversion failures as
    /// decode errors naming the field.
    fn field<T>(
        &self,
        store: &dyn Store,
        name: &str,
        convert: impl FnOnce(&Array) -> Result<T>,
    ) -> Result<T> {
        let array = store.array(&self.path(name))?;
        convert(&array).map_err(|e| MaskError::Decode(format!("{name}: {e}")))
    }

    fn attr(&self, store: &dyn Store, name: &str, attr: &str) -> Result<String> {
        store.attr(&self.path(name), attr)
    }

    /// Decode every region of the group.
    ///
    /// Prints one diagnostic line per category assignment to stdout as a
    /// side effect, before any mask data is inspected downstream.
    pub fn decode(&mut self, store: &dyn Store, source: &Path) -> Result<Survey> {
        let ids = self.field(store, "region_id", Array::to_i64_vec)?;
        let names = self.field(store, "region_name", Array::to_string_vec)?;
        let codes = self.field(store, "region_type", Array::to_i64_vec)?;

        let table = store.enum_table(&self.path("region_type"))?;
        let type_names = self.type_names.get(table).resolve_all(&codes)?;

        let min_depth = self.field(store, "min_depth", Array::to_f64_vec)?;
        let max_depth = self.field(store, "max_depth", Array::to_f64_vec)?;
        let start_time = self.field(store, "start_time", Array::to_f64_vec)?;
        let end_time = self.field(store, "end_time", Array::to_f64_vec)?;

        let times = self.field(store, "mask_times", decode_time_rows)?;
        let depths = self.field(store, "mask_depths", decode_depth_rows)?;

        let n = ids.len();
        for (field, len) in [
            ("region_name", names.len()),
            ("region_type", codes.len()),
            ("min_depth", min_depth.len()),
            ("max_depth", max_depth.len()),
            ("start_time", start_time.len()),
            ("end_time", end_time.len()),
            ("mask_times", times.len()),
            ("mask_depths", depths.len()),
        ] {
            if len != n {
                return Err(MaskError::Decode(format!(
                    "{field} has {len} entries but there are {n} regions"
                )));
            }
        }

        let rows = self.category_rows(store)?;
        for row in &rows {
            println!("{row}");
        }

        let mut regions: Vec<Region> = ids
            .iter()
            .zip(names)
            .zip(codes.iter().zip(type_names))
            .zip(times.into_iter().zip(depths))
            .enumerate()
            .map(|(i, (((&id, name), (&type_code, type_name)), (times, depths)))| Region {
                id,
                name,
                type_code,
                type_name,
                categories: Vec::new(),
                bounding_box: BoundingBox {
                    min_depth: min_depth[i],
                    max_depth: max_depth[i],
                    start_time: start_time[i],
                    end_time: end_time[i],
                },
                mask: MaskGeometry { times, depths },
            })
            .collect();

        for row in rows {
            match regions.iter_mut().find(|r| r.id == row.region_id) {
                Some(region) => region.categories.push(CategoryAssignment {
                    category_name: row.name,
                    proportion: row.proportion,
                }),
                None => log::warn!(
                    "category \"{}\" refers to unknown region {}",
                    row.name,
                    row.region_id
                ),
            }
        }

        let units = Units {
            depth: self.attr(store, "mask_depths", "units")?,
            time: self.attr(store, "mask_times", "units")?,
            calendar: self.attr(store, "mask_times", "calendar")?,
        };
        let sound_speed = SoundSpeed {
            value: self.field(store, "sound_speed", Array::to_scalar)?,
            units: self.attr(store, "sound_speed", "units")?,
        };

        log::info!(
            "Decoded {} regions ({} mask pings) from {}",
            regions.len(),
            regions.iter().map(|r| r.mask.len()).sum::<usize>(),
            source.display()
        );

        Ok(Survey {
            source: source.to_path_buf(),
            regions,
            units,
            sound_speed,
        })
    }

    fn category_rows(&self, store: &dyn Store) -> Result<Vec<CategoryRow>> {
        let ids = self.field(store, "region_category_ids", Array::to_i64_vec)?;
        let names = self.field(store, "region_category_names", Array::to_string_vec)?;
        let props = self.field(store, "region_category_proportions", Array::to_f64_vec)?;

        if ids.len() != names.len() || ids.len() != props.len() {
            return Err(MaskError::Decode(format!(
                "category arrays disagree: {} ids, {} names, {} proportions",
                ids.len(),
                names.len(),
                props.len()
            )));
        }

        Ok(ids
            .into_iter()
            .zip(names)
            .zip(props)
            .map(|((region_id, name), proportion)| CategoryRow {
                region_id,
                name,
                proportion,
            })
            .collect())
    }
}

// -- Ragged mask helpers --

fn decode_time_rows(array: &Array) -> Result<Vec<Vec<f64>>> {
    array
        .rows()?
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.to_f64_vec()
                .map_err(|e| MaskError::Decode(format!("region {i}: {e}")))
        })
        .collect()
}

fn decode_depth_rows(array: &Array) -> Result<Vec<Vec<Vec<f64>>>> {
    array
        .rows()?
        .iter()
        .enumerate()
        .map(|(i, region)| -> Result<Vec<Vec<f64>>> {
            region
                .rows()?
                .iter()
                .enumerate()
                .map(|(p, ping)| {
                    ping.to_f64_vec()
                        .map_err(|e| MaskError::Decode(format!("region {i}, ping {p}: {e}")))
                })
                .collect()
        })
        .collect()
}
