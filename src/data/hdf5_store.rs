//! netCDF4/HDF5 backend for [`Store`]. Built with the `hdf5` feature, which
//! links against the system HDF5 library.

use std::collections::BTreeMap;
use std::path::Path;

use hdf5::types::{
    FixedAscii, FixedUnicode, FloatSize, H5Type, TypeDescriptor, VarLenArray, VarLenAscii,
    VarLenUnicode,
};
use hdf5::{Attribute, Container, Dataset, File};

use crate::error::{MaskError, Result};

use super::store::{Array, EnumTable, Store};

/// Longest fixed-length string read back; HDF5 pads or truncates to it.
const FIXED_STRING_LEN: usize = 1024;

fn store_err(path: &str, e: impl std::fmt::Display) -> MaskError {
    MaskError::Store(format!("{path}: {e}"))
}

/// An open survey file. Datasets are read on demand by path.
pub struct Hdf5Store {
    file: File,
}

impl Hdf5Store {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| store_err(&path.display().to_string(), e))?;
        Ok(Hdf5Store { file })
    }

    fn dataset(&self, path: &str) -> Result<Dataset> {
        self.file.dataset(path).map_err(|e| store_err(path, e))
    }
}

impl Store for Hdf5Store {
    fn array(&self, path: &str) -> Result<Array> {
        let ds = self.dataset(path)?;
        read_array(&ds, path)
    }

    fn attr(&self, path: &str, name: &str) -> Result<String> {
        let ds = self.dataset(path)?;
        let attr: Attribute = ds
            .attr(name)
            .map_err(|e| store_err(&format!("{path}@{name}"), e))?;
        read_text_scalar(&attr, &format!("{path}@{name}"))
    }

    fn enum_table(&self, path: &str) -> Result<EnumTable> {
        match descriptor(&self.dataset(path)?, path)? {
            TypeDescriptor::Enum(e) => Ok(EnumTable(
                e.members
                    .into_iter()
                    .map(|m| (m.name, enum_value(m.value, e.signed)))
                    .collect::<BTreeMap<_, _>>(),
            )),
            other => Err(store_err(path, format!("not an enum dataset ({other:?})"))),
        }
    }
}

/// Enum member values come back as raw `u64` bits.
fn enum_value(bits: u64, signed: bool) -> i64 {
    if signed {
        bits as i64
    } else {
        i64::try_from(bits).unwrap_or(i64::MAX)
    }
}

fn descriptor(container: &Container, path: &str) -> Result<TypeDescriptor> {
    container
        .dtype()
        .and_then(|t| t.to_descriptor())
        .map_err(|e| store_err(path, e))
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

fn read_array(ds: &Dataset, path: &str) -> Result<Array> {
    let err = |e: hdf5::Error| store_err(path, e);
    let desc = descriptor(ds, path)?;

    if ds.ndim() == 0 {
        return match desc {
            TypeDescriptor::Integer(_)
            | TypeDescriptor::Unsigned(_)
            | TypeDescriptor::Float(_)
            | TypeDescriptor::Enum(_) => ds.read_scalar::<f64>().map(Array::Scalar).map_err(err),
            other => Err(store_err(path, format!("unsupported scalar type {other:?}"))),
        };
    }

    match desc {
        // Enum codes convert to their integer base type on read.
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) | TypeDescriptor::Enum(_) => {
            ds.read_raw::<i64>().map(Array::Int).map_err(err)
        }
        TypeDescriptor::Float(_) => ds.read_raw::<f64>().map(Array::Float).map_err(err),
        TypeDescriptor::VarLenArray(inner) => read_ragged(ds, &inner, path),
        TypeDescriptor::VarLenUnicode
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_) => read_text(ds, path).map(Array::Text),
        other => Err(store_err(path, format!("unsupported dataset type {other:?}"))),
    }
}

/// One vlen level (`mask_times`) or two (`mask_depths`).
fn read_ragged(ds: &Dataset, inner: &TypeDescriptor, path: &str) -> Result<Array> {
    let err = |e: hdf5::Error| store_err(path, e);
    match inner {
        TypeDescriptor::VarLenArray(_) => {
            let regions = ds.read_raw::<VarLenArray<PingSeq>>().map_err(err)?;
            Ok(Array::Ragged(
                regions
                    .iter()
                    .map(|pings| {
                        Array::Ragged(
                            pings
                                .iter()
                                .map(|&ping| Array::Float(ping.into_owned().to_vec()))
                                .collect(),
                        )
                    })
                    .collect(),
            ))
        }
        TypeDescriptor::Integer(_)
        | TypeDescriptor::Unsigned(_)
        | TypeDescriptor::Float(_) => {
            let rows = ds.read_raw::<VarLenArray<f64>>().map_err(err)?;
            Ok(Array::Ragged(
                rows.iter().map(|row| Array::Float(row.to_vec())).collect(),
            ))
        }
        other => Err(store_err(path, format!("unsupported vlen element type {other:?}"))),
    }
}

/// In-memory layout of an inner `float64` vlen sequence (`hvl_t`).
///
/// `VarLenArray` cannot nest because it is not `Copy`, so the outer level
/// holds these and each is turned into an owning `VarLenArray` once read.
#[repr(C)]
#[derive(Clone, Copy)]
struct PingSeq {
    len: usize,
    ptr: *const f64,
}

unsafe impl H5Type for PingSeq {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::VarLenArray(Box::new(TypeDescriptor::Float(FloatSize::U8)))
    }
}

impl PingSeq {
    /// Take ownership of the buffer HDF5 allocated for this sequence.
    ///
    /// Must be called exactly once per sequence; the returned array frees
    /// the buffer when dropped.
    fn into_owned(self) -> VarLenArray<f64> {
        // SAFETY: `PingSeq` and `VarLenArray<f64>` are both `repr(C)`
        // `{ len: usize, ptr: *const f64 }` (plus a zero-sized marker), and
        // the buffer was allocated by the HDF5 library during the read.
        unsafe { std::mem::transmute::<PingSeq, VarLenArray<f64>>(self) }
    }
}

fn read_text(ds: &Dataset, path: &str) -> Result<Vec<String>> {
    let err = |e: hdf5::Error| store_err(path, e);
    match descriptor(ds, path)? {
        TypeDescriptor::VarLenUnicode => Ok(ds
            .read_raw::<VarLenUnicode>()
            .map_err(err)?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect()),
        TypeDescriptor::VarLenAscii => Ok(ds
            .read_raw::<VarLenAscii>()
            .map_err(err)?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect()),
        TypeDescriptor::FixedAscii(_) => Ok(ds
            .read_raw::<FixedAscii<FIXED_STRING_LEN>>()
            .map_err(err)?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect()),
        TypeDescriptor::FixedUnicode(_) => Ok(ds
            .read_raw::<FixedUnicode<FIXED_STRING_LEN>>()
            .map_err(err)?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect()),
        other => Err(store_err(path, format!("expected strings, found {other:?}"))),
    }
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// netCDF writes text attributes as fixed-length ASCII; other tools use
/// variable-length strings.
fn read_text_scalar(attr: &Attribute, path: &str) -> Result<String> {
    let err = |e: hdf5::Error| store_err(path, e);
    let text = match descriptor(attr, path)? {
        TypeDescriptor::VarLenUnicode => attr.read_scalar::<VarLenUnicode>().map_err(err)?.as_str().to_string(),
        TypeDescriptor::VarLenAscii => attr.read_scalar::<VarLenAscii>().map_err(err)?.as_str().to_string(),
        TypeDescriptor::FixedAscii(_) => attr
            .read_scalar::<FixedAscii<FIXED_STRING_LEN>>()
            .map_err(err)?
            .as_str()
            .to_string(),
        TypeDescriptor::FixedUnicode(_) => attr
            .read_scalar::<FixedUnicode<FIXED_STRING_LEN>>()
            .map_err(err)?
            .as_str()
            .to_string(),
        other => return Err(store_err(path, format!("expected a string attribute, found {other:?}"))),
    };
    Ok(text)
}
