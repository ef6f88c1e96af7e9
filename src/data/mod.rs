/// Data layer: store access, decoded types and region decoding.
///
/// Architecture:
/// ```text
///  .nc / .h5 file          .json export of Interpretation/v1
///        │                        │
///        └───────────┬────────────┘
///        ▼
///   ┌──────────┐
///   │  loader   │  Hdf5Store or MemoryStore (impl Store)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ decoder   │  invert enum table, zip per-region arrays → Survey
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Survey   │  Vec<Region>, units, sound speed
///   └──────────┘
/// ```

pub mod decoder;
#[cfg(feature = "hdf5")]
pub mod hdf5_store;
pub mod loader;
pub mod model;
pub mod store;
