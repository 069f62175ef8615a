/// Data layer: scan datasets, experiment records, preprocessing, loading.
///
/// Architecture:
/// ```text
///  .json / .csv / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → ScanSource (raw matrix or experiment record)
///   └──────────┘
///        │  + sweep AccessorPath
///        ▼
///   ┌─────────────┐
///   │ ScanDataset │  x, y (ascending), data rows
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ process   │  unit conversion, cosmic rays, shift correction
///   └──────────┘
/// ```

pub mod experiment;
pub mod loader;
pub mod model;
pub mod process;
