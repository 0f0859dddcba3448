/// Data layer: core table types and loading.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  decode + parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset  │  Vec<Column>, each a typed Vec<CellValue>
///   └──────────┘
/// ```
///
/// Downstream stages only read the dataset; each builds its own numeric
/// projection of the columns it needs.

pub mod loader;
pub mod model;
