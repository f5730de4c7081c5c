//! Data module - CSV loading, unit normalization and filtering
//!
//! ```text
//!  day.csv / hour.csv
//!        │ loader      → RawFrame (fractions)
//!        │ processor   → NormalizedFrame → typed records
//!        │ cache       → Datasets, loaded once
//!        ▼
//!   filter (FilterSpec) → filtered copies per view
//! ```

pub mod cache;
pub mod filter;
pub mod loader;
pub mod model;
pub mod processor;
pub mod schema;

pub use cache::{DatasetCache, DatasetPaths};
pub use filter::{filter_records, Bounds, FilterError, FilterSpec};
pub use loader::{DataLoader, LoaderError, RawFrame};
pub use model::{Conditions, DailyRecord, Datasets, HourlyRecord, RentalRecord};
pub use processor::{DataProcessor, NormalizedFrame, ProcessorError};
pub use schema::{DayType, Granularity, Season, UsageTier, WeatherSituation};
