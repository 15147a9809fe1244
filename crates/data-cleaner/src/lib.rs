//! Crop Record Cleaning
//!
//! Turns raw, inconsistently formatted production records into the canonical
//! analytic table (county, crop, year, area, production, yield).

mod cleaner;
mod config;
mod error;
mod record;
mod table;

pub use cleaner::{clean, clean_path, Cleaner, CleaningReport};
pub use config::CleaningConfig;
pub use error::CleaningError;
pub use record::{CanonicalRecord, CanonicalTable};
pub use table::RawTable;

/// Canonical column names
pub mod columns {
    pub const COUNTY: &str = "county";
    pub const CROP: &str = "crop";
    pub const YEAR: &str = "year";
    pub const AREA_HA: &str = "area_ha";
    pub const PRODUCTION_TONS: &str = "production_tons";
    pub const YIELD_TON_PER_HA: &str = "yield_ton_per_ha";
    pub const PRODUCTION_SYSTEM: &str = "crop_production_system";
    pub const COUNTRY: &str = "country";

    /// Fields every canonical record must carry
    pub const CRITICAL: [&str; 5] = [YEAR, AREA_HA, PRODUCTION_TONS, CROP, COUNTY];
}
