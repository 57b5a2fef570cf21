//! Output formats for campaign results

pub mod csv_export;
pub mod json_export;
pub mod manifest;

pub use csv_export::CsvExporter;
pub use json_export::JsonExporter;
pub use manifest::CampaignManifest;
