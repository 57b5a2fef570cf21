//! Visualization and plotting

pub mod comparative;
pub mod options;

pub use comparative::{ComparativePlotBuilder, SeriesData};
pub use options::{LegendPlacement, PlotOptions, XScale};
