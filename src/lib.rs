//! ncgeo: georeferenced rasters from NetCDF gridded data
//!
//! This library inspects CF-style NetCDF metadata (grid mappings, coordinate
//! variables, packing attributes) and turns a chosen variable into a
//! single-band GeoTIFF with a spatial reference, an affine geotransform and a
//! no-data value, ready to hand to a GIS layer registry.

pub mod types;
pub mod io;
pub mod core;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{AttributeValue, Attributes, DataKind, ErrorKind, GeoTransform, NcGeoError, NcGeoResult};

pub use io::{GriddedDataset, MemoryDataset, MemoryVariable, RasterLayer};
#[cfg(feature = "netcdf")]
pub use io::NetcdfDataset;

pub use crate::core::{
    LayerHandoff, LayerRegistry, MetadataReport, ProjectionDescriptor, VisualizeOptions, VisualizeOutcome, Visualizer,
};
