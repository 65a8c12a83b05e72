//! Dataset access and raster persistence

pub mod dataset;
pub mod memory;
#[cfg(feature = "netcdf")]
pub mod netcdf_reader;
pub mod raster_writer;

pub use dataset::{Dimension, GriddedDataset, VariableInfo};
pub use memory::{MemoryDataset, MemoryVariable};
#[cfg(feature = "netcdf")]
pub use netcdf_reader::NetcdfDataset;
pub use raster_writer::{write_raster, BandStatistics, RasterLayer, RasterWriteRequest, WrittenRaster};
