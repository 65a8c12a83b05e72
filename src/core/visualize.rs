//! Visualize pipeline: one variable in, one georeferenced GeoTIFF out.
//!
//! Projection classification and coordinate resolution are independent; the
//! geotransform combines the coordinates with the satellite convention; the
//! normalized grid is written together with both and the finalized file is
//! reopened and validated before it is handed to the host's layer registry.

use crate::core::coordinates::resolve_coordinates;
use crate::core::geotransform::{build_georeference, GridGeoreference, DEFAULT_SATELLITE_HEIGHT};
use crate::core::normalize::{default_slab, normalize_variable, NormalizedGrid, DEFAULT_FILL_VALUE};
use crate::core::projection::{classify_projection, ProjectionDescriptor};
use crate::io::raster_writer::{write_raster, BandStatistics, RasterLayer, RasterWriteRequest};
use crate::io::{GriddedDataset, VariableInfo};
use crate::types::{NcGeoError, NcGeoResult};
use gdal::spatial_ref::SpatialRef;
use log::Level;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizeOptions {
    /// Directory for output rasters; the system temp dir when `None`
    pub output_dir: Option<PathBuf>,
    pub file_prefix: String,
    /// GTiff creation options
    pub creation_options: Vec<(String, String)>,
    pub default_fill_value: f64,
    pub default_satellite_height: f64,
    pub compute_statistics: bool,
    /// Reverse storage rows when y is ascending so row 0 is the top row
    pub north_up: bool,
}

impl Default for VisualizeOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            file_prefix: "ncgeo_".to_string(),
            creation_options: vec![
                ("COMPRESS".to_string(), "LZW".to_string()),
                ("TILED".to_string(), "YES".to_string()),
            ],
            default_fill_value: DEFAULT_FILL_VALUE,
            default_satellite_height: DEFAULT_SATELLITE_HEIGHT,
            compute_statistics: true,
            north_up: true,
        }
    }
}

/// Receiver for request-level diagnostics
pub trait DiagnosticSink {
    fn record(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.record(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.record(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.record(Level::Error, message);
    }
}

/// Forwards diagnostics to the `log` facade under target `ncgeo`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&self, level: Level, message: &str) {
        log::log!(target: "ncgeo", level, "{}", message);
    }
}

/// Keeps diagnostics in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Level, String)> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.records().iter().any(|(_, message)| message.contains(needle))
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, level: Level, message: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push((level, message.to_string()));
        }
    }
}

/// Host-side registry that displays finished rasters
pub trait LayerRegistry {
    /// Register a valid layer; `Err` carries the host's reason
    fn add_raster_layer(&mut self, layer: &RasterLayer) -> Result<(), String>;
}

/// What the host needs to register a finished raster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerHandoff {
    pub path: PathBuf,
    pub display_name: String,
    pub valid: bool,
    pub summary: Option<String>,
}

/// Result of rendering one variable
#[derive(Debug, Clone)]
pub struct VisualizeOutcome {
    pub variable: String,
    pub layer: RasterLayer,
    pub grid_mapping: Option<String>,
    pub projection: Option<ProjectionDescriptor>,
    pub georeference: Option<GridGeoreference>,
    pub statistics: Option<BandStatistics>,
    pub nodata: f32,
    pub rows_flipped: bool,
}

impl VisualizeOutcome {
    pub fn handoff(&self) -> LayerHandoff {
        LayerHandoff {
            path: self.layer.path.clone(),
            display_name: self.layer.name.clone(),
            valid: self.layer.is_valid(),
            summary: self.layer.error.clone(),
        }
    }

    pub fn is_georeferenced(&self) -> bool {
        self.georeference.is_some()
    }
}

/// Display name used for a rendered variable
pub fn display_name(variable: &str, source: &str) -> String {
    format!("{} from {}", variable, source)
}

/// Fresh, persistent, uniquely named `.tif` path
pub fn unique_output_path(options: &VisualizeOptions) -> NcGeoResult<PathBuf> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(&options.file_prefix).suffix(".tif");
    let file = match &options.output_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    let path = file.into_temp_path().keep().map_err(|e| NcGeoError::Io(e.error))?;
    Ok(path)
}

/// Reopen a finalized raster and check it holds exactly `grid`
pub fn open_layer(path: &Path, name: &str, grid: &NormalizedGrid) -> RasterLayer {
    RasterLayer::open(path, name, (grid.columns(), grid.rows()))
}

/// Runs visualize requests against one dataset
pub struct Visualizer<'a> {
    dataset: &'a dyn GriddedDataset,
    options: VisualizeOptions,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> Visualizer<'a> {
    pub fn new(dataset: &'a dyn GriddedDataset, options: VisualizeOptions, sink: &'a dyn DiagnosticSink) -> Self {
        Self { dataset, options, sink }
    }

    pub fn options(&self) -> &VisualizeOptions {
        &self.options
    }

    /// Spatial reference from the dataset's grid mapping, if any
    fn resolve_projection(&self) -> (Option<String>, Option<ProjectionDescriptor>, Option<SpatialRef>) {
        let Some((mapping, descriptor)) = classify_projection(self.dataset) else {
            self.sink.info("No grid mapping variable found; raster will have no spatial reference");
            return (None, None, None);
        };

        let srs = match descriptor.to_spatial_ref() {
            Ok(Some(srs)) => {
                self.sink.info(&format!(
                    "Using projection from '{}': {:?}",
                    mapping.variable, descriptor
                ));
                Some(srs)
            }
            Ok(None) => {
                self.sink.warn(&format!(
                    "Grid mapping '{}' is not a recognized projection; spatial reference left unset",
                    mapping.variable
                ));
                None
            }
            Err(e) => {
                self.sink.warn(&format!(
                    "Could not build spatial reference from '{}': {}",
                    mapping.variable, e
                ));
                None
            }
        };

        (Some(mapping.variable), Some(descriptor), srs)
    }

    /// Geotransform from the variable's coordinates, if they can be resolved
    fn resolve_georeference(&self, variable: &VariableInfo, grid: &NormalizedGrid) -> Option<GridGeoreference> {
        let pair = match resolve_coordinates(self.dataset, variable) {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                self.sink.info(&format!(
                    "No coordinate variables found for '{}'; raster will not be georeferenced",
                    variable.name
                ));
                return None;
            }
            Err(e) => {
                self.sink.warn(&format!("Error getting geotransform: {}", e));
                return None;
            }
        };

        if pair.x.len() != grid.columns() || pair.y.len() != grid.rows() {
            self.sink.warn(&format!(
                "Coordinate lengths {}x{} do not match grid {}x{}",
                pair.x.len(),
                pair.y.len(),
                grid.columns(),
                grid.rows()
            ));
        }

        let georef = build_georeference(&pair, self.dataset, self.options.default_satellite_height)?;
        self.sink.info(&format!(
            "Coordinate details: x='{}' ascending={}, y='{}' ascending={}, satellite height={:?}, geotransform={:?}",
            georef.x_name,
            georef.x_ascending,
            georef.y_name,
            georef.y_ascending,
            georef.satellite_height,
            georef.transform.to_gdal()
        ));
        Some(georef)
    }

    /// Render `variable_name` to a new GeoTIFF and validate it.
    ///
    /// Missing projection or coordinates are reported through the sink and
    /// produce an un-georeferenced raster. An invalid finalized file is
    /// returned as an outcome with an invalid layer; see [`Self::visualize`]
    /// for the registering variant.
    pub fn render(&self, variable_name: &str) -> NcGeoResult<VisualizeOutcome> {
        let variable = self.dataset.require_variable(variable_name)?;
        self.sink.info(&format!(
            "Selected variable: {}, shape: {:?}, dtype: {}, dimensions: {:?}",
            variable.name, variable.shape, variable.kind, variable.dimensions
        ));

        if let Err(e) = default_slab(&variable) {
            self.sink.error(&e.to_string());
            return Err(e);
        }

        let mut grid = normalize_variable(self.dataset, &variable, self.options.default_fill_value)?;
        let (grid_mapping, projection, srs) = self.resolve_projection();
        let georeference = self.resolve_georeference(&variable, &grid);

        let rows_flipped = self.options.north_up
            && georeference.as_ref().map(GridGeoreference::needs_row_flip).unwrap_or(false);
        if rows_flipped {
            grid.flip_rows();
        }

        let path = unique_output_path(&self.options)?;
        self.sink.info(&format!("Creating output raster: {}", path.display()));

        let written = write_raster(
            &path,
            &RasterWriteRequest {
                grid: &grid,
                spatial_ref: srs.as_ref(),
                transform: georeference.as_ref().map(|g| &g.transform),
                creation_options: &self.options.creation_options,
                compute_statistics: self.options.compute_statistics,
            },
        )
        .map_err(|e| {
            self.sink.error(&e.to_string());
            e
        })?;

        let name = display_name(&variable.name, &self.dataset.source_name());
        let layer = open_layer(&written.path, &name, &grid);
        match &layer.error {
            None => self.sink.info(&format!("Created raster layer: {}", name)),
            Some(error) => self.sink.error(&format!("Layer is invalid. Error: {}", error)),
        }

        Ok(VisualizeOutcome {
            variable: variable.name,
            layer,
            grid_mapping,
            projection,
            georeference,
            statistics: written.statistics,
            nodata: grid.nodata,
            rows_flipped,
        })
    }

    /// Render and register with the host.
    ///
    /// Invalid layers are never registered and fail with `LayerInvalid`.
    pub fn visualize(&self, variable_name: &str, registry: &mut dyn LayerRegistry) -> NcGeoResult<VisualizeOutcome> {
        let outcome = self.render(variable_name)?;

        if let Some(error) = &outcome.layer.error {
            return Err(NcGeoError::LayerInvalid(error.clone()));
        }

        registry.add_raster_layer(&outcome.layer).map_err(|reason| {
            self.sink.error(&format!("Failed to create layer: {}", reason));
            NcGeoError::Registry(reason)
        })?;

        self.sink.info("Layer added successfully");
        Ok(outcome)
    }
}

/// Registry that just remembers what it was given
#[derive(Debug, Default)]
pub struct CollectingRegistry {
    pub layers: Vec<RasterLayer>,
}

impl LayerRegistry for CollectingRegistry {
    fn add_raster_layer(&mut self, layer: &RasterLayer) -> Result<(), String> {
        self.layers.push(layer.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = VisualizeOptions::default();
        assert_eq!(options.default_fill_value, -9999.0);
        assert_eq!(options.default_satellite_height, 35786023.0);
        assert!(options.creation_options.contains(&("TILED".to_string(), "YES".to_string())));
    }

    #[test]
    fn test_unique_paths() {
        let dir = tempfile::tempdir().unwrap();
        let options = VisualizeOptions {
            output_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let a = unique_output_path(&options).unwrap();
        let b = unique_output_path(&options).unwrap();
        assert_ne!(a, b);
        assert!(a.exists());
        assert_eq!(a.extension().unwrap(), "tif");
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        sink.warn("no coordinates");
        assert!(sink.contains("coordinates"));
        assert_eq!(sink.records()[0].0, Level::Warn);
    }

    #[test]
    fn test_open_layer_checks_grid_shape() {
        use crate::core::normalize::{normalize_values, Decoding};

        let decoding = Decoding {
            fill_value: DEFAULT_FILL_VALUE,
            scale_factor: 1.0,
            add_offset: 0.0,
        };
        let written_grid = normalize_values(vec![1.0; 6], 2, 3, decoding).unwrap();
        let other_grid = normalize_values(vec![1.0; 6], 3, 2, decoding).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.tif");
        write_raster(
            &path,
            &RasterWriteRequest {
                grid: &written_grid,
                spatial_ref: None,
                transform: None,
                creation_options: &[],
                compute_statistics: false,
            },
        )
        .unwrap();

        assert!(open_layer(&path, "grid", &written_grid).is_valid());
        let mismatched = open_layer(&path, "grid", &other_grid);
        assert!(!mismatched.is_valid());
        assert!(mismatched.error.unwrap().contains("expected size 2x3"));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("sst", "ocean.nc"), "sst from ocean.nc");
    }
}
