use crate::core::normalize::NormalizedGrid;
use crate::types::{GeoTransform, NcGeoError, NcGeoResult};
use gdal::raster::{Buffer, RasterCreationOption};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// GDAL driver used for output rasters
pub const OUTPUT_DRIVER: &str = "GTiff";

/// Band statistics stored in the output file for display stretching
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

/// Everything needed to persist one grid
pub struct RasterWriteRequest<'a> {
    pub grid: &'a NormalizedGrid,
    pub spatial_ref: Option<&'a SpatialRef>,
    pub transform: Option<&'a GeoTransform>,
    /// Driver creation options, e.g. `("COMPRESS", "LZW")`
    pub creation_options: &'a [(String, String)],
    pub compute_statistics: bool,
}

/// Outcome of a successful write
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenRaster {
    pub path: PathBuf,
    pub width: usize,
    pub height: usize,
    pub georeferenced: bool,
    pub statistics: Option<BandStatistics>,
}

/// Write a single-band Float32 GeoTIFF and close it.
///
/// Projection and geotransform are only set when provided; the no-data
/// value is always set to the grid's sentinel.
pub fn write_raster<P: AsRef<Path>>(path: P, request: &RasterWriteRequest<'_>) -> NcGeoResult<WrittenRaster> {
    let path = path.as_ref();
    let (height, width) = request.grid.data.dim();
    log::info!("Creating raster with dimensions: {}x{} at {}", width, height, path.display());

    let driver = DriverManager::get_driver_by_name(OUTPUT_DRIVER)
        .map_err(|e| NcGeoError::RasterCreation(format!("Failed to get {} driver: {}", OUTPUT_DRIVER, e)))?;

    let options: Vec<RasterCreationOption> = request
        .creation_options
        .iter()
        .map(|(key, value)| RasterCreationOption {
            key: key.as_str(),
            value: value.as_str(),
        })
        .collect();

    let mut dataset = driver
        .create_with_band_type_with_options::<f32, _>(path, width as isize, height as isize, 1, &options)
        .map_err(|e| {
            NcGeoError::RasterCreation(format!("Failed to create output dataset at {}: {}", path.display(), e))
        })?;

    if let Some(srs) = request.spatial_ref {
        log::debug!("Setting projection: {}", srs.to_wkt().unwrap_or_default());
        dataset.set_spatial_ref(srs)?;
    }

    if let Some(transform) = request.transform {
        log::debug!("Setting geotransform: {:?}", transform.to_gdal());
        dataset.set_geo_transform(&transform.to_gdal())?;
    }

    let statistics = {
        let mut band = dataset
            .rasterband(1)
            .map_err(|e| NcGeoError::BandWrite(format!("Failed to get raster band: {}", e)))?;

        let flat_data: Vec<f32> = request.grid.data.iter().cloned().collect();
        let buffer = Buffer::new((width, height), flat_data);
        band.write((0, 0), (width, height), &buffer)
            .map_err(|e| NcGeoError::BandWrite(format!("Failed to write array to band: {}", e)))?;

        log::debug!("Setting no data value: {}", request.grid.nodata);
        if let Err(e) = band.set_no_data_value(Some(request.grid.nodata as f64)) {
            log::warn!("Could not set no data value: {}", e);
        }

        if request.compute_statistics {
            match band.get_statistics(true, false) {
                Ok(Some(stats)) => Some(BandStatistics {
                    min: stats.min,
                    max: stats.max,
                    mean: stats.mean,
                    std_dev: stats.std_dev,
                }),
                Ok(None) => None,
                Err(e) => {
                    log::warn!("Could not compute band statistics: {}", e);
                    None
                }
            }
        } else {
            None
        }
    };

    // Closing the dataset flushes it to disk
    drop(dataset);

    Ok(WrittenRaster {
        path: path.to_path_buf(),
        width,
        height,
        georeferenced: request.transform.is_some(),
        statistics,
    })
}

/// Raster layer reopened from a finalized file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterLayer {
    pub path: PathBuf,
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub has_spatial_ref: bool,
    pub geo_transform: Option<GeoTransform>,
    pub nodata: Option<f64>,
    /// Diagnostic summary when the layer is invalid
    pub error: Option<String>,
}

impl RasterLayer {
    /// Reopen `path` and check it against the expected grid size.
    ///
    /// Never fails: an unreadable or inconsistent file yields an invalid layer
    /// carrying the reason.
    pub fn open<P: AsRef<Path>>(path: P, name: &str, expected_size: (usize, usize)) -> Self {
        let path = path.as_ref();
        let mut layer = RasterLayer {
            path: path.to_path_buf(),
            name: name.to_string(),
            width: 0,
            height: 0,
            band_count: 0,
            has_spatial_ref: false,
            geo_transform: None,
            nodata: None,
            error: None,
        };

        let dataset = match Dataset::open(path) {
            Ok(ds) => ds,
            Err(e) => {
                layer.error = Some(format!("Unable to open {}: {}", path.display(), e));
                return layer;
            }
        };

        let (width, height) = dataset.raster_size();
        layer.width = width;
        layer.height = height;
        layer.band_count = dataset.raster_count().max(0) as usize;
        layer.has_spatial_ref = dataset.spatial_ref().is_ok();
        layer.geo_transform = dataset.geo_transform().ok().map(|gt| GeoTransform::from_gdal(&gt));

        let mut problems = Vec::new();
        if layer.band_count != 1 {
            problems.push(format!("expected 1 band, found {}", layer.band_count));
        }
        if (width, height) != expected_size {
            problems.push(format!(
                "expected size {}x{}, found {}x{}",
                expected_size.0, expected_size.1, width, height
            ));
        }
        match dataset.rasterband(1) {
            Ok(band) => layer.nodata = band.no_data_value(),
            Err(e) => problems.push(format!("band 1 unreadable: {}", e)),
        }

        if !problems.is_empty() {
            layer.error = Some(problems.join("; "));
        }
        layer
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}
