use crate::io::GriddedDataset;
use crate::types::{Attributes, NcGeoResult};
use gdal::spatial_ref::SpatialRef;
use serde::{Deserialize, Serialize};

/// Grid-mapping variable names searched, in priority order
pub const GRID_MAPPING_CANDIDATES: [&str; 7] = [
    "crs",
    "transverse_mercator",
    "projection",
    "lambert_conformal_conic",
    "goes_imager_projection",
    "polar_stereographic",
    "grid_mapping",
];

/// EPSG code used for `latitude_longitude` grid mappings
pub const GEOGRAPHIC_EPSG: u32 = 4326;

/// Grid-mapping variable found in a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct GridMapping {
    pub variable: String,
    pub attributes: Attributes,
}

impl GridMapping {
    /// The `grid_mapping_name` attribute, if present and textual
    pub fn mapping_name(&self) -> Option<&str> {
        self.attributes.get_str("grid_mapping_name").map(str::trim)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransverseMercatorParams {
    pub latitude_of_origin: f64,
    pub central_meridian: f64,
    pub scale_factor: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LambertConformalParams {
    pub standard_parallel_1: f64,
    pub standard_parallel_2: f64,
    pub latitude_of_origin: f64,
    pub central_meridian: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeostationaryParams {
    pub satellite_height: f64,
    pub longitude_of_origin: f64,
    /// `sweep_angle_axis` when the file declares one
    pub sweep_axis: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarStereographicParams {
    pub latitude_of_origin: f64,
    pub longitude_of_origin: f64,
    pub scale_factor: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

/// Spatial reference recognized from a CF grid mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProjectionDescriptor {
    /// WGS84 latitude/longitude (EPSG:4326)
    Geographic,
    TransverseMercator(TransverseMercatorParams),
    LambertConformalConic(LambertConformalParams),
    Geostationary(GeostationaryParams),
    PolarStereographic(PolarStereographicParams),
    /// Grid mapping present but not recognized; no spatial reference is set
    Unknown,
}

impl ProjectionDescriptor {
    /// Classify a grid mapping by its `grid_mapping_name`.
    ///
    /// Missing or non-numeric parameters take their documented defaults;
    /// classification itself never fails.
    pub fn from_grid_mapping(mapping: &GridMapping) -> Self {
        let attrs = &mapping.attributes;

        match mapping.mapping_name() {
            Some("latitude_longitude") => ProjectionDescriptor::Geographic,
            Some("transverse_mercator") => {
                ProjectionDescriptor::TransverseMercator(TransverseMercatorParams {
                    latitude_of_origin: attrs.f64_or("latitude_of_projection_origin", 0.0),
                    central_meridian: attrs.f64_or("longitude_of_central_meridian", 0.0),
                    scale_factor: attrs.f64_or("scale_factor_at_central_meridian", 1.0),
                    false_easting: attrs.f64_or("false_easting", 0.0),
                    false_northing: attrs.f64_or("false_northing", 0.0),
                })
            }
            Some("lambert_conformal_conic") => {
                let (sp1, sp2) = standard_parallels(attrs);
                ProjectionDescriptor::LambertConformalConic(LambertConformalParams {
                    standard_parallel_1: sp1,
                    standard_parallel_2: sp2,
                    latitude_of_origin: attrs.f64_or("latitude_of_projection_origin", 0.0),
                    central_meridian: attrs.f64_or("longitude_of_central_meridian", 0.0),
                    false_easting: attrs.f64_or("false_easting", 0.0),
                    false_northing: attrs.f64_or("false_northing", 0.0),
                })
            }
            Some("geostationary") => ProjectionDescriptor::Geostationary(GeostationaryParams {
                satellite_height: attrs.f64_or("perspective_point_height", 0.0),
                longitude_of_origin: attrs.f64_or("longitude_of_projection_origin", 0.0),
                sweep_axis: attrs
                    .get_str("sweep_angle_axis")
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            }),
            Some("polar_stereographic") => {
                let longitude = match attrs.get_f64("longitude_of_projection_origin") {
                    Some(lon) => lon,
                    None => attrs.f64_or("straight_vertical_longitude_from_pole", 0.0),
                };
                ProjectionDescriptor::PolarStereographic(PolarStereographicParams {
                    latitude_of_origin: attrs.f64_or("latitude_of_projection_origin", 90.0),
                    longitude_of_origin: longitude,
                    scale_factor: attrs.f64_or("scale_factor", 1.0),
                    false_easting: attrs.f64_or("false_easting", 0.0),
                    false_northing: attrs.f64_or("false_northing", 0.0),
                })
            }
            Some(other) => {
                log::warn!(
                    "Unsupported grid_mapping_name '{}' on '{}'",
                    other, mapping.variable
                );
                ProjectionDescriptor::Unknown
            }
            None => {
                log::warn!("Grid mapping '{}' has no grid_mapping_name", mapping.variable);
                ProjectionDescriptor::Unknown
            }
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ProjectionDescriptor::Unknown)
    }

    /// PROJ.4 definition, or `None` for geographic (EPSG-based) and unknown
    pub fn to_proj4(&self) -> Option<String> {
        match self {
            ProjectionDescriptor::Geographic | ProjectionDescriptor::Unknown => None,
            ProjectionDescriptor::TransverseMercator(p) => Some(format!(
                "+proj=tmerc +lat_0={} +lon_0={} +k={} +x_0={} +y_0={} +datum=WGS84 +units=m +no_defs",
                p.latitude_of_origin, p.central_meridian, p.scale_factor, p.false_easting, p.false_northing
            )),
            ProjectionDescriptor::LambertConformalConic(p) => Some(format!(
                "+proj=lcc +lat_1={} +lat_2={} +lat_0={} +lon_0={} +x_0={} +y_0={} +datum=WGS84 +units=m +no_defs",
                p.standard_parallel_1,
                p.standard_parallel_2,
                p.latitude_of_origin,
                p.central_meridian,
                p.false_easting,
                p.false_northing
            )),
            ProjectionDescriptor::Geostationary(p) => {
                let mut proj = format!(
                    "+proj=geos +h={} +lon_0={} +datum=WGS84 +units=m",
                    p.satellite_height, p.longitude_of_origin
                );
                if let Some(sweep) = &p.sweep_axis {
                    proj.push_str(&format!(" +sweep={}", sweep));
                }
                proj.push_str(" +no_defs");
                Some(proj)
            }
            ProjectionDescriptor::PolarStereographic(p) => {
                // A pole origin is the natural-origin variant; anything else is a
                // latitude of true scale on the hemisphere's pole.
                let pole = if p.latitude_of_origin < 0.0 { -90.0 } else { 90.0 };
                let origin = if p.latitude_of_origin.abs() == 90.0 {
                    format!("+lat_0={} +k={}", p.latitude_of_origin, p.scale_factor)
                } else {
                    format!("+lat_0={} +lat_ts={}", pole, p.latitude_of_origin)
                };
                Some(format!(
                    "+proj=stere {} +lon_0={} +x_0={} +y_0={} +datum=WGS84 +units=m +no_defs",
                    origin, p.longitude_of_origin, p.false_easting, p.false_northing
                ))
            }
        }
    }

    /// Build the GDAL spatial reference; `None` for unknown projections
    pub fn to_spatial_ref(&self) -> NcGeoResult<Option<SpatialRef>> {
        let srs = match self {
            ProjectionDescriptor::Unknown => return Ok(None),
            ProjectionDescriptor::Geographic => SpatialRef::from_epsg(GEOGRAPHIC_EPSG)?,
            other => match other.to_proj4() {
                Some(proj4) => SpatialRef::from_proj4(&proj4)?,
                None => return Ok(None),
            },
        };
        Ok(Some(srs))
    }

    /// WKT of the spatial reference; `None` for unknown projections
    pub fn to_wkt(&self) -> NcGeoResult<Option<String>> {
        match self.to_spatial_ref()? {
            Some(srs) => Ok(Some(srs.to_wkt()?)),
            None => Ok(None),
        }
    }
}

/// `standard_parallel_1/2`, falling back to the CF `standard_parallel` array, then 30/60
fn standard_parallels(attrs: &Attributes) -> (f64, f64) {
    let cf_array = attrs
        .get("standard_parallel")
        .and_then(|v| v.as_f64_vec())
        .unwrap_or_default();

    let sp1 = match attrs.get_f64("standard_parallel_1") {
        Some(v) => v,
        None => cf_array
            .first()
            .copied()
            .unwrap_or_else(|| attrs.f64_or("standard_parallel_1", 30.0)),
    };
    let sp2 = match attrs.get_f64("standard_parallel_2") {
        Some(v) => v,
        None => match cf_array.len() {
            0 => attrs.f64_or("standard_parallel_2", 60.0),
            1 => cf_array[0],
            _ => cf_array[1],
        },
    };
    (sp1, sp2)
}

/// First candidate grid-mapping variable present in the dataset
pub fn find_grid_mapping(dataset: &dyn GriddedDataset) -> Option<GridMapping> {
    GRID_MAPPING_CANDIDATES.iter().find_map(|name| {
        dataset.variable(name).map(|info| GridMapping {
            variable: info.name,
            attributes: info.attributes,
        })
    })
}

/// Every candidate grid-mapping variable present, in candidate order
pub fn grid_mappings(dataset: &dyn GriddedDataset) -> Vec<GridMapping> {
    GRID_MAPPING_CANDIDATES
        .iter()
        .filter_map(|name| {
            dataset.variable(name).map(|info| GridMapping {
                variable: info.name,
                attributes: info.attributes,
            })
        })
        .collect()
}

/// Locate and classify the dataset's grid mapping.
///
/// Returns `None` when no candidate variable exists, which is a normal
/// outcome: the raster is then written without a spatial reference.
pub fn classify_projection(dataset: &dyn GriddedDataset) -> Option<(GridMapping, ProjectionDescriptor)> {
    let mapping = find_grid_mapping(dataset)?;
    log::debug!(
        "Found grid mapping '{}' with {} attributes",
        mapping.variable,
        mapping.attributes.len()
    );
    let descriptor = ProjectionDescriptor::from_grid_mapping(&mapping);
    Some((mapping, descriptor))
}
