//! Locate the x/y coordinate arrays of a data variable.
//!
//! Two sources are tried in order: the CF `coordinates` attribute, then the
//! variable's own dimension names (dimension-as-coordinate-variable). The
//! first source that yields both axes wins; partial results are never mixed
//! across sources.
//!
//! Two-dimensional coordinate variables are reduced to 1-D by taking the
//! first row (x) or the first column (y). This is only exact for rectilinear
//! grids; curvilinear grids get an approximate geotransform.

use crate::io::{GriddedDataset, VariableInfo};
use crate::types::NcGeoResult;
use serde::{Deserialize, Serialize};

pub const X_COORDINATE_NAMES: [&str; 4] = ["x", "lon", "longitude", "projection_x_coordinate"];
pub const Y_COORDINATE_NAMES: [&str; 4] = ["y", "lat", "latitude", "projection_y_coordinate"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    fn known_names(&self) -> &'static [&'static str] {
        match self {
            Axis::X => &X_COORDINATE_NAMES,
            Axis::Y => &Y_COORDINATE_NAMES,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
        }
    }
}

/// Where the coordinate variables were found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSource {
    /// Names listed in the variable's `coordinates` attribute
    CoordinatesAttribute,
    /// Coordinate variables named after the variable's dimensions
    Dimensions,
}

/// Resolution order
pub const RESOLUTION_ORDER: [CoordinateSource; 2] =
    [CoordinateSource::CoordinatesAttribute, CoordinateSource::Dimensions];

/// One resolved 1-D coordinate sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateAxis {
    pub name: String,
    pub values: Vec<f64>,
    pub ascending: bool,
}

impl CoordinateAxis {
    pub fn new(name: &str, values: Vec<f64>) -> Self {
        let ascending = is_ascending(&values);
        Self {
            name: name.to_string(),
            values,
            ascending,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolved x/y coordinates of a data variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatePair {
    pub x: CoordinateAxis,
    pub y: CoordinateAxis,
    pub source: CoordinateSource,
}

/// `coord[1] > coord[0]`; sequences shorter than two count as ascending
pub fn is_ascending(values: &[f64]) -> bool {
    if values.len() > 1 {
        values[1] > values[0]
    } else {
        true
    }
}

/// Classify a candidate coordinate variable by name, then by its `axis` attribute
pub fn classify_axis(name: &str, info: &VariableInfo) -> Option<Axis> {
    let axis_attr = info.attributes.get_str("axis").map(str::trim);
    [Axis::X, Axis::Y]
        .into_iter()
        .find(|axis| axis.known_names().contains(&name) || axis_attr == Some(axis.label()))
}

/// Names of the x and y coordinate variables found among `candidates`.
///
/// A later match for an axis replaces an earlier one.
fn pick_axes(dataset: &dyn GriddedDataset, candidates: &[String]) -> Option<(String, String)> {
    let mut x_name: Option<String> = None;
    let mut y_name: Option<String> = None;

    for name in candidates {
        let Some(info) = dataset.variable(name) else {
            continue;
        };
        match classify_axis(name, &info) {
            Some(Axis::X) => x_name = Some(name.clone()),
            Some(Axis::Y) => y_name = Some(name.clone()),
            None => {}
        }
    }

    Some((x_name?, y_name?))
}

fn candidates_for(source: CoordinateSource, variable: &VariableInfo) -> Vec<String> {
    match source {
        CoordinateSource::CoordinatesAttribute => variable
            .attributes
            .get_str("coordinates")
            .map(|list| list.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        CoordinateSource::Dimensions => variable.dimensions.clone(),
    }
}

/// Read a coordinate variable as a 1-D sequence.
///
/// Multi-dimensional x coordinates keep their innermost axis (first row);
/// multi-dimensional y coordinates keep their second-innermost axis (first
/// column).
pub fn read_coordinate(dataset: &dyn GriddedDataset, name: &str, axis: Axis) -> NcGeoResult<Vec<f64>> {
    let info = dataset.require_variable(name)?;
    let rank = info.rank();

    if rank <= 1 {
        return dataset.read_all(name);
    }

    let keep = match axis {
        Axis::X => rank - 1,
        Axis::Y => rank - 2,
    };
    log::warn!(
        "Coordinate '{}' is {}-D; using a single {} of it (assumes a near-rectilinear grid)",
        name,
        rank,
        if axis == Axis::X { "row" } else { "column" }
    );

    let start = vec![0; rank];
    let count: Vec<usize> = (0..rank)
        .map(|i| if i == keep { info.shape[i] } else { 1 })
        .collect();
    dataset.read_slab(name, &start, &count)
}

/// Run one resolution strategy
pub fn resolve_from(
    dataset: &dyn GriddedDataset,
    variable: &VariableInfo,
    source: CoordinateSource,
) -> NcGeoResult<Option<CoordinatePair>> {
    let candidates = candidates_for(source, variable);
    let Some((x_name, y_name)) = pick_axes(dataset, &candidates) else {
        log::debug!("No x/y coordinates for '{}' from {:?}", variable.name, source);
        return Ok(None);
    };

    let x = CoordinateAxis::new(&x_name, read_coordinate(dataset, &x_name, Axis::X)?);
    let y = CoordinateAxis::new(&y_name, read_coordinate(dataset, &y_name, Axis::Y)?);

    if x.is_empty() || y.is_empty() {
        log::warn!("Coordinate variables '{}'/'{}' are empty", x_name, y_name);
        return Ok(None);
    }

    Ok(Some(CoordinatePair { x, y, source }))
}

/// Find the x/y coordinates of `variable`.
///
/// `Ok(None)` means no usable coordinates were found; the raster is then
/// written without a geotransform.
pub fn resolve_coordinates(
    dataset: &dyn GriddedDataset,
    variable: &VariableInfo,
) -> NcGeoResult<Option<CoordinatePair>> {
    for source in RESOLUTION_ORDER {
        if let Some(pair) = resolve_from(dataset, variable, source)? {
            log::debug!(
                "Resolved coordinates for '{}' from {:?}: x='{}' y='{}'",
                variable.name, source, pair.x.name, pair.y.name
            );
            return Ok(Some(pair));
        }
    }
    Ok(None)
}
