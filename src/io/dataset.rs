use crate::types::{Attributes, DataKind, NcGeoError, NcGeoResult};
use serde::{Deserialize, Serialize};

/// Named dimension and its extent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
}

/// Metadata of one variable; the payload is fetched separately through
/// [`GriddedDataset::read_slab`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    /// Dimension names, outermost to innermost
    pub dimensions: Vec<String>,
    /// Extent of each dimension, same order as `dimensions`
    pub shape: Vec<usize>,
    pub kind: DataKind,
    pub attributes: Attributes,
}

impl VariableInfo {
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only access to a gridded scientific dataset.
///
/// This is the only surface the georeferencing pipeline depends on, so any
/// multi-dimensional array store (a NetCDF file, an in-memory table, a
/// remote cube) can feed it.
pub trait GriddedDataset {
    /// Human-readable source identifier, used in layer display names
    fn source_name(&self) -> String;

    fn global_attributes(&self) -> Attributes;

    fn dimensions(&self) -> Vec<Dimension>;

    /// Variable names in declaration order
    fn variable_names(&self) -> Vec<String>;

    fn variable(&self, name: &str) -> Option<VariableInfo>;

    /// Read a hyperslab as `f64`, row-major, innermost dimension fastest.
    ///
    /// `start` and `count` have one entry per variable dimension.
    fn read_slab(&self, name: &str, start: &[usize], count: &[usize]) -> NcGeoResult<Vec<f64>>;

    fn has_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    /// Variable metadata, failing when the variable does not exist
    fn require_variable(&self, name: &str) -> NcGeoResult<VariableInfo> {
        self.variable(name)
            .ok_or_else(|| NcGeoError::VariableNotFound(name.to_string()))
    }

    /// Read the full payload of a variable
    fn read_all(&self, name: &str) -> NcGeoResult<Vec<f64>> {
        let info = self.require_variable(name)?;
        let start = vec![0; info.rank()];
        self.read_slab(name, &start, &info.shape)
    }
}

/// Check that a hyperslab request fits the variable shape
pub(crate) fn validate_slab(
    info: &VariableInfo,
    start: &[usize],
    count: &[usize],
) -> NcGeoResult<()> {
    if start.len() != info.rank() || count.len() != info.rank() {
        return Err(NcGeoError::InvalidFormat(format!(
            "Slab rank mismatch for '{}': start {:?}, count {:?}, shape {:?}",
            info.name, start, count, info.shape
        )));
    }
    for ((&s, &c), &extent) in start.iter().zip(count).zip(&info.shape) {
        if s + c > extent {
            return Err(NcGeoError::InvalidFormat(format!(
                "Slab out of bounds for '{}': start {:?}, count {:?}, shape {:?}",
                info.name, start, count, info.shape
            )));
        }
    }
    Ok(())
}
