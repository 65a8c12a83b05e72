use crate::io::dataset::{validate_slab, Dimension, GriddedDataset, VariableInfo};
use crate::types::{AttributeValue, Attributes, DataKind, NcGeoError, NcGeoResult};

/// Variable held entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryVariable {
    info: VariableInfo,
    data: Vec<f64>,
}

impl MemoryVariable {
    /// Create a variable over the given dimensions; extents are filled in
    /// from the dataset when it is added.
    pub fn new(name: &str, dimensions: &[&str]) -> Self {
        Self {
            info: VariableInfo {
                name: name.to_string(),
                dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
                shape: Vec::new(),
                kind: DataKind::Float64,
                attributes: Attributes::new(),
            },
            data: Vec::new(),
        }
    }

    /// Grid-mapping style variable with no dimensions and no payload
    pub fn scalar(name: &str) -> Self {
        Self::new(name, &[])
    }

    pub fn with_data(mut self, data: Vec<f64>) -> Self {
        self.data = data;
        self
    }

    pub fn with_kind(mut self, kind: DataKind) -> Self {
        self.info.kind = kind;
        self
    }

    pub fn with_attr<V: Into<AttributeValue>>(mut self, name: &str, value: V) -> Self {
        self.info.attributes.insert(name, value);
        self
    }
}

/// In-memory [`GriddedDataset`]
///
/// Useful for tests and for hosts that already hold decoded arrays.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    name: String,
    attributes: Attributes,
    dimensions: Vec<Dimension>,
    variables: Vec<MemoryVariable>,
}

impl MemoryDataset {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_global_attr<V: Into<AttributeValue>>(mut self, name: &str, value: V) -> Self {
        self.attributes.insert(name, value);
        self
    }

    pub fn with_dimension(mut self, name: &str, len: usize) -> Self {
        match self.dimensions.iter_mut().find(|d| d.name == name) {
            Some(dim) => dim.len = len,
            None => self.dimensions.push(Dimension {
                name: name.to_string(),
                len,
            }),
        }
        self
    }

    /// Add a variable, resolving its shape from the declared dimensions.
    ///
    /// Fails when a dimension is unknown or the payload length does not match
    /// the shape. Variables without a payload (grid mappings) are accepted.
    pub fn with_variable(mut self, mut variable: MemoryVariable) -> NcGeoResult<Self> {
        let mut shape = Vec::with_capacity(variable.info.dimensions.len());
        for dim_name in &variable.info.dimensions {
            let dim = self
                .dimensions
                .iter()
                .find(|d| &d.name == dim_name)
                .ok_or_else(|| {
                    NcGeoError::InvalidFormat(format!(
                        "Variable '{}' uses undeclared dimension '{}'",
                        variable.info.name, dim_name
                    ))
                })?;
            shape.push(dim.len);
        }
        variable.info.shape = shape;

        let expected = variable.info.len();
        if !variable.data.is_empty() && variable.data.len() != expected {
            return Err(NcGeoError::InvalidFormat(format!(
                "Variable '{}' has {} values but shape {:?} needs {}",
                variable.info.name,
                variable.data.len(),
                variable.info.shape,
                expected
            )));
        }

        self.variables.retain(|v| v.info.name != variable.info.name);
        self.variables.push(variable);
        Ok(self)
    }

    fn find(&self, name: &str) -> Option<&MemoryVariable> {
        self.variables.iter().find(|v| v.info.name == name)
    }
}

impl GriddedDataset for MemoryDataset {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    fn global_attributes(&self) -> Attributes {
        self.attributes.clone()
    }

    fn dimensions(&self) -> Vec<Dimension> {
        self.dimensions.clone()
    }

    fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.info.name.clone()).collect()
    }

    fn variable(&self, name: &str) -> Option<VariableInfo> {
        self.find(name).map(|v| v.info.clone())
    }

    fn read_slab(&self, name: &str, start: &[usize], count: &[usize]) -> NcGeoResult<Vec<f64>> {
        let variable = self
            .find(name)
            .ok_or_else(|| NcGeoError::VariableNotFound(name.to_string()))?;
        validate_slab(&variable.info, start, count)?;

        let total: usize = count.iter().product();
        if total == 0 {
            return Ok(Vec::new());
        }
        if variable.data.is_empty() {
            return Err(NcGeoError::InvalidFormat(format!(
                "Variable '{}' has no data",
                name
            )));
        }

        let shape = &variable.info.shape;
        let rank = shape.len();

        // Row-major strides of the full array
        let mut strides = vec![1usize; rank];
        for axis in (0..rank.saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * shape[axis + 1];
        }

        let mut values = Vec::with_capacity(total);
        let mut index = vec![0usize; rank];
        for _ in 0..total {
            let offset: usize = index
                .iter()
                .zip(start)
                .zip(&strides)
                .map(|((&i, &s), &stride)| (i + s) * stride)
                .sum();
            values.push(variable.data[offset]);

            // Advance the odometer, innermost axis first
            for axis in (0..rank).rev() {
                index[axis] += 1;
                if index[axis] < count[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> MemoryDataset {
        MemoryDataset::new("cube.nc")
            .with_dimension("time", 2)
            .with_dimension("y", 2)
            .with_dimension("x", 3)
            .with_variable(
                MemoryVariable::new("t", &["time", "y", "x"])
                    .with_data((0..12).map(|v| v as f64).collect()),
            )
            .unwrap()
    }

    #[test]
    fn test_shape_resolved_from_dimensions() {
        let ds = cube();
        let info = ds.variable("t").unwrap();
        assert_eq!(info.shape, vec![2, 2, 3]);
        assert_eq!(info.dimensions, vec!["time", "y", "x"]);
    }

    #[test]
    fn test_read_slab_leading_index() {
        let ds = cube();
        let second_step = ds.read_slab("t", &[1, 0, 0], &[1, 2, 3]).unwrap();
        assert_eq!(second_step, vec![6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_read_slab_column() {
        let ds = cube();
        let column = ds.read_slab("t", &[0, 0, 1], &[1, 2, 1]).unwrap();
        assert_eq!(column, vec![1.0, 4.0]);
    }

    #[test]
    fn test_out_of_bounds_slab_rejected() {
        let ds = cube();
        assert!(ds.read_slab("t", &[0, 1, 0], &[1, 2, 3]).is_err());
        assert!(ds.read_slab("t", &[0, 0], &[1, 2]).is_err());
    }

    #[test]
    fn test_payload_length_checked() {
        let result = MemoryDataset::new("bad.nc")
            .with_dimension("x", 3)
            .with_variable(MemoryVariable::new("x", &["x"]).with_data(vec![1.0, 2.0]));
        assert!(result.is_err());
    }
}
