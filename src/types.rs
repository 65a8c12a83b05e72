use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar, array or text value of a dataset or variable attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Numbers(Vec<f64>),
}

impl AttributeValue {
    /// Numeric view of the value.
    ///
    /// Single-element arrays are treated as scalars, which is how most CF
    /// writers store projection parameters. Text and multi-element arrays
    /// do not coerce.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(v) => Some(*v),
            AttributeValue::Numbers(values) if values.len() == 1 => Some(values[0]),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// All numeric values (scalars become a one-element vector)
    pub fn as_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            AttributeValue::Number(v) => Some(vec![*v]),
            AttributeValue::Numbers(values) => Some(values.clone()),
            AttributeValue::Text(_) => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => write!(f, "{}", s),
            AttributeValue::Number(v) => write!(f, "{}", v),
            AttributeValue::Numbers(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(values: Vec<f64>) -> Self {
        AttributeValue::Numbers(values)
    }
}

/// Ordered attribute set of a dataset or variable
///
/// Keeps the order in which the attributes were declared so the metadata
/// report lists them the way the file does.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    entries: Vec<(String, AttributeValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an attribute, keeping the original position on replace
    pub fn insert<K: Into<String>, V: Into<AttributeValue>>(&mut self, name: K, value: V) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(AttributeValue::as_f64)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_str)
    }

    /// Numeric attribute or `default` when absent or not coercible to a number
    pub fn f64_or(&self, name: &str, default: f64) -> f64 {
        match self.get(name) {
            Some(value) => match value.as_f64() {
                Some(v) => v,
                None => {
                    log::warn!(
                        "Attribute '{}' has non-numeric value '{}', using default {}",
                        name, value, default
                    );
                    default
                }
            },
            None => default,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (key, value) in iter {
            attributes.insert(key, value);
        }
        attributes
    }
}

/// Element type of a variable as declared in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Char,
    String,
    Other,
}

impl DataKind {
    pub fn is_numeric(&self) -> bool {
        !matches!(self, DataKind::Char | DataKind::String | DataKind::Other)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::Int8 => "int8",
            DataKind::UInt8 => "uint8",
            DataKind::Int16 => "int16",
            DataKind::UInt16 => "uint16",
            DataKind::Int32 => "int32",
            DataKind::UInt32 => "uint32",
            DataKind::Int64 => "int64",
            DataKind::UInt64 => "uint64",
            DataKind::Float32 => "float32",
            DataKind::Float64 => "float64",
            DataKind::Char => "char",
            DataKind::String => "string",
            DataKind::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// Geospatial transformation parameters
///
/// `X = top_left_x + col * pixel_width`, `Y = top_left_y + row * pixel_height`.
/// Rotation terms are always zero for the rectilinear grids handled here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// GDAL coefficient order
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    pub fn from_gdal(coefficients: &[f64; 6]) -> Self {
        Self {
            top_left_x: coefficients[0],
            pixel_width: coefficients[1],
            rotation_x: coefficients[2],
            top_left_y: coefficients[3],
            rotation_y: coefficients[4],
            pixel_height: coefficients[5],
        }
    }

    /// Projected coordinate of the top-left corner of cell (col, row)
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.top_left_x + col * self.pixel_width + row * self.rotation_x,
            self.top_left_y + col * self.rotation_y + row * self.pixel_height,
        )
    }
}

/// Machine-distinguishable failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Target variable cannot be rendered as a 2-D raster
    InvalidDimensionality,
    /// Output raster could not be created, written or validated
    BackingStoreFailure,
    /// Source dataset could not be read
    DatasetAccess,
    /// Host layer registry refused a valid raster
    HostRejected,
}

/// Error types for NetCDF georeferencing
#[derive(Debug, thiserror::Error)]
pub enum NcGeoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Variable '{0}' not found in dataset")]
    VariableNotFound(String),

    #[error("Variable {variable} must have at least 2 dimensions for visualization (has {rank})")]
    InvalidDimensionality { variable: String, rank: usize },

    #[error("Failed to create output raster: {0}")]
    RasterCreation(String),

    #[error("Failed to write raster band: {0}")]
    BandWrite(String),

    #[error("Layer is invalid: {0}")]
    LayerInvalid(String),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("NetCDF error: {0}")]
    NetCdf(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Layer registry rejected layer: {0}")]
    Registry(String),
}

impl NcGeoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NcGeoError::InvalidDimensionality { .. } => ErrorKind::InvalidDimensionality,
            NcGeoError::RasterCreation(_)
            | NcGeoError::BandWrite(_)
            | NcGeoError::LayerInvalid(_)
            | NcGeoError::Gdal(_)
            | NcGeoError::Io(_) => ErrorKind::BackingStoreFailure,
            NcGeoError::VariableNotFound(_)
            | NcGeoError::NetCdf(_)
            | NcGeoError::InvalidFormat(_) => ErrorKind::DatasetAccess,
            NcGeoError::Registry(_) => ErrorKind::HostRejected,
        }
    }
}

/// Result type for georeferencing operations
pub type NcGeoResult<T> = Result<T, NcGeoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_element_array_coerces_to_scalar() {
        assert_eq!(AttributeValue::Numbers(vec![35786023.0]).as_f64(), Some(35786023.0));
        assert_eq!(AttributeValue::Numbers(vec![1.0, 2.0]).as_f64(), None);
        assert_eq!(AttributeValue::Text("35786023".into()).as_f64(), None);
    }

    #[test]
    fn test_attribute_fallback_on_bad_type() {
        let mut attrs = Attributes::new();
        attrs.insert("perspective_point_height", "very high");
        attrs.insert("scale_factor", 2.5);

        assert_eq!(attrs.f64_or("perspective_point_height", 10.0), 10.0);
        assert_eq!(attrs.f64_or("scale_factor", 1.0), 2.5);
        assert_eq!(attrs.f64_or("missing", 7.0), 7.0);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut attrs: Attributes = vec![("a", 1.0), ("b", 2.0)].into_iter().collect();
        attrs.insert("a", 3.0);

        let names: Vec<&str> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(attrs.get_f64("a"), Some(3.0));
    }

    #[test]
    fn test_geotransform_apply() {
        let gt = GeoTransform::from_gdal(&[100.0, 10.0, 0.0, 500.0, 0.0, -5.0]);
        assert_eq!(gt.apply(2.0, 3.0), (120.0, 485.0));
        assert_eq!(gt.to_gdal(), [100.0, 10.0, 0.0, 500.0, 0.0, -5.0]);
    }

    #[test]
    fn test_error_kinds() {
        let err = NcGeoError::InvalidDimensionality { variable: "t".into(), rank: 1 };
        assert_eq!(err.kind(), ErrorKind::InvalidDimensionality);
        assert_eq!(NcGeoError::BandWrite("x".into()).kind(), ErrorKind::BackingStoreFailure);
        assert_eq!(NcGeoError::LayerInvalid("x".into()).kind(), ErrorKind::BackingStoreFailure);
    }
}
