use crate::io::dataset::{validate_slab, Dimension, GriddedDataset, VariableInfo};
use crate::types::{AttributeValue, Attributes, DataKind, NcGeoError, NcGeoResult};
use netcdf::types::{FloatType, IntType, NcVariableType};
use std::path::{Path, PathBuf};

/// NetCDF file opened read-only through the netCDF-C library
pub struct NetcdfDataset {
    path: PathBuf,
    file: netcdf::File,
}

impl NetcdfDataset {
    pub fn open<P: AsRef<Path>>(path: P) -> NcGeoResult<Self> {
        log::info!("Opening NetCDF dataset: {}", path.as_ref().display());

        let file = netcdf::open(path.as_ref()).map_err(|e| {
            NcGeoError::NetCdf(format!(
                "Failed to open {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        log::debug!("Dataset opened successfully");
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GriddedDataset for NetcdfDataset {
    fn source_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn global_attributes(&self) -> Attributes {
        read_attributes(self.file.attributes())
    }

    fn dimensions(&self) -> Vec<Dimension> {
        self.file
            .dimensions()
            .map(|d| Dimension {
                name: d.name().to_string(),
                len: d.len(),
            })
            .collect()
    }

    fn variable_names(&self) -> Vec<String> {
        self.file.variables().map(|v| v.name().to_string()).collect()
    }

    fn variable(&self, name: &str) -> Option<VariableInfo> {
        let var = self.file.variable(name)?;
        Some(VariableInfo {
            name: var.name().to_string(),
            dimensions: var.dimensions().iter().map(|d| d.name().to_string()).collect(),
            shape: var.dimensions().iter().map(|d| d.len()).collect(),
            kind: data_kind(&var.vartype()),
            attributes: read_attributes(var.attributes()),
        })
    }

    fn read_slab(&self, name: &str, start: &[usize], count: &[usize]) -> NcGeoResult<Vec<f64>> {
        let var = self
            .file
            .variable(name)
            .ok_or_else(|| NcGeoError::VariableNotFound(name.to_string()))?;
        let info = VariableInfo {
            name: name.to_string(),
            dimensions: var.dimensions().iter().map(|d| d.name().to_string()).collect(),
            shape: var.dimensions().iter().map(|d| d.len()).collect(),
            kind: data_kind(&var.vartype()),
            attributes: Attributes::new(),
        };
        validate_slab(&info, start, count)?;

        if count.iter().product::<usize>() == 0 {
            return Ok(Vec::new());
        }

        let extents: Vec<netcdf::Extent> = start
            .iter()
            .zip(count)
            .map(|(&s, &c)| (s..s + c).into())
            .collect();

        log::debug!("Reading '{}' start={:?} count={:?}", name, start, count);
        read_as_f64(&var, extents.as_slice())
    }
}

/// Read a hyperslab in the variable's native type and widen to f64
fn read_as_f64(var: &netcdf::Variable<'_>, extents: &[netcdf::Extent]) -> NcGeoResult<Vec<f64>> {
    let vartype = var.vartype();
    let read_error = |e: netcdf::Error| {
        NcGeoError::NetCdf(format!("Failed to read '{}': {}", var.name(), e))
    };

    let values = match vartype {
        NcVariableType::Float(FloatType::F64) => var.get_values::<f64, _>(extents).map_err(read_error)?,
        NcVariableType::Float(FloatType::F32) => widen(var.get_values::<f32, _>(extents).map_err(read_error)?),
        NcVariableType::Int(IntType::I64) => widen_lossy(var.get_values::<i64, _>(extents).map_err(read_error)?),
        NcVariableType::Int(IntType::U64) => widen_lossy_u(var.get_values::<u64, _>(extents).map_err(read_error)?),
        NcVariableType::Int(IntType::I32) => widen(var.get_values::<i32, _>(extents).map_err(read_error)?),
        NcVariableType::Int(IntType::U32) => widen(var.get_values::<u32, _>(extents).map_err(read_error)?),
        NcVariableType::Int(IntType::I16) => widen(var.get_values::<i16, _>(extents).map_err(read_error)?),
        NcVariableType::Int(IntType::U16) => widen(var.get_values::<u16, _>(extents).map_err(read_error)?),
        NcVariableType::Int(IntType::I8) => widen(var.get_values::<i8, _>(extents).map_err(read_error)?),
        NcVariableType::Int(IntType::U8) => widen(var.get_values::<u8, _>(extents).map_err(read_error)?),
        other => {
            return Err(NcGeoError::InvalidFormat(format!(
                "Variable '{}' has non-numeric type {:?}",
                var.name(),
                other
            )))
        }
    };

    Ok(values)
}

fn widen<T: Into<f64>>(values: Vec<T>) -> Vec<f64> {
    values.into_iter().map(Into::into).collect()
}

fn widen_lossy(values: Vec<i64>) -> Vec<f64> {
    values.into_iter().map(|v| v as f64).collect()
}

fn widen_lossy_u(values: Vec<u64>) -> Vec<f64> {
    values.into_iter().map(|v| v as f64).collect()
}

fn data_kind(vartype: &NcVariableType) -> DataKind {
    match vartype {
        NcVariableType::Int(IntType::I8) => DataKind::Int8,
        NcVariableType::Int(IntType::U8) => DataKind::UInt8,
        NcVariableType::Int(IntType::I16) => DataKind::Int16,
        NcVariableType::Int(IntType::U16) => DataKind::UInt16,
        NcVariableType::Int(IntType::I32) => DataKind::Int32,
        NcVariableType::Int(IntType::U32) => DataKind::UInt32,
        NcVariableType::Int(IntType::I64) => DataKind::Int64,
        NcVariableType::Int(IntType::U64) => DataKind::UInt64,
        NcVariableType::Float(FloatType::F32) => DataKind::Float32,
        NcVariableType::Float(FloatType::F64) => DataKind::Float64,
        NcVariableType::Char => DataKind::Char,
        NcVariableType::String => DataKind::String,
        _ => DataKind::Other,
    }
}

fn read_attributes<'f>(attrs: impl Iterator<Item = netcdf::Attribute<'f>>) -> Attributes {
    let mut attributes = Attributes::new();
    for attr in attrs {
        match attr.value() {
            Ok(value) => attributes.insert(attr.name(), convert_attribute(value)),
            Err(e) => log::warn!("Skipping unreadable attribute '{}': {}", attr.name(), e),
        }
    }
    attributes
}

#[allow(unreachable_patterns)]
fn convert_attribute(value: netcdf::AttributeValue) -> AttributeValue {
    use netcdf::AttributeValue as Nc;

    match value {
        Nc::Uchar(v) => AttributeValue::Number(v as f64),
        Nc::Schar(v) => AttributeValue::Number(v as f64),
        Nc::Ushort(v) => AttributeValue::Number(v as f64),
        Nc::Short(v) => AttributeValue::Number(v as f64),
        Nc::Uint(v) => AttributeValue::Number(v as f64),
        Nc::Int(v) => AttributeValue::Number(v as f64),
        Nc::Ulonglong(v) => AttributeValue::Number(v as f64),
        Nc::Longlong(v) => AttributeValue::Number(v as f64),
        Nc::Float(v) => AttributeValue::Number(v as f64),
        Nc::Double(v) => AttributeValue::Number(v),
        Nc::Str(v) => AttributeValue::Text(v),
        Nc::Uchars(v) => AttributeValue::Numbers(v.into_iter().map(|x| x as f64).collect()),
        Nc::Schars(v) => AttributeValue::Numbers(v.into_iter().map(|x| x as f64).collect()),
        Nc::Ushorts(v) => AttributeValue::Numbers(v.into_iter().map(|x| x as f64).collect()),
        Nc::Shorts(v) => AttributeValue::Numbers(v.into_iter().map(|x| x as f64).collect()),
        Nc::Uints(v) => AttributeValue::Numbers(v.into_iter().map(|x| x as f64).collect()),
        Nc::Ints(v) => AttributeValue::Numbers(v.into_iter().map(|x| x as f64).collect()),
        Nc::Ulonglongs(v) => AttributeValue::Numbers(v.into_iter().map(|x| x as f64).collect()),
        Nc::Longlongs(v) => AttributeValue::Numbers(v.into_iter().map(|x| x as f64).collect()),
        Nc::Floats(v) => AttributeValue::Numbers(v.into_iter().map(|x| x as f64).collect()),
        Nc::Doubles(v) => AttributeValue::Numbers(v),
        Nc::Strs(v) => AttributeValue::Text(v.join(", ")),
        other => AttributeValue::Text(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coordinates::CoordinateSource;
    use crate::core::projection::{classify_projection, ProjectionDescriptor};
    use crate::core::visualize::{MemorySink, VisualizeOptions, Visualizer};

    const FILL: i16 = -32768;

    /// time=2, y=2, x=3 packed i16 field on a Lambert grid
    fn write_sample(path: &Path) -> Result<(), netcdf::Error> {
        let mut file = netcdf::create(path)?;
        file.add_attribute("Conventions", "CF-1.8")?;
        file.add_dimension("time", 2)?;
        file.add_dimension("y", 2)?;
        file.add_dimension("x", 3)?;

        let mut x = file.add_variable::<f64>("x", &["x"])?;
        x.put_attribute("axis", "X")?;
        x.put_values(&vec![100.0f64, 200.0, 300.0], ..)?;

        let mut y = file.add_variable::<f32>("y", &["y"])?;
        y.put_attribute("axis", "Y")?;
        y.put_values(&vec![50.0f32, 40.0], ..)?;

        let mut crs = file.add_variable::<i32>("crs", &[])?;
        crs.put_attribute("grid_mapping_name", "lambert_conformal_conic")?;
        crs.put_attribute("standard_parallel", vec![25.0f64, 45.0])?;
        crs.put_attribute("longitude_of_central_meridian", -95.0f32)?;

        let mut counts = file.add_variable::<i16>("counts", &["time", "y", "x"])?;
        counts.put_attribute("_FillValue", FILL)?;
        counts.put_attribute("scale_factor", 0.5f32)?;
        counts.put_attribute("add_offset", 10.0f64)?;
        counts.put_attribute("grid_mapping", "crs")?;
        counts.put_values(&vec![0i16, 2, FILL, 4, 6, 8, 10, 11, 12, 13, 14, 15], ..)?;
        Ok(())
    }

    fn sample() -> (tempfile::TempDir, NetcdfDataset) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.nc");
        write_sample(&path).unwrap();
        let ds = NetcdfDataset::open(&path).unwrap();
        (dir, ds)
    }

    #[test]
    fn test_listing_and_attributes() {
        let (_dir, ds) = sample();

        assert_eq!(ds.source_name(), "sample.nc");
        assert_eq!(ds.global_attributes().get_str("Conventions"), Some("CF-1.8"));
        let dims: Vec<(String, usize)> = ds.dimensions().into_iter().map(|d| (d.name, d.len)).collect();
        assert_eq!(
            dims,
            vec![("time".to_string(), 2), ("y".to_string(), 2), ("x".to_string(), 3)]
        );
        assert!(ds.variable_names().contains(&"counts".to_string()));

        let counts = ds.variable("counts").unwrap();
        assert_eq!(counts.kind, DataKind::Int16);
        assert_eq!(counts.shape, vec![2, 2, 3]);
        assert_eq!(counts.dimensions, vec!["time", "y", "x"]);
        assert_eq!(counts.attributes.get_f64("_FillValue"), Some(-32768.0));
        assert_eq!(counts.attributes.get_f64("scale_factor"), Some(0.5));
        assert_eq!(counts.attributes.get_str("grid_mapping"), Some("crs"));

        let crs = ds.variable("crs").unwrap();
        assert_eq!(crs.rank(), 0);
        assert_eq!(
            crs.attributes.get("standard_parallel"),
            Some(&AttributeValue::Numbers(vec![25.0, 45.0]))
        );
        assert!(ds.variable("salinity").is_none());
    }

    #[test]
    fn test_typed_slab_reads() {
        let (_dir, ds) = sample();

        assert_eq!(ds.read_all("y").unwrap(), vec![50.0, 40.0]);
        assert_eq!(ds.read_all("x").unwrap(), vec![100.0, 200.0, 300.0]);
        assert_eq!(
            ds.read_slab("counts", &[1, 0, 1], &[1, 2, 2]).unwrap(),
            vec![11.0, 12.0, 14.0, 15.0]
        );
        assert!(ds.read_slab("counts", &[0, 0, 2], &[1, 2, 2]).is_err());
        assert!(matches!(
            ds.read_slab("salinity", &[0], &[1]),
            Err(NcGeoError::VariableNotFound(_))
        ));
    }

    #[test]
    fn test_projection_from_file() {
        let (_dir, ds) = sample();
        let (mapping, descriptor) = classify_projection(&ds).unwrap();
        assert_eq!(mapping.variable, "crs");
        match descriptor {
            ProjectionDescriptor::LambertConformalConic(p) => {
                assert_eq!(p.standard_parallel_1, 25.0);
                assert_eq!(p.standard_parallel_2, 45.0);
                assert_eq!(p.central_meridian, -95.0);
            }
            other => panic!("unexpected descriptor {:?}", other),
        }
    }

    #[test]
    fn test_render_from_file() {
        let (dir, ds) = sample();
        let sink = MemorySink::new();
        let options = VisualizeOptions {
            output_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let outcome = Visualizer::new(&ds, options, &sink).render("counts").unwrap();

        assert!(outcome.layer.is_valid(), "{:?}", outcome.layer.error);
        assert_eq!(outcome.layer.name, "counts from sample.nc");
        assert!(outcome.layer.has_spatial_ref);
        assert_eq!(outcome.nodata, -16374.0);

        let georef = outcome.georeference.unwrap();
        assert_eq!(georef.transform.to_gdal(), [100.0, 100.0, 0.0, 50.0, 0.0, -10.0]);
        assert!(!outcome.rows_flipped);

        let raster = gdal::Dataset::open(&outcome.layer.path).unwrap();
        let band = raster.rasterband(1).unwrap();
        let values = band.read_as::<f32>((0, 0), (3, 2), (3, 2), None).unwrap().data;
        assert_eq!(values, vec![10.0, 11.0, -16374.0, 12.0, 13.0, 14.0]);

        let pair = crate::core::coordinates::resolve_coordinates(&ds, &ds.variable("counts").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(pair.source, CoordinateSource::Dimensions);
    }
}
