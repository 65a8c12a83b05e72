use crate::io::{GriddedDataset, VariableInfo};
use crate::types::{NcGeoError, NcGeoResult};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Fill value used when a variable declares neither `_FillValue` nor `missing_value`
pub const DEFAULT_FILL_VALUE: f64 = -9999.0;

/// Attributes consulted for the fill value, first present wins
pub const FILL_VALUE_ATTRIBUTES: [&str; 2] = ["_FillValue", "missing_value"];

/// Decoding parameters for a variable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decoding {
    /// Raw sentinel, before scaling
    pub fill_value: f64,
    pub scale_factor: f64,
    pub add_offset: f64,
}

impl Decoding {
    /// Read `_FillValue`/`missing_value`, `scale_factor` and `add_offset`.
    ///
    /// Non-numeric attributes are skipped in favour of the next candidate or
    /// the default.
    pub fn from_variable(variable: &VariableInfo, default_fill: f64) -> Self {
        let attrs = &variable.attributes;
        let fill_value = FILL_VALUE_ATTRIBUTES
            .iter()
            .find_map(|name| attrs.get_f64(name))
            .unwrap_or(default_fill);

        Self {
            fill_value,
            scale_factor: attrs.f64_or("scale_factor", 1.0),
            add_offset: attrs.f64_or("add_offset", 0.0),
        }
    }

    /// No-data sentinel after scaling, as stored in the output band
    pub fn nodata(&self) -> f32 {
        (self.fill_value * self.scale_factor + self.add_offset) as f32
    }
}

/// Single-precision grid with one no-data sentinel
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedGrid {
    /// (rows, columns)
    pub data: Array2<f32>,
    pub nodata: f32,
    pub decoding: Decoding,
    /// Number of cells equal to the raw fill value
    pub masked_count: usize,
}

impl NormalizedGrid {
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn columns(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_nodata(&self, value: f32) -> bool {
        value == self.nodata || (value.is_nan() && self.nodata.is_nan())
    }

    /// Reverse the row order in place (storage south-up to north-up)
    pub fn flip_rows(&mut self) {
        self.data.invert_axis(Axis(0));
        self.data = self.data.as_standard_layout().to_owned();
    }
}

/// Hyperslab selecting the last two dimensions at index 0 of every leading one
pub fn default_slab(variable: &VariableInfo) -> NcGeoResult<(Vec<usize>, Vec<usize>)> {
    let rank = variable.rank();
    if rank < 2 {
        return Err(NcGeoError::InvalidDimensionality {
            variable: variable.name.clone(),
            rank,
        });
    }

    let start = vec![0; rank];
    let count: Vec<usize> = variable
        .shape
        .iter()
        .enumerate()
        .map(|(i, &extent)| if i >= rank - 2 { extent } else { 1.min(extent) })
        .collect();
    Ok((start, count))
}

/// Mask fill values and linearize `raw * scale_factor + add_offset`.
///
/// Comparison with the fill value happens after the cast to `f32`, and masked
/// cells receive the scaled sentinel so they stay consistent with the data.
pub fn normalize_values(raw: Vec<f64>, rows: usize, columns: usize, decoding: Decoding) -> NcGeoResult<NormalizedGrid> {
    let raw_fill = decoding.fill_value as f32;
    let scale = decoding.scale_factor as f32;
    let offset = decoding.add_offset as f32;
    let nodata = decoding.nodata();

    let values: Vec<f32> = raw.into_iter().map(|v| v as f32).collect();
    let mut data = Array2::from_shape_vec((rows, columns), values)
        .map_err(|e| NcGeoError::InvalidFormat(format!("Failed to reshape variable data: {}", e)))?;

    let masked_count = data.iter().filter(|&&v| v == raw_fill).count();

    let decode = move |v: &mut f32| {
        *v = if *v == raw_fill { nodata } else { *v * scale + offset };
    };

    #[cfg(feature = "parallel")]
    data.par_map_inplace(decode);

    #[cfg(not(feature = "parallel"))]
    data.map_inplace(decode);

    Ok(NormalizedGrid {
        data,
        nodata,
        decoding,
        masked_count,
    })
}

/// Read a variable and produce its normalized 2-D grid.
///
/// Uses the last two dimensions as (row, column) and index 0 of any leading
/// dimension (time, level). Fails with `InvalidDimensionality` for rank < 2.
pub fn normalize_variable(
    dataset: &dyn GriddedDataset,
    variable: &VariableInfo,
    default_fill: f64,
) -> NcGeoResult<NormalizedGrid> {
    let (start, count) = default_slab(variable)?;
    let rank = variable.rank();
    if rank > 2 {
        log::info!(
            "Variable '{}' has {} dimensions; using index 0 of {:?}",
            variable.name,
            rank,
            &variable.dimensions[..rank - 2]
        );
    }

    let rows = count[rank - 2];
    let columns = count[rank - 1];
    let raw = dataset.read_slab(&variable.name, &start, &count)?;

    let decoding = Decoding::from_variable(variable, default_fill);
    log::debug!(
        "Decoding '{}': fill={} scale={} offset={}",
        variable.name, decoding.fill_value, decoding.scale_factor, decoding.add_offset
    );

    let grid = normalize_values(raw, rows, columns, decoding)?;
    log::debug!(
        "Normalized '{}' to {}x{} grid, {} no-data cells",
        variable.name,
        columns,
        rows,
        grid.masked_count
    );
    Ok(grid)
}
