use crate::core::coordinates::CoordinatePair;
use crate::io::GriddedDataset;
use crate::types::GeoTransform;
use serde::{Deserialize, Serialize};

/// Grid-mapping variable whose presence marks scan-angle (radian) coordinates
pub const GOES_PROJECTION_VARIABLE: &str = "goes_imager_projection";

/// Standard geostationary orbital altitude in meters
pub const DEFAULT_SATELLITE_HEIGHT: f64 = 35786023.0;

/// Geotransform plus the orientation facts needed to lay the data out north-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridGeoreference {
    pub transform: GeoTransform,
    pub x_name: String,
    pub y_name: String,
    pub x_ascending: bool,
    pub y_ascending: bool,
    /// Height used to scale scan angles, when the satellite convention applied
    pub satellite_height: Option<f64>,
}

impl GridGeoreference {
    /// Storage row order must be reversed so row 0 is the topmost row
    pub fn needs_row_flip(&self) -> bool {
        self.y_ascending
    }
}

/// Satellite height from `goes_imager_projection`, if that variable exists
pub fn satellite_height(dataset: &dyn GriddedDataset, default_height: f64) -> Option<f64> {
    dataset.variable(GOES_PROJECTION_VARIABLE).map(|info| {
        info.attributes
            .f64_or("perspective_point_height", default_height)
    })
}

/// Compute the affine transform from 1-D coordinate sequences.
///
/// `scale` multiplies both sequences before any spacing is derived (used to
/// turn scan angles into meters); ascending flags are taken from the
/// unscaled values. Origin and spacing rules:
/// - x: origin is the first value; a descending x uses the last value and a
///   negated pixel width.
/// - y: origin is the first value; an ascending y uses the last value. The
///   stored pixel height is always negative (north-up).
/// - single-sample axes get a spacing of 1.
pub fn geotransform_from_axes(x: &[f64], y: &[f64], scale: f64) -> Option<(GeoTransform, bool, bool)> {
    if x.is_empty() || y.is_empty() {
        return None;
    }

    // Orientation comes from the stored values, not the scaled ones
    let x_ascending = crate::core::coordinates::is_ascending(x);
    let y_ascending = crate::core::coordinates::is_ascending(y);

    let x: Vec<f64> = x.iter().map(|v| v * scale).collect();
    let y: Vec<f64> = y.iter().map(|v| v * scale).collect();

    let mut pixel_width = if x.len() > 1 { (x[1] - x[0]).abs() } else { 1.0 };
    let pixel_height = if y.len() > 1 { (y[1] - y[0]).abs() } else { 1.0 };

    let mut origin_x = x[0];
    if !x_ascending {
        origin_x = x[x.len() - 1];
        pixel_width = -pixel_width;
    }

    let mut origin_y = y[0];
    if y_ascending {
        origin_y = y[y.len() - 1];
    }

    let transform = GeoTransform {
        top_left_x: origin_x,
        pixel_width,
        rotation_x: 0.0,
        top_left_y: origin_y,
        rotation_y: 0.0,
        pixel_height: -pixel_height,
    };
    Some((transform, x_ascending, y_ascending))
}

/// Build the georeference of a grid from its resolved coordinates.
///
/// When the dataset carries `goes_imager_projection`, coordinates are scan
/// angles in radians and are multiplied by the satellite height first.
pub fn build_georeference(
    pair: &CoordinatePair,
    dataset: &dyn GriddedDataset,
    default_height: f64,
) -> Option<GridGeoreference> {
    let height = satellite_height(dataset, default_height);
    if let Some(h) = height {
        log::info!("Converting GOES coordinates using satellite height: {}m", h);
    }

    let (transform, x_ascending, y_ascending) =
        geotransform_from_axes(&pair.x.values, &pair.y.values, height.unwrap_or(1.0))?;

    log::debug!(
        "X: first={} last={} ascending={}",
        pair.x.values[0],
        pair.x.values[pair.x.len() - 1],
        x_ascending
    );
    log::debug!(
        "Y: first={} last={} ascending={}",
        pair.y.values[0],
        pair.y.values[pair.y.len() - 1],
        y_ascending
    );
    log::debug!("Geotransform: {:?}", transform.to_gdal());

    Some(GridGeoreference {
        transform,
        x_name: pair.x.name.clone(),
        y_name: pair.y.name.clone(),
        x_ascending,
        y_ascending,
        satellite_height: height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ascending_x_descending_y() {
        let (gt, xa, ya) =
            geotransform_from_axes(&[0.0, 1.0, 2.0, 3.0], &[10.0, 7.0, 4.0, 1.0], 1.0).unwrap();
        assert!(xa);
        assert!(!ya);
        assert_eq!(gt.to_gdal(), [0.0, 1.0, 0.0, 10.0, 0.0, -3.0]);
    }

    #[test]
    fn test_ascending_y_moves_origin_to_last() {
        let (gt, _, ya) = geotransform_from_axes(&[0.0, 1.0], &[1.0, 4.0, 7.0, 10.0], 1.0).unwrap();
        assert!(ya);
        assert_eq!(gt.top_left_y, 10.0);
        assert_eq!(gt.pixel_height, -3.0);
    }

    #[test]
    fn test_descending_x() {
        let (gt, xa, _) = geotransform_from_axes(&[30.0, 20.0, 10.0, 0.0], &[5.0, 0.0], 1.0).unwrap();
        assert!(!xa);
        assert_eq!(gt.top_left_x, 0.0);
        assert_eq!(gt.pixel_width, -10.0);
    }

    #[test]
    fn test_single_sample_axes() {
        let (gt, xa, ya) = geotransform_from_axes(&[5.0], &[7.0], 1.0).unwrap();
        assert!(xa && ya);
        assert_eq!(gt.to_gdal(), [5.0, 1.0, 0.0, 7.0, 0.0, -1.0]);
    }

    #[test]
    fn test_scan_angle_scaling() {
        let h = DEFAULT_SATELLITE_HEIGHT;
        let dx = 5.6e-5;
        let (gt, _, _) =
            geotransform_from_axes(&[-0.1, -0.1 + dx], &[0.1, 0.1 - dx], h).unwrap();
        assert_relative_eq!(gt.pixel_width, dx * h, max_relative = 1e-9);
        assert_relative_eq!(gt.pixel_height, -dx * h, max_relative = 1e-9);
        assert_relative_eq!(gt.top_left_x, -0.1 * h, max_relative = 1e-12);
    }

    #[test]
    fn test_orientation_ignores_scale_sign() {
        let (gt, xa, ya) = geotransform_from_axes(&[0.0, 1.0, 2.0], &[3.0, 2.0], -1.0).unwrap();
        assert!(xa);
        assert!(!ya);
        assert_eq!(gt.to_gdal(), [0.0, 1.0, 0.0, -3.0, 0.0, -1.0]);

        let (_, xa, ya) = geotransform_from_axes(&[0.0, 1.0], &[3.0, 2.0], 0.0).unwrap();
        assert!(xa);
        assert!(!ya);
    }

    #[test]
    fn test_empty_axis() {
        assert!(geotransform_from_axes(&[], &[1.0], 1.0).is_none());
    }
}
