use approx::assert_relative_eq;
use ncgeo::core::coordinates::{resolve_coordinates, CoordinateSource};
use ncgeo::core::geotransform::{build_georeference, DEFAULT_SATELLITE_HEIGHT};
use ncgeo::{GriddedDataset, MemoryDataset, MemoryVariable};

fn rectilinear(x: Vec<f64>, y: Vec<f64>) -> MemoryDataset {
    let (nx, ny) = (x.len(), y.len());
    MemoryDataset::new("grid.nc")
        .with_dimension("y", ny)
        .with_dimension("x", nx)
        .with_variable(MemoryVariable::new("x", &["x"]).with_data(x))
        .unwrap()
        .with_variable(MemoryVariable::new("y", &["y"]).with_data(y))
        .unwrap()
        .with_variable(MemoryVariable::new("field", &["y", "x"]).with_data(vec![0.0; nx * ny]))
        .unwrap()
}

#[test]
fn test_ascending_x_descending_y_round_trip() {
    let ds = rectilinear(vec![0.0, 1.0, 2.0, 3.0], vec![10.0, 7.0, 4.0, 1.0]);
    let field = ds.variable("field").unwrap();

    let pair = resolve_coordinates(&ds, &field).unwrap().unwrap();
    assert_eq!(pair.source, CoordinateSource::Dimensions);
    assert!(pair.x.ascending);
    assert!(!pair.y.ascending);

    let georef = build_georeference(&pair, &ds, DEFAULT_SATELLITE_HEIGHT).unwrap();
    let gt = georef.transform;
    assert_eq!(gt.top_left_x, 0.0);
    assert_eq!(gt.pixel_width, 1.0);
    assert_eq!(gt.top_left_y, 10.0);
    assert_eq!(gt.pixel_height, -3.0);
    assert_eq!(gt.rotation_x, 0.0);
    assert_eq!(gt.rotation_y, 0.0);
    assert_eq!((georef.x_name.as_str(), georef.y_name.as_str()), ("x", "y"));
    assert!(georef.satellite_height.is_none());
    assert!(!georef.needs_row_flip());
}

#[test]
fn test_ascending_y_is_north_up() {
    let ds = rectilinear(vec![0.0, 1.0], vec![1.0, 4.0, 7.0]);
    let field = ds.variable("field").unwrap();
    let pair = resolve_coordinates(&ds, &field).unwrap().unwrap();
    let georef = build_georeference(&pair, &ds, DEFAULT_SATELLITE_HEIGHT).unwrap();

    assert_eq!(georef.transform.top_left_y, 7.0);
    assert!(georef.transform.pixel_height < 0.0);
    assert!(georef.needs_row_flip());
}

#[test]
fn test_geostationary_scan_angles_scaled() {
    let height = 35786023.0;
    let dx = 5.6e-5;
    let x = vec![-0.101332, -0.101332 + dx, -0.101332 + 2.0 * dx];
    let y = vec![0.128212, 0.128212 - dx];
    let ds = rectilinear(x.clone(), y)
        .with_variable(
            MemoryVariable::scalar("goes_imager_projection")
                .with_attr("grid_mapping_name", "geostationary")
                .with_attr("perspective_point_height", height),
        )
        .unwrap();
    let field = ds.variable("field").unwrap();

    let pair = resolve_coordinates(&ds, &field).unwrap().unwrap();
    let georef = build_georeference(&pair, &ds, DEFAULT_SATELLITE_HEIGHT).unwrap();

    assert_eq!(georef.satellite_height, Some(height));
    assert_relative_eq!(georef.transform.pixel_width, (x[1] - x[0]).abs() * height, max_relative = 1e-9);
    assert_relative_eq!(georef.transform.top_left_x, x[0] * height, max_relative = 1e-12);
    assert_relative_eq!(georef.transform.top_left_y, 0.128212 * height, max_relative = 1e-12);
}

#[test]
fn test_geostationary_default_height() {
    let ds = rectilinear(vec![0.0, 1e-4], vec![1e-4, 0.0])
        .with_variable(MemoryVariable::scalar("goes_imager_projection"))
        .unwrap();
    let field = ds.variable("field").unwrap();
    let pair = resolve_coordinates(&ds, &field).unwrap().unwrap();
    let georef = build_georeference(&pair, &ds, DEFAULT_SATELLITE_HEIGHT).unwrap();

    assert_eq!(georef.satellite_height, Some(35786023.0));
    assert_relative_eq!(georef.transform.pixel_width, 1e-4 * 35786023.0, max_relative = 1e-9);
}

#[test]
fn test_coordinates_attribute_takes_priority() {
    let ds = rectilinear(vec![0.0, 1.0, 2.0], vec![2.0, 1.0])
        .with_variable(MemoryVariable::new("easting", &["x"]).with_data(vec![100.0, 200.0, 300.0]).with_attr("axis", "X"))
        .unwrap()
        .with_variable(MemoryVariable::new("northing", &["y"]).with_data(vec![50.0, 40.0]).with_attr("axis", "Y"))
        .unwrap()
        .with_variable(
            MemoryVariable::new("temp", &["y", "x"])
                .with_data(vec![0.0; 6])
                .with_attr("coordinates", "northing easting"),
        )
        .unwrap();
    let temp = ds.variable("temp").unwrap();

    let pair = resolve_coordinates(&ds, &temp).unwrap().unwrap();
    assert_eq!(pair.source, CoordinateSource::CoordinatesAttribute);
    assert_eq!(pair.x.name, "easting");
    assert_eq!(pair.y.name, "northing");

    let georef = build_georeference(&pair, &ds, DEFAULT_SATELLITE_HEIGHT).unwrap();
    assert_eq!(georef.transform.to_gdal(), [100.0, 100.0, 0.0, 50.0, 0.0, -10.0]);
}

#[test]
fn test_no_coordinates_is_not_an_error() {
    let ds = MemoryDataset::new("bare.nc")
        .with_dimension("row", 2)
        .with_dimension("col", 2)
        .with_variable(MemoryVariable::new("v", &["row", "col"]).with_data(vec![1.0; 4]))
        .unwrap();
    let v = ds.variable("v").unwrap();
    assert!(resolve_coordinates(&ds, &v).unwrap().is_none());
}
