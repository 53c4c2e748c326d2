use std::fs::File;
use std::io::Write;

use rstest::rstest;
use sled_config::load_points_csv;
use tempfile::tempdir;

fn write_csv(name: &str, body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join(name);
    let mut f = File::create(&path).unwrap();
    write!(f, "{body}").unwrap();
    (dir, path)
}

#[rstest]
fn groups_rows_per_sensor_in_file_order() {
    let (_dir, path) = write_csv(
        "points.csv",
        "sensor,raw,weight,unit\n\
         0,100.0,0.0,g\n\
         1,90.0,0.0,g\n\
         0,250.0,500.0,g\n\
         1,210.0,500.0,g\n",
    );

    let sensors = load_points_csv(&path).unwrap();
    assert_eq!(sensors[0].points, vec![(100.0, 0.0), (250.0, 500.0)]);
    assert_eq!(sensors[1].points, vec![(90.0, 0.0), (210.0, 500.0)]);
    assert!(sensors[2].points.is_empty());
    assert!(sensors[3].points.is_empty());
}

#[rstest]
fn keeps_per_sensor_unit() {
    let (_dir, path) = write_csv(
        "points_kg.csv",
        "sensor,raw,weight,unit\n\
         2,100.0,0.0,kg\n\
         2,300.0,1.5,kg\n",
    );

    let sensors = load_points_csv(&path).unwrap();
    assert_eq!(sensors[2].unit, "kg");
    assert_eq!(sensors[2].points.len(), 2);
}

#[rstest]
fn csv_with_wrong_headers_errors() {
    let (_dir, path) = write_csv(
        "bad_headers.csv",
        "sensor,raw,grams\n\
         0,100.0,0.0\n",
    );

    let err = load_points_csv(&path).expect_err("should error on bad headers");
    assert!(format!("{err}").contains("headers 'sensor,raw,weight,unit'"));
}

#[rstest]
fn csv_with_out_of_range_sensor_errors() {
    let (_dir, path) = write_csv(
        "bad_sensor.csv",
        "sensor,raw,weight,unit\n\
         4,100.0,0.0,g\n",
    );

    let err = load_points_csv(&path).expect_err("should error on sensor 4");
    assert!(format!("{err}").contains("out of range 0..=3"));
}

#[rstest]
fn csv_with_mixed_units_for_one_sensor_errors() {
    let (_dir, path) = write_csv(
        "mixed_units.csv",
        "sensor,raw,weight,unit\n\
         0,100.0,0.0,g\n\
         0,250.0,1.1,lb\n",
    );

    let err = load_points_csv(&path).expect_err("should error on mixed units");
    assert!(format!("{err}").contains("mixes units"));
}

#[rstest]
fn csv_with_non_numeric_errors() {
    let (_dir, path) = write_csv(
        "bad_numeric.csv",
        "sensor,raw,weight,unit\n\
         0,abc,xyz,g\n",
    );

    let err = load_points_csv(&path).expect_err("should error on non-numeric");
    assert!(format!("{err}").contains("invalid CSV row"));
}
