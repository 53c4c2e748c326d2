use proptest::prelude::*;
use sled_config::TraysCfg;
use sled_core::calibration::{CalibrationPoint, CalibrationProfile};
use sled_core::{
    DistributionEngine, EFFECT_WEIGHT_GRAMS, LayoutParams, Point, compute_optimal_layout, units,
};

fn device_positions() -> [Point; 4] {
    [
        Point::new(19.0, 0.0),
        Point::new(-19.0, 0.0),
        Point::new(-19.0, 26.5),
        Point::new(19.0, 26.5),
    ]
}

prop_compose! {
    // strictly increasing raw readings so the regression is never degenerate
    fn raws_strategy()(
        start in -1_000.0..1_000.0f64,
        steps in prop::collection::vec(0.5..50.0f64, 2..12),
    ) -> Vec<f64> {
        let mut raws = Vec::with_capacity(steps.len());
        let mut x = start;
        for step in steps {
            x += step;
            raws.push(x);
        }
        raws
    }
}

proptest! {
    #[test]
    fn unit_conversions_round_trip(
        value in 0.001..10_000.0f64,
        unit in prop::sample::select(vec!["g", "kg", "oz", "lb"]),
    ) {
        let back = units::from_grams(units::to_grams(value, unit), unit);
        // oz and lb use independently rounded factors, so the trip is only
        // accurate to about a part per million
        prop_assert!(
            (back - value).abs() < 1e-5 * value.abs() + 1e-9,
            "{value} {unit} came back as {back}"
        );
    }

    #[test]
    fn regression_recovers_generated_lines(
        slope in 0.01..10.0f64,
        intercept in -100.0..100.0f64,
        raws in raws_strategy(),
    ) {
        let points: Vec<CalibrationPoint> = raws
            .iter()
            .map(|&raw| CalibrationPoint::new(raw, slope * raw + intercept, "g"))
            .collect();

        let mut profile = CalibrationProfile::new();
        let cal = profile.fit(0, &points).unwrap();
        prop_assert!((cal.slope - slope).abs() < 1e-6, "slope {} vs {slope}", cal.slope);
        prop_assert!(
            (cal.intercept - intercept).abs() < 1e-5,
            "intercept {} vs {intercept}",
            cal.intercept
        );
        prop_assert!(cal.r_squared > 1.0 - 1e-9);
    }

    #[test]
    fn layouts_never_break_the_weight_budget(
        w0 in 0.0..80_000.0f64,
        w1 in 0.0..80_000.0f64,
        w2 in 0.0..80_000.0f64,
        w3 in 0.0..80_000.0f64,
        headroom in 0.0..30_000.0f64,
    ) {
        let weights = [w0, w1, w2, w3];
        let initial: f64 = weights.iter().sum();
        let max_weight = initial + headroom;

        let trays = TraysCfg::default();
        let layout = compute_optimal_layout(&LayoutParams {
            sensor_weights: weights.to_vec(),
            sensor_positions: device_positions().to_vec(),
            ideal_com: Point::new(0.0, 13.25),
            bias: Point::ORIGIN,
            front_tray: trays.front,
            back_tray: trays.back,
            max_weight,
            max_weight_unit: "g".to_string(),
            threshold: None,
        }).unwrap();

        prop_assert!(layout.total_weight <= max_weight + 1e-9);

        let units_added = (layout.total_weight - initial) / EFFECT_WEIGHT_GRAMS;
        prop_assert!(units_added >= 0.0);
        prop_assert!(
            (units_added - units_added.round()).abs() < 1e-6,
            "added weight is not a whole unit count: {units_added}"
        );

        if !layout.front_tray.is_empty() {
            prop_assert_eq!(layout.front_tray.len(), trays.front.rows);
            prop_assert_eq!(layout.front_tray[0].len(), trays.front.columns);
        }
        if !layout.back_tray.is_empty() {
            prop_assert_eq!(layout.back_tray.len(), trays.back.rows);
            prop_assert_eq!(layout.back_tray[0].len(), trays.back.columns);
        }
        for row in layout.front_tray.iter().chain(&layout.back_tray) {
            for &cell in row {
                prop_assert!(cell <= 1);
            }
        }
    }

    #[test]
    fn the_com_never_leaves_the_cell_hull(
        w0 in 0.0..1_000.0f64,
        w1 in 0.0..1_000.0f64,
        w2 in 0.0..1_000.0f64,
        w3 in 0.0..1_000.0f64,
    ) {
        let mut engine = DistributionEngine::new();
        engine.set_sensor_positions(device_positions());
        engine.update_sensor_data(&[w0, w1, w2, w3], None, true);

        let com = engine.actual_com();
        prop_assert!(com.x.abs() <= 19.0 + 1e-9, "x escaped: {}", com.x);
        prop_assert!(
            (-1e-9..=26.5 + 1e-9).contains(&com.y),
            "y escaped: {}",
            com.y
        );
    }
}
