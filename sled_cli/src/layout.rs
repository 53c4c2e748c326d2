//! The `layout` command: one optimizer run over fixed cell weights.

use eyre::Result;
use sled_config::Settings;
use sled_core::{DistributionEngine, SENSOR_COUNT, TrayLayoutResult, spawn_layout, units};

use crate::cli::json_mode;

pub fn run_layout(settings: &Settings, weights: &[f64]) -> Result<()> {
    if weights.len() != SENSOR_COUNT {
        eyre::bail!(
            "expected exactly {SENSOR_COUNT} weights, got {}",
            weights.len()
        );
    }

    let mut engine = DistributionEngine::with_geometry(&settings.geometry)?;
    engine.update_sensor_data(weights, None, true);

    let params = engine.layout_params(&settings.trays, &settings.optimizer);
    let layout = spawn_layout(params).wait()?;

    if json_mode() {
        println!("{}", serde_json::to_string(&layout)?);
    } else {
        print_layout(&layout, settings);
    }
    Ok(())
}

fn print_layout(layout: &TrayLayoutResult, settings: &Settings) {
    print_grid("front tray", &layout.front_tray);
    print_grid("back tray", &layout.back_tray);

    let unit = &settings.optimizer.max_weight_unit;
    println!(
        "final com ({:.2}, {:.2}), displacement {:.3}",
        layout.final_com.x, layout.final_com.y, layout.displacement
    );
    println!(
        "total weight {:.1} g ({:.2} {unit}, budget {} {unit})",
        layout.total_weight,
        units::from_grams(layout.total_weight, unit),
        settings.optimizer.max_weight
    );
}

fn print_grid(name: &str, grid: &[Vec<u8>]) {
    if grid.is_empty() {
        println!("{name}: (empty)");
        return;
    }
    println!("{name}:");
    for row in grid {
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        println!("  {}", cells.join(" "));
    }
}
