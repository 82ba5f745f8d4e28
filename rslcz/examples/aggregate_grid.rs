// Example: full LCZ run on an in-memory grid
// Builds small synthetic rasters, aggregates them over a GeoJSON grid and
// classifies every cell
use anyhow::{Context, Result};
use geojson::GeoJson;
use rslcz::pipeline::{LczPipeline, PipelineInputs};
use rslcz::raster::{Raster, RasterMeta};
use rslcz::{PipelineConfig, PolygonGrid};

const GRID: &str = r#"
{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "properties": { "id": 1, "mean_build_height": 32.0,
                            "sky_view_factor": 0.3, "terrain_roughness": 8 },
            "geometry": { "type": "Polygon",
                          "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]] }
        },
        {
            "type": "Feature",
            "properties": { "id": 2, "mean_build_height": 0.0, "sky_view_factor": 0.95 },
            "geometry": { "type": "Polygon",
                          "coordinates": [[[10, 0], [20, 0], [20, 10], [10, 10], [10, 0]]] }
        }
    ]
}
"#;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Example: aggregating rasters over a grid ===\n");

    let geojson: GeoJson = GRID.parse().context("Failed to parse grid GeoJSON")?;
    let mut grid = PolygonGrid::from_geojson(&geojson, Some("id"))?;

    // 20 x 10 rasters at 1 m, origin top-left at (0, 10)
    let meta = RasterMeta::new(20, 10, 0.0, 10.0, 1.0, 1.0)?;
    let mut land_cover = Raster::filled(meta.clone(), 1.0);
    let mut dsm = Raster::filled(meta.clone(), 0.0);
    let mut distance = Raster::filled(meta.clone(), 0.0);
    let dtm = Raster::filled(meta.clone(), 5.0);
    let albedo = Raster::filled(meta, 1500.0);

    for row in 0..10 {
        for col in 0..10 {
            // left cell: half buildings, the rest paved
            let building = (row + col) % 2 == 0;
            land_cover.set_value(row, col, if building { 2.0 } else { 0.0 })?;
            dsm.set_value(row, col, if building { 35.0 } else { 0.0 })?;
            distance.set_value(row, col, if building { 0.0 } else { 8.0 })?;
        }
    }

    let inputs = PipelineInputs::new()
        .with_distance(&distance)
        .with_dsm(&dsm)
        .with_dtm(&dtm)
        .with_land_cover(&land_cover)
        .with_albedo(&albedo);

    let pipeline = LczPipeline::new(PipelineConfig::default());
    let report = pipeline.run(&mut grid, &inputs)?;
    println!("{}", report);

    for feature in grid.features() {
        println!(
            "cell {}: LCZ {} (rmsep {})",
            feature.id,
            feature.get("lcz_class").map_or("-".to_string(), |v| v.to_string()),
            feature.get("lcz_rmsep").map_or("-".to_string(), |v| v.to_string()),
        );
    }

    println!("\n{}", serde_json::to_string_pretty(&grid.to_geojson())?);
    Ok(())
}
