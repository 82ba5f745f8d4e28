// Example: LCZ run on GeoTIFF inputs read through GDAL
// Usage: cargo run --example lcz_from_rasters --features gdal -- <grid.geojson> <land_cover.tif> [config.json]
use anyhow::{bail, Context, Result};
use geojson::GeoJson;
use rslcz::config::load_config;
use rslcz::pipeline::{LczPipeline, PipelineInputs};
use rslcz::raster::GdalRaster;
use rslcz::{PipelineConfig, PolygonGrid};
use std::path::Path;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        bail!("usage: {} <grid.geojson> <land_cover.tif> [config.json]", args[0]);
    }

    let config = match args.get(3) {
        Some(path) => load_config(Path::new(path))?,
        None => PipelineConfig::default(),
    };

    let text = std::fs::read_to_string(&args[1])
        .with_context(|| format!("Failed to read grid {}", args[1]))?;
    let geojson: GeoJson = text.parse().context("Failed to parse grid GeoJSON")?;
    let mut grid = PolygonGrid::from_geojson(&geojson, None)?;

    let land_cover = GdalRaster::open(&args[2])?;
    let inputs = PipelineInputs::new().with_land_cover(&land_cover);

    let pipeline = LczPipeline::new(config);
    let report = pipeline.run(&mut grid, &inputs)?;
    println!("{}", report);

    let output = Path::new(&args[1]).with_extension("lcz.geojson");
    std::fs::write(&output, grid.to_geojson().to_string())
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Grid written to {}", output.display());
    Ok(())
}
