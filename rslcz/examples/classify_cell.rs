// Example: classifying a single cell from its morphology parameters
// Prints the assigned LCZ class and the score table of the tied classes
use anyhow::Result;
use rslcz::lcz::{MorphologyParameter::*, MorphologyParameterSet, RmsepClassifier};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Example: RMSEP classification of one cell ===\n");

    let parameters = MorphologyParameterSet::new()
        .with(SkyViewFactor, 0.55)
        .with(AspectRatio, 0.6)
        .with(BuildingSurfaceFraction, 30.0)
        .with(ImperviousSurfaceFraction, 35.0)
        .with(PerviousSurfaceFraction, 35.0)
        .with(HeightRoughness, 14.0)
        .with(SurfaceAlbedo, 0.18);

    let classifier = RmsepClassifier::default();
    let result = classifier.classify(&parameters)?;

    println!("{}", classifier.summary(&result));
    println!(
        "LCZ {} -> code {}, colour {}",
        result.class,
        result.class.code(),
        result.class.color()
    );

    // Fractions that do not add up are rejected before any scoring
    let broken = parameters.with(PerviousSurfaceFraction, 20.0);
    match classifier.classify(&broken) {
        Ok(_) => println!("unexpected success"),
        Err(e) => println!("Rejected: {}", e),
    }

    Ok(())
}
