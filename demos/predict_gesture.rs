/// Predict words for a recorded swipe gesture
///
/// Usage: cargo run --release --example predict_gesture <model_dir> <gesture.json>
///
/// The gesture file is a JSON-serialized `SwipeInput`:
/// {"points": [{"x": 648.0, "y": 150.0}, ...], "timestamps": [0, 25, ...]}

use anyhow::{Context, Result};
use glidetype::{EngineConfig, OnnxSwipeEngine, SwipeInput};
use std::env;
use std::process;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <model_dir> <gesture.json>", args[0]);
        process::exit(1);
    }

    let model_dir = &args[1];
    let gesture_file = &args[2];

    println!("Model: {}", model_dir);
    println!("Gesture: {}", gesture_file);

    let contents = std::fs::read_to_string(gesture_file)
        .with_context(|| format!("Failed to read {}", gesture_file))?;
    let input: SwipeInput =
        serde_json::from_str(&contents).context("Failed to parse gesture file")?;
    println!(
        "Loaded gesture: {} points over {}ms",
        input.len(),
        input.duration_ms()
    );

    let mut engine = OnnxSwipeEngine::from_model_dir(model_dir, EngineConfig::default())
        .context("Failed to load model")?;

    let start = std::time::Instant::now();
    let result = engine.predict(&input).context("Prediction failed")?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    if result.is_empty() {
        println!("No predictions above the confidence threshold");
    } else {
        println!("Predictions ({:.2}ms):", elapsed_ms);
        for (i, (word, score)) in result.words.iter().zip(result.scores.iter()).enumerate() {
            println!("  #{}: {} ({})", i + 1, word, score);
        }
    }

    Ok(())
}
