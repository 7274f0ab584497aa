//! End-to-end tests against the real ONNX model pair
//!
//! These require the exported encoder/decoder models on disk; point
//! `GLIDETYPE_MODEL_DIR` at the directory containing them.

use glidetype::{EngineConfig, OnnxSwipeEngine, Point, SwipeInput};

fn model_dir() -> String {
    std::env::var("GLIDETYPE_MODEL_DIR")
        .unwrap_or_else(|_| "/opt/glidetype/models/swipe-character".to_string())
}

/// Straight swipe between two key centers on the default 1080x400 layout,
/// evenly spaced over the given duration.
fn straight_swipe(from: Point, to: Point, samples: usize, duration_ms: u64) -> SwipeInput {
    let points = (0..samples)
        .map(|i| {
            let t = i as f32 / (samples - 1) as f32;
            Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
        })
        .collect();
    let timestamps = (0..samples as u64)
        .map(|i| i * duration_ms / (samples as u64 - 1))
        .collect();
    SwipeInput::new(points, timestamps).unwrap()
}

#[test]
#[ignore = "Requires ONNX model files"]
fn test_h_to_i_swipe_ranks_hi_near_top() {
    let mut engine = OnnxSwipeEngine::from_model_dir(model_dir(), EngineConfig::default())
        .expect("Failed to load model");

    // 'h' home-row center to 'i' top-row center, 5 points over 100ms
    let input = straight_swipe(Point::new(648.0, 150.0), Point::new(810.0, 50.0), 5, 100);
    let result = engine.predict(&input).expect("Prediction failed");

    assert!(!result.is_empty(), "expected at least one candidate");
    let rank = result.words.iter().position(|w| w == "hi");
    assert!(
        matches!(rank, Some(r) if r < 3),
        "expected 'hi' near the top, got {:?}",
        result.words
    );
}

#[test]
#[ignore = "Requires ONNX model files"]
fn test_long_gesture_is_truncated_not_rejected() {
    let mut engine = OnnxSwipeEngine::from_model_dir(model_dir(), EngineConfig::default())
        .expect("Failed to load model");

    let input = straight_swipe(Point::new(100.0, 150.0), Point::new(980.0, 150.0), 400, 2000);
    let result = engine.predict(&input);

    assert!(result.is_ok(), "overlong gesture should not error: {:?}", result.err());
}

#[test]
#[ignore = "Requires ONNX model files"]
fn test_predictions_are_stable_across_calls() {
    let mut engine = OnnxSwipeEngine::from_model_dir(model_dir(), EngineConfig::default())
        .expect("Failed to load model");

    let input = straight_swipe(Point::new(648.0, 150.0), Point::new(810.0, 50.0), 5, 100);
    let first = engine.predict(&input).expect("Prediction failed");
    let second = engine.predict(&input).expect("Prediction failed");

    assert_eq!(first, second);
}
