//! Runs against a real exported model. Point `TOPICLASS_TEST_MODEL` at a
//! directory with `model.onnx`, `tokenizer.json` and `config.json`, then run
//! `cargo test -- --ignored`.

use std::path::PathBuf;

use topiclass::{DevicePreference, ModelHost, ModelLoadError, RuntimeConfig, TOP_K};

fn model_dir() -> PathBuf {
    PathBuf::from(std::env::var("TOPICLASS_TEST_MODEL").expect("TOPICLASS_TEST_MODEL must be set"))
}

fn cpu() -> RuntimeConfig {
    RuntimeConfig {
        device: DevicePreference::Cpu,
        ..RuntimeConfig::default()
    }
}

#[test]
#[ignore]
fn test_real_model_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let host = ModelHost::builder()
        .with_model_dir(model_dir())
        .with_runtime_config(cpu())
        .build()?;

    let predictions = host.predict("This is a test sentence about space exploration")?;
    assert_eq!(predictions.len(), TOP_K.min(host.categories().len()));
    assert!(predictions.windows(2).all(|w| w[0].probability >= w[1].probability));

    let total: f32 = host.distribution("space exploration")?.sum();
    assert!((total - 1.0).abs() < 1e-5);

    // Inputs far beyond the token limit are truncated, not rejected.
    assert!(host.predict(&"rocket launch ".repeat(2000)).is_ok());
    assert!(host.predict("").is_ok());
    Ok(())
}

#[test]
#[ignore]
fn test_real_model_rejects_wrong_category_count() -> Result<(), Box<dyn std::error::Error>> {
    let width = ModelHost::builder()
        .with_model_dir(model_dir())
        .with_runtime_config(cpu())
        .build()?
        .categories()
        .len();

    let result = ModelHost::builder()
        .with_model_dir(model_dir())
        .with_runtime_config(cpu())
        .with_category_labels(vec!["only", "two"])?
        .build();

    if width == 2 {
        assert!(result.is_ok());
    } else {
        match result {
            Err(ModelLoadError::LabelMismatch { expected, actual }) => {
                assert_eq!(expected, 2);
                assert_eq!(actual, width);
            }
            other => panic!("expected a label mismatch, got {:?}", other),
        }
    }
    Ok(())
}
