use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array1;
use topiclass::{
    CategoryTable, EncodedInput, ModelHost, PredictionError, SequenceClassifier, TextEncoder,
};

struct ByteEncoder;

impl TextEncoder for ByteEncoder {
    fn encode(&self, text: &str) -> Result<EncodedInput, PredictionError> {
        let ids: Vec<u32> = text.bytes().take(512).map(u32::from).collect();
        Ok(EncodedInput::from_ids(&ids))
    }
}

/// Cheap stand-in for a forward pass so the benchmark measures the host's
/// own work: encoding hand-off, softmax, ranking and label mapping.
struct HashLogits {
    width: usize,
}

impl SequenceClassifier for HashLogits {
    fn num_labels(&self) -> Option<usize> {
        Some(self.width)
    }

    fn infer(&self, input: &EncodedInput) -> Result<Array1<f32>, PredictionError> {
        let seed = input
            .input_ids
            .iter()
            .fold(0i64, |acc, &id| acc.wrapping_mul(31).wrapping_add(id));
        Ok(Array1::from_shape_fn(self.width, |i| {
            (seed.wrapping_add(i as i64 * 7919) % 1000) as f32 / 100.0
        }))
    }
}

fn setup_benchmark_host(width: usize) -> ModelHost {
    let labels: Vec<String> = (0..width).map(|i| format!("category_{}", i)).collect();
    ModelHost::from_parts(
        ByteEncoder,
        HashLogits { width },
        CategoryTable::new(labels).unwrap(),
    )
    .unwrap()
}

fn bench_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("Predict");

    // Configure sampling
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    for width in [4, 20, 1000] {
        let host = setup_benchmark_host(width);
        group.bench_function(format!("{}_categories", width), |b| b.iter(|| {
            host.predict(black_box("This is a test sentence about space exploration")).unwrap()
        }));
    }

    let host = setup_benchmark_host(20);
    let long_text = "Scientists discover evidence of ancient microbial life on Mars. ".repeat(40);
    group.bench_function("long_text", |b| b.iter(|| {
        host.predict(black_box(&long_text)).unwrap()
    }));

    group.finish();
}

criterion_group!(benches, bench_predict);
criterion_main!(benches);
