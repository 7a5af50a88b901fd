use ndarray::Array1;

/// Softmax over a logit vector. The maximum is subtracted before
/// exponentiating so large logits cannot overflow.
pub(crate) fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    if logits.is_empty() {
        return Array1::zeros(0);
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps = logits.mapv(|x| (x - max).exp());
    let sum = exps.sum();
    exps / sum
}

/// Indices of the `k` largest values, largest first. Equal values keep index
/// order, so the result is stable for ties.
pub(crate) fn top_k(values: &Array1<f32>, k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));
    indices.truncate(k);
    indices
}

/// Scales a probability to a percentage rounded to two decimals.
pub(crate) fn to_percent(probability: f32) -> f64 {
    (f64::from(probability) * 100.0 * 100.0).round() / 100.0
}
