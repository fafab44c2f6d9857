/// Mean and population standard deviation of `scores` in a single pass
/// (Welford's update). Both are 0.0 when there are no scores.
pub fn mean_and_stddev(scores: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let mut count = 0usize;
    let mut mean = 0.0;
    let mut sum_sq = 0.0;

    for score in scores {
        count += 1;
        let delta = score - mean;
        mean += delta / count as f64;
        sum_sq += delta * (score - mean);
    }

    if count == 0 {
        return (0.0, 0.0);
    }
    (mean, (sum_sq / count as f64).sqrt())
}
