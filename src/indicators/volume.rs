/// Fractional volume change from the previous bar
///
/// The first bar, and any bar following zero volume, is 0.
pub fn calculate_volume_change(volumes: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(volumes.len());
    for i in 0..volumes.len() {
        if i == 0 || volumes[i - 1] <= 0.0 {
            out.push(0.0);
        } else {
            out.push((volumes[i] - volumes[i - 1]) / volumes[i - 1]);
        }
    }
    out
}
