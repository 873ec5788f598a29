use std::f32::consts::PI;

/// 4-term Blackman-Harris window.
pub fn blackman_harris(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    let (a0, a1, a2, a3) = (0.35875f32, 0.48829f32, 0.14128f32, 0.01168f32);
    let denom = (size - 1) as f32;
    (0..size)
        .map(|i| {
            let x = 2.0 * PI * i as f32 / denom;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos() - a3 * (3.0 * x).cos()
        })
        .collect()
}

pub fn apply(samples: &mut [f32], window: &[f32]) {
    for (s, w) in samples.iter_mut().zip(window) {
        *s *= *w;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tapers_to_near_zero_at_edges() {
        let w = blackman_harris(256);
        assert!(w[0] < 1e-3);
        assert!(w[255] < 1e-3);
        assert!(w[128] > 0.99);
    }
}
