//! Shared helpers

pub mod constants;

/// `n` evenly spaced samples over `[start, end]`, both ends included
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut samples: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            samples[n - 1] = end;
            samples
        }
    }
}

/// Whether two points coincide up to [`constants::ATTACHMENT_TOLERANCE`]
pub fn points_match(a: [f64; 2], b: [f64; 2]) -> bool {
    a.iter().zip(b.iter()).all(|(p, q)| {
        (p - q).abs() <= constants::ATTACHMENT_TOLERANCE * (1.0 + p.abs().max(q.abs()))
    })
}
