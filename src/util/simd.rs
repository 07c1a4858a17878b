//! SIMD kernels for vector similarity using the `wide` crate.
//!
//! Inputs shorter than [`SIMD_THRESHOLD`] go through plain scalar loops so
//! that small vectors keep the exact summation order of a sequential loop.

use wide::f32x8;

/// Minimum slice length for which the f32x8 path is taken.
pub const SIMD_THRESHOLD: usize = 16;

/// Vector math over equal-length float slices.
pub mod numeric {
    use super::*;

    /// Dot product of two equal-length slices.
    pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());

        if a.len() < SIMD_THRESHOLD {
            return a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        }

        let chunks_a = a.chunks_exact(8);
        let chunks_b = b.chunks_exact(8);
        let remainder_a = chunks_a.remainder();
        let remainder_b = chunks_b.remainder();

        let mut dot_vec = f32x8::splat(0.0);
        for (chunk_a, chunk_b) in chunks_a.zip(chunks_b) {
            dot_vec = dot_vec + load(chunk_a) * load(chunk_b);
        }

        let mut total = dot_vec.to_array().iter().sum::<f32>();
        total += remainder_a
            .iter()
            .zip(remainder_b.iter())
            .map(|(x, y)| x * y)
            .sum::<f32>();
        total
    }

    /// Squared euclidean distance of two equal-length slices.
    pub fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());

        if a.len() < SIMD_THRESHOLD {
            return a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| {
                    let diff = x - y;
                    diff * diff
                })
                .sum();
        }

        let chunks_a = a.chunks_exact(8);
        let chunks_b = b.chunks_exact(8);
        let remainder_a = chunks_a.remainder();
        let remainder_b = chunks_b.remainder();

        let mut sum_vec = f32x8::splat(0.0);
        for (chunk_a, chunk_b) in chunks_a.zip(chunks_b) {
            let diff = load(chunk_a) - load(chunk_b);
            sum_vec = sum_vec + diff * diff;
        }

        let mut total = sum_vec.to_array().iter().sum::<f32>();
        total += remainder_a
            .iter()
            .zip(remainder_b.iter())
            .map(|(x, y)| {
                let diff = x - y;
                diff * diff
            })
            .sum::<f32>();
        total
    }

    /// Squared L2 norm of a slice.
    pub fn squared_norm(a: &[f32]) -> f32 {
        dot_product(a, a)
    }

    fn load(chunk: &[f32]) -> f32x8 {
        f32x8::new([
            chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::numeric::*;

    fn sample(len: usize, seed: f32) -> Vec<f32> {
        (0..len).map(|i| ((i as f32 + seed) * 0.37).sin()).collect()
    }

    #[test]
    fn test_small_vectors_use_exact_scalar_path() {
        assert_eq!(dot_product(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
        assert_eq!(squared_distance(&[1.0, 2.0, 3.0, 4.0], &[1.0, 5.0, 4.0, 3.0]), 11.0);
        assert_eq!(squared_norm(&[3.0, 4.0]), 25.0);
    }

    #[test]
    fn test_simd_matches_scalar() {
        let a = sample(37, 1.0);
        let b = sample(37, 2.5);

        let scalar_dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let scalar_dist: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();

        assert!((dot_product(&a, &b) - scalar_dot).abs() < 1e-4);
        assert!((squared_distance(&a, &b) - scalar_dist).abs() < 1e-4);
    }
}
