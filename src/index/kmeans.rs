//! K-means clustering used by the coarse quantizer and the PQ codebooks.

/// Iterations of Lloyd refinement after seeding.
pub const KMEANS_ITERATIONS: usize = 25;

/// K-means with k-means++ seeding over a contiguous arena of `n` vectors,
/// each `dim` floats. Returns `k * dim` centroids.
///
/// When there are fewer points than centroids, each point becomes its own
/// centroid and the remainder are zero vectors; callers clamp `k` to avoid
/// relying on the padding.
pub fn kmeans(data: &[f32], dim: usize, k: usize, seed: u64) -> Vec<f32> {
    let n = data.len() / dim;
    if n <= k {
        let mut centroids = vec![0.0f32; k * dim];
        centroids[..n * dim].copy_from_slice(&data[..n * dim]);
        return centroids;
    }

    let mut rng = XorShiftRng::new(seed);
    let mut centroids = vec![0.0f32; k * dim];

    // k-means++ seeding: first centroid uniform, the rest weighted by
    // squared distance to the nearest chosen centroid.
    let first = rng.next_usize() % n;
    centroids[..dim].copy_from_slice(&data[first * dim..(first + 1) * dim]);

    let mut min_dists = vec![f32::MAX; n];

    for ci in 1..k {
        let last = &centroids[(ci - 1) * dim..ci * dim];
        let mut total = 0.0f64;
        for i in 0..n {
            let point = &data[i * dim..(i + 1) * dim];
            let d = sq_dist(point, last);
            if d < min_dists[i] {
                min_dists[i] = d;
            }
            total += min_dists[i] as f64;
        }

        if total < 1e-30 {
            // All remaining points coincide with existing centroids
            let idx = rng.next_usize() % n;
            centroids[ci * dim..(ci + 1) * dim]
                .copy_from_slice(&data[idx * dim..(idx + 1) * dim]);
            continue;
        }

        let threshold = rng.next_f64() * total;
        let mut cumulative = 0.0f64;
        let mut chosen = n - 1;
        for (i, &d) in min_dists.iter().enumerate() {
            cumulative += d as f64;
            if cumulative >= threshold {
                chosen = i;
                break;
            }
        }
        centroids[ci * dim..(ci + 1) * dim]
            .copy_from_slice(&data[chosen * dim..(chosen + 1) * dim]);
    }

    // Lloyd iterations
    let mut assignments = vec![0u32; n];
    for _ in 0..KMEANS_ITERATIONS {
        for i in 0..n {
            let point = &data[i * dim..(i + 1) * dim];
            let mut best = 0u32;
            let mut best_dist = f32::MAX;
            for ci in 0..k {
                let centroid = &centroids[ci * dim..(ci + 1) * dim];
                let d = sq_dist(point, centroid);
                if d < best_dist {
                    best_dist = d;
                    best = ci as u32;
                }
            }
            assignments[i] = best;
        }

        let mut counts = vec![0u32; k];
        centroids.fill(0.0);
        for i in 0..n {
            let ci = assignments[i] as usize;
            counts[ci] += 1;
            let point = &data[i * dim..(i + 1) * dim];
            let c = &mut centroids[ci * dim..(ci + 1) * dim];
            for d in 0..dim {
                c[d] += point[d];
            }
        }
        for ci in 0..k {
            if counts[ci] > 0 {
                let inv = 1.0 / counts[ci] as f32;
                for val in &mut centroids[ci * dim..(ci + 1) * dim] {
                    *val *= inv;
                }
            }
        }
    }

    centroids
}

/// Index of the centroid nearest to `point` under squared Euclidean distance.
pub fn nearest_centroid(centroids: &[f32], dim: usize, point: &[f32]) -> usize {
    let k = centroids.len() / dim;
    let mut best = 0;
    let mut best_dist = f32::MAX;
    for ci in 0..k {
        let d = sq_dist(point, &centroids[ci * dim..(ci + 1) * dim]);
        if d < best_dist {
            best_dist = d;
            best = ci;
        }
    }
    best
}

/// Squared Euclidean distance.
#[inline]
pub fn sq_dist(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for i in 0..a.len() {
        let d = a[i] - b[i];
        sum += d * d;
    }
    sum
}

/// Dot product.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for i in 0..a.len() {
        sum += a[i] * b[i];
    }
    sum
}

/// Deterministic xorshift64 PRNG. Training is seeded with a fixed value so
/// that building the same corpus twice yields the same quantizer.
struct XorShiftRng {
    state: u64,
}

impl XorShiftRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x517cc1b727220a95 | 1,
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_usize(&mut self) -> usize {
        self.next_u64() as usize
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}
