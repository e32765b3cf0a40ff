//! Partial ordering of point ranges into buckets.
//!
//! STR only needs every element of one bucket to be no larger than every element of the next
//! bucket; order inside a bucket is thrown away by the next partition pass. [`bucketize`]
//! places each bucket boundary with Floyd-Rivest [`select`], which is linear in expectation.

use std::cmp;

/// A sequence that can be reordered in place by comparing keys.
pub trait Partition {
    /// The value elements are ordered by.
    type Key: PartialOrd + Copy;

    /// The number of elements.
    fn len(&self) -> usize;

    /// The ordering key of the element at `i`.
    fn key(&self, i: usize) -> Self::Key;

    /// Swap the elements at `i` and `j`.
    fn swap(&mut self, i: usize, j: usize);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: PartialOrd + Copy> Partition for [T] {
    type Key = T;

    #[inline]
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    #[inline]
    fn key(&self, i: usize) -> T {
        self[i]
    }

    #[inline]
    fn swap(&mut self, i: usize, j: usize) {
        <[T]>::swap(self, i, j)
    }
}

/// Ranges wider than this are first narrowed around an estimate of where rank `k` falls.
const SAMPLE_THRESHOLD: usize = 600;

/// Floyd-Rivest selection: reorder `data[left..=right]` so that the element at `k` is the one
/// that would be there if the range were sorted, every element before it is no larger and every
/// element after it is no smaller.
pub fn select<P: Partition + ?Sized>(data: &mut P, k: usize, mut left: usize, mut right: usize) {
    debug_assert!(left <= k && k <= right && right < data.len());

    while right > left {
        if right - left > SAMPLE_THRESHOLD {
            let n = (right - left + 1) as f64;
            let m = (k - left + 1) as f64;
            let z = f64::ln(n);
            let s = 0.5 * f64::exp((2.0 * z) / 3.0);
            let sd = 0.5
                * f64::sqrt((z * s * (n - s)) / n)
                * (if m - n / 2.0 < 0.0 { -1.0 } else { 1.0 });
            let new_left = cmp::max(left, f64::floor(k as f64 - (m * s) / n + sd) as usize);
            let new_right = cmp::min(
                right,
                f64::floor(k as f64 + ((n - m) * s) / n + sd) as usize,
            );
            select(data, k, new_left, new_right);
        }

        let t = data.key(k);
        let mut i = left;
        let mut j = right;

        data.swap(left, k);
        if data.key(right) > t {
            data.swap(left, right);
        }

        while i < j {
            data.swap(i, j);
            i += 1;
            j -= 1;
            while data.key(i) < t {
                i += 1;
            }
            while data.key(j) > t {
                j -= 1;
            }
        }

        if data.key(left) == t {
            data.swap(left, j);
        } else {
            j += 1;
            data.swap(j, right);
        }

        if j <= k {
            left = j + 1;
        }
        if k <= j {
            right = j.saturating_sub(1);
        }
    }
}

/// Reorder `data` into consecutive buckets of `bucket_size` elements (the last one may be
/// shorter) such that no element of a bucket is larger than any element of a later bucket.
///
/// Pending ranges are kept on `stack` instead of the call stack; the buffer is cleared first
/// and its capacity is kept for reuse.
pub fn bucketize<P: Partition + ?Sized>(data: &mut P, bucket_size: usize, stack: &mut Vec<usize>) {
    debug_assert!(bucket_size > 0);

    stack.clear();
    stack.push(0);
    stack.push(data.len());

    // Half-open ranges whose bounds are multiples of `bucket_size`, except for the final end.
    while let (Some(right), Some(left)) = (stack.pop(), stack.pop()) {
        if right - left <= bucket_size {
            continue;
        }

        let num_buckets = (right - left).div_ceil(bucket_size);
        let mid = left + (num_buckets / 2) * bucket_size;
        select(data, mid, left, right - 1);

        stack.push(left);
        stack.push(mid);
        stack.push(mid);
        stack.push(right);
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::points::{Axis, AxisSlice};

    fn assert_selected(values: &[f64], k: usize) {
        let pivot = values[k];
        assert!(values[..k].iter().all(|v| *v <= pivot), "left of {k}");
        assert!(values[k + 1..].iter().all(|v| *v >= pivot), "right of {k}");
    }

    fn assert_buckets(values: &[f64], bucket_size: usize) {
        let buckets = values.chunks(bucket_size).collect::<Vec<_>>();
        for pair in buckets.windows(2) {
            let max = pair[0].iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = pair[1].iter().copied().fold(f64::INFINITY, f64::min);
            assert!(max <= min, "bucket boundary violated: {max} > {min}");
        }
    }

    #[test]
    fn select_places_rank() {
        let mut rng = StdRng::seed_from_u64(1);
        for len in [1, 2, 3, 10, 601, 602, 5_000] {
            let mut values: Vec<f64> = (0..len).map(|_| rng.gen()).collect();
            let mut sorted = values.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

            let k = rng.gen_range(0..len);
            select(values.as_mut_slice(), k, 0, len - 1);
            assert_eq!(values[k], sorted[k]);
            assert_selected(&values, k);
        }
    }

    #[test]
    fn select_with_duplicates() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut values: Vec<f64> = (0..3_000).map(|_| rng.gen_range(0..5) as f64).collect();
        let last = values.len() - 1;
        for k in [0, 1, 1_500, last] {
            select(values.as_mut_slice(), k, 0, last);
            assert_selected(&values, k);
        }
    }

    #[test]
    fn select_inner_range() {
        let mut values = vec![9., 8., 7., 6., 5., 4., 3., 2., 1., 0.];
        select(values.as_mut_slice(), 4, 2, 7);
        // Outside of the range nothing moves
        assert_eq!(&values[..2], &[9., 8.]);
        assert_eq!(&values[8..], &[1., 0.]);
        assert_eq!(values[4], 4.);
    }

    #[test]
    fn bucketize_invariant() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut stack = Vec::new();
        for (len, bucket_size) in [(0, 3), (1, 3), (4, 3), (7, 3), (10, 9), (19, 9), (20_000, 81)] {
            let mut values: Vec<f64> = (0..len).map(|_| rng.gen()).collect();
            let mut original = values.clone();
            bucketize(values.as_mut_slice(), bucket_size, &mut stack);
            assert_buckets(&values, bucket_size);

            // Only a permutation
            let mut after = values.clone();
            original.sort_by(|a, b| a.partial_cmp(b).unwrap());
            after.sort_by(|a, b| a.partial_cmp(b).unwrap());
            assert_eq!(original, after);
        }
    }

    #[test]
    fn bucketize_points_by_axis() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut points: Vec<[f64; 2]> = (0..1_000).map(|_| [rng.gen(), rng.gen()]).collect();
        let mut stack = Vec::new();

        bucketize(&mut AxisSlice::new(&mut points, Axis::X), 100, &mut stack);
        let xs = points.iter().map(|p| p[0]).collect::<Vec<_>>();
        assert_buckets(&xs, 100);

        for slab in points.chunks_mut(100) {
            bucketize(&mut AxisSlice::new(slab, Axis::Y), 10, &mut stack);
            let ys = slab.iter().map(|p| p[1]).collect::<Vec<_>>();
            assert_buckets(&ys, 10);
        }

        // Partitioning along y keeps the x slabs intact
        let xs = points.iter().map(|p| p[0]).collect::<Vec<_>>();
        assert_buckets(&xs, 100);
    }
}
