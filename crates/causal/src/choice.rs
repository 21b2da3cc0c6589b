//! Lazy subset enumeration.
//!
//! Purpose
//! - Conditioning sets in FAS, the sepset producers and BES are all "every
//!   subset of size k" or "every subset up to size d" over a candidate list.
//!
//! Why this design
//! - Iterators keep only the current index vector, so the sequence is finite,
//!   restartable (construct again) and never materialized. Order is
//!   lexicographic over indices, which fixes the tie-break for every caller
//!   that takes the first qualifying subset.

/// All k-subsets of `0..n` in lexicographic order.
#[derive(Clone, Debug)]
pub struct Choices {
    n: usize,
    idx: Vec<usize>,
    done: bool,
}

impl Choices {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            idx: (0..k).collect(),
            done: k > n,
        }
    }
}

impl Iterator for Choices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let out = self.idx.clone();
        let k = self.idx.len();
        // Advance: rightmost index that can still move.
        let mut i = k;
        loop {
            if i == 0 {
                self.done = true;
                break;
            }
            i -= 1;
            if self.idx[i] < self.n - k + i {
                self.idx[i] += 1;
                for j in i + 1..k {
                    self.idx[j] = self.idx[j - 1] + 1;
                }
                break;
            }
        }
        Some(out)
    }
}

/// All subsets of `0..n` with size `0..=depth`, smaller sizes first.
/// A negative depth means no bound.
#[derive(Clone, Debug)]
pub struct DepthChoices {
    n: usize,
    max_k: usize,
    k: usize,
    inner: Choices,
}

impl DepthChoices {
    pub fn new(n: usize, depth: i32) -> Self {
        let max_k = if depth < 0 { n } else { (depth as usize).min(n) };
        Self {
            n,
            max_k,
            k: 0,
            inner: Choices::new(n, 0),
        }
    }
}

impl Iterator for DepthChoices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        loop {
            if let Some(c) = self.inner.next() {
                return Some(c);
            }
            if self.k >= self.max_k {
                return None;
            }
            self.k += 1;
            self.inner = Choices::new(self.n, self.k);
        }
    }
}

/// Map index subsets back onto a candidate list.
pub fn pick<T: Copy>(items: &[T], idx: &[usize]) -> Vec<T> {
    idx.iter().map(|&i| items[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn binom(n: usize, k: usize) -> usize {
        if k > n {
            return 0;
        }
        (0..k).fold(1usize, |acc, i| acc * (n - i) / (i + 1))
    }

    #[test]
    fn three_choose_two_is_lexicographic() {
        let all: Vec<_> = Choices::new(3, 2).collect();
        assert_eq!(all, vec![vec![0, 1], vec![0, 2], vec![1, 2]]);
    }

    #[test]
    fn zero_subset_is_yielded_once() {
        assert_eq!(Choices::new(0, 0).collect::<Vec<_>>(), vec![Vec::<usize>::new()]);
        assert_eq!(Choices::new(4, 0).count(), 1);
        assert_eq!(Choices::new(2, 3).count(), 0);
    }

    #[test]
    fn depth_choices_grow_by_size() {
        let sizes: Vec<usize> = DepthChoices::new(3, 2).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![0, 1, 1, 1, 2, 2, 2]);
        assert_eq!(DepthChoices::new(3, -1).count(), 8);
    }

    proptest! {
        #[test]
        fn choices_count_matches_binomial(n in 0usize..9, k in 0usize..9) {
            let all: Vec<_> = Choices::new(n, k).collect();
            prop_assert_eq!(all.len(), binom(n, k));
            for w in all.windows(2) {
                prop_assert!(w[0] < w[1]);
            }
            for c in &all {
                prop_assert!(c.windows(2).all(|p| p[0] < p[1]));
                prop_assert!(c.iter().all(|&i| i < n));
            }
        }
    }
}
