//! Bounded-sum exponent tuple enumeration.
//!
//! The SOS monomial vector for degree `d` over `k` variables is every
//! exponent tuple with component sum at most `d`, enumerated odometer-style
//! starting from the all-zeros tuple.

/// Advances `current` to the next tuple with every component `<= bound`.
/// Returns `false` once the odometer wraps past the last tuple.
fn next_tuple(current: &mut [u32], bound: u32) -> bool {
    let mut i = 0;
    while i < current.len() && current[i] == bound {
        current[i] = 0;
        i += 1;
    }
    if i == current.len() {
        return false;
    }
    current[i] += 1;
    true
}

/// Advances `current` to the next tuple whose component sum is `<= bound`.
pub fn next_vector_bounded_sum(current: &mut [u32], bound: u32) -> bool {
    loop {
        if !next_tuple(current, bound) {
            return false;
        }
        let sum: u32 = current.iter().sum();
        if sum <= bound {
            return true;
        }
    }
}

/// All tuples of length `len` with component sum `<= bound`, all-zeros
/// first.
pub fn bounded_sum_vectors(len: usize, bound: u32) -> Vec<Vec<u32>> {
    let mut current = vec![0u32; len];
    let mut result = vec![current.clone()];
    while next_vector_bounded_sum(&mut current, bound) {
        result.push(current.clone());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zeros_comes_first() {
        let vectors = bounded_sum_vectors(2, 2);
        assert_eq!(vectors[0], vec![0, 0]);
    }

    #[test]
    fn degree_zero_is_the_constant_tuple_alone() {
        assert_eq!(bounded_sum_vectors(3, 0), vec![vec![0, 0, 0]]);
    }

    #[test]
    fn counts_match_stars_and_bars() {
        // tuples of length 2 with sum <= 2: C(2+2, 2) = 6
        assert_eq!(bounded_sum_vectors(2, 2).len(), 6);
        // tuples of length 3 with sum <= 3: C(3+3, 3) = 20
        assert_eq!(bounded_sum_vectors(3, 3).len(), 20);
    }

    #[test]
    fn every_tuple_respects_the_bound() {
        for tuple in bounded_sum_vectors(4, 3) {
            assert!(tuple.iter().sum::<u32>() <= 3);
        }
    }

    #[test]
    fn empty_tuple_has_one_element() {
        assert_eq!(bounded_sum_vectors(0, 5), vec![Vec::<u32>::new()]);
    }
}
