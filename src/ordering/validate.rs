//! Sequence validation.
//!
//! Confirms a reconstructed sequence is a bijection over the frame
//! indices: right length, every index in range, no duplicates, no
//! omissions. The only correctness check standing between a silent
//! tie-break defect and a corrupted output video.

use thiserror::Error;

/// Ways a sequence can fail permutation validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Sequence length differs from the frame count.
    #[error("sequence length {actual} does not match frame count {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// An index is outside `[0, n)`.
    #[error("index {index} out of range for {len} frames")]
    IndexOutOfRange { index: usize, len: usize },

    /// An index appears more than once.
    #[error("index {0} appears more than once")]
    DuplicateIndex(usize),

    /// An index never appears.
    #[error("index {0} is missing from the sequence")]
    MissingIndex(usize),
}

/// Validate that `sequence` is a permutation of `[0, n)`.
///
/// Does not mutate its input; returns the first defect found.
pub fn validate_sequence(sequence: &[usize], n: usize) -> Result<(), ValidationError> {
    if sequence.len() != n {
        return Err(ValidationError::LengthMismatch {
            expected: n,
            actual: sequence.len(),
        });
    }

    let mut seen = vec![false; n];
    for &index in sequence {
        if index >= n {
            return Err(ValidationError::IndexOutOfRange { index, len: n });
        }
        if seen[index] {
            return Err(ValidationError::DuplicateIndex(index));
        }
        seen[index] = true;
    }

    // Length and uniqueness together imply completeness, but report the
    // missing index explicitly for diagnostics.
    if let Some(missing) = seen.iter().position(|&s| !s) {
        return Err(ValidationError::MissingIndex(missing));
    }

    Ok(())
}

/// Boolean convenience wrapper around [`validate_sequence`].
pub fn is_permutation(sequence: &[usize], n: usize) -> bool {
    validate_sequence(sequence, n).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_permutation_passes() {
        assert!(validate_sequence(&[2, 0, 3, 1], 4).is_ok());
        assert!(is_permutation(&[0], 1));
    }

    #[test]
    fn empty_sequence_with_zero_frames_passes() {
        assert!(validate_sequence(&[], 0).is_ok());
    }

    #[test]
    fn wrong_length_is_reported() {
        assert_eq!(
            validate_sequence(&[0, 1], 3),
            Err(ValidationError::LengthMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn out_of_range_index_is_reported() {
        assert_eq!(
            validate_sequence(&[0, 5, 2], 3),
            Err(ValidationError::IndexOutOfRange { index: 5, len: 3 })
        );
    }

    #[test]
    fn duplicate_index_is_reported() {
        assert_eq!(
            validate_sequence(&[0, 1, 1], 3),
            Err(ValidationError::DuplicateIndex(1))
        );
    }
}
