use thiserror::Error;

/// Everything an allocation request can fail with.
///
/// Invalid-parameter failures leave the arena untouched. `OutOfMemory`
/// also leaves it untouched: every previously returned pointer stays
/// valid and later requests may still succeed (for example from the
/// free-lists).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  /// Requested size was zero or larger than `isize::MAX`.
  #[error("invalid allocation size: {0}")]
  InvalidSize(usize),

  /// Alignment was not a power of two, or exceeded the requested size.
  /// Callers needing stricter alignment than their payload is large must
  /// pad the size themselves.
  #[error("invalid alignment {align} for size {size}")]
  InvalidAlign {
    size: usize,
    align: usize,
  },

  /// The arena's minimum field size was set to zero, so no field can
  /// ever be produced.
  #[error("arena has a zero minimum field size")]
  MinimumFieldSizeZero,

  /// The page source refused to produce a new field.
  #[error("page source could not supply a new field")]
  OutOfMemory,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_names_the_failing_parameters() {
    assert_eq!(
      AllocError::InvalidSize(0).to_string(),
      "invalid allocation size: 0"
    );
    assert_eq!(
      AllocError::InvalidAlign { size: 8, align: 16 }.to_string(),
      "invalid alignment 16 for size 8"
    );
    assert_eq!(
      AllocError::OutOfMemory.to_string(),
      "page source could not supply a new field"
    );
  }
}
