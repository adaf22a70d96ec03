/// Allocation counters sampled through [`Arena::stats`](crate::Arena::stats).
///
/// Purely observational; nothing in the allocator branches on these.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
  /// Allocations served, from either path.
  pub allocs: usize,

  /// Blocks returned through `free`.
  pub frees: usize,

  /// Sum of the recorded sizes of currently live blocks. Recorded sizes
  /// include alignment slack, so this can exceed the bytes callers asked
  /// for.
  pub memory_inuse: usize,

  /// Cumulative bytes callers have requested.
  pub total_memory_requested: usize,
}

impl ArenaStats {
  pub(crate) fn record_alloc(
    &mut self,
    requested: usize,
    block_size: usize,
  ) {
    self.allocs += 1;
    self.total_memory_requested += requested;
    self.memory_inuse += block_size;
  }

  pub(crate) fn record_free(
    &mut self,
    block_size: usize,
  ) {
    self.frees += 1;
    self.memory_inuse = self.memory_inuse.saturating_sub(block_size);
  }

  pub(crate) fn reset(&mut self) {
    *self = Self::default();
  }
}
