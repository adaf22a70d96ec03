//! # Region allocator
//!
//! An [`Arena`] owns a LIFO chain of page-mapped fields and a set of
//! size-classed free-lists. Allocation first consults the free-lists,
//! then bumps inside the newest field, and finally grows the chain by
//! mapping a fresh field.
//!
//! ## How It Works
//!
//! ```text
//!   Arena
//!   ┌──────────────────────────┐
//!   │ head ────────────────────┼──►┌─────────┐    ┌─────────┐
//!   │ minimum_field_size       │   │ Field 2 │───►│ Field 1 │───► null
//!   │ buckets[0..17] ──┐       │   │ (newest)│    │ (oldest)│
//!   │ stats            │       │   └─────────┘    └─────────┘
//!   └──────────────────┼───────┘     bump here      reachable only
//!                      │                            via free-lists
//!                      ▼
//!      ┌──────┬──────┬──────┬─────┬──────┐
//!      │ ≤2⁵  │ ≤2⁶  │ ≤2⁷  │ ... │ rest │   one LIFO list per class
//!      └──────┴──────┴──────┴─────┴──────┘
//! ```
//!
//! ### Slot Layout
//!
//! Every allocation occupies one slot, laid out so the header can be
//! recovered from the payload pointer alone:
//!
//! ```text
//!        top (old)                                    top (new)
//!          │                                             │
//!          ▼                                             ▼
//!   ┌─────────────┬──────────────┬─────────────────┬─────┐
//!   │ size word   │ 00 00 ... 00 │     payload     │ pad │
//!   └─────────────┴──────────────┴─────────────────┴─────┘
//!          ▲        zero-fill gap ▲                       ▲
//!          │        (maybe empty) │                       │
//!          │                      └── returned pointer,   │
//!          │                          aligned as asked    │
//!          │                                              │
//!          └── recorded size = everything from the byte ──┘
//!              after the size word to the end of the slot
//! ```
//!
//! The size word doubles as the first field of a `FreeBlock` once the
//! slot is freed; the `next` link is written into the bytes right after
//! it, which are gap or payload bytes nobody owns anymore.
//!
//! ### Free And Reuse
//!
//! `free` walks backwards from the payload pointer through the zero gap,
//! rounds down to header alignment, and pushes the block onto the bucket
//! for its recorded size. A later allocation searching that bucket may
//! hand the whole block back, re-zeroing whatever gap its (possibly
//! different) alignment needs. Blocks are never split and never
//! coalesced.
//!
//! ## Thread Safety
//!
//! **Not** thread-safe. One arena per thread, or wrap it in a mutex.
//! Independent arenas may be used concurrently.

use log::debug;
use std::ptr::{self, NonNull};

use crate::align::align_up;
use crate::block::{size_class_index, FreeBlock, H_ALIGN, MIN_BLOCK_SIZE, NUM_BUCKETS, SIZE_BYTES};
use crate::error::AllocError;
use crate::field::Field;
use crate::page::{Mmap, PageSource};
use crate::stats::ArenaStats;

/// Default floor for newly mapped fields: 256 MiB. Anonymous mappings
/// are lazily committed, so the default costs address space, not RAM.
pub const DEFAULT_MINIMUM_FIELD_SIZE: usize = 256 * 1024 * 1024;

/// A growable region allocator with individual frees.
///
/// # Fields
///
/// * `head` - newest field, top of the LIFO chain; null until the first
///   bump allocation
/// * `minimum_field_size` - floor for new field capacities
/// * `buckets` - free-list heads, one per size class
/// * `stats` - observational counters
/// * `source` - where field mappings come from
///
/// # Lifetime Of Returned Pointers
///
/// A payload pointer stays valid until it is passed to [`free`](Arena::free),
/// or until [`reset`](Arena::reset) or drop, whichever comes first. The
/// arena never moves or shrinks live allocations.
pub struct Arena<S: PageSource = Mmap> {
  /// Newest field. Only this one participates in bump allocation.
  head: *mut Field,

  /// Capacity floor for fields mapped from now on. Zero renders the
  /// arena ill-formed: every allocation is refused.
  minimum_field_size: usize,

  /// Segregated free-list heads. `buckets[i]` holds freed blocks whose
  /// recorded size falls in class `i`; the last bucket takes the rest.
  buckets: [*mut FreeBlock; NUM_BUCKETS],

  /// Counters sampled via [`stats`](Arena::stats).
  stats: ArenaStats,

  /// Supplier of field mappings.
  source: S,
}

impl Arena<Mmap> {
  /// Creates an empty arena backed by anonymous mappings, with the
  /// default minimum field size.
  ///
  /// No memory is mapped until the first allocation that cannot be
  /// served from a free-list.
  pub fn new() -> Self {
    Self::with_source(Mmap)
  }

  /// Creates an empty arena with a custom field-size floor.
  ///
  /// Mostly useful for tools and tests that want small fields; the
  /// floor may also be changed later via
  /// [`set_minimum_field_size`](Arena::set_minimum_field_size).
  pub fn with_minimum_field_size(bytes: usize) -> Self {
    let mut arena = Self::new();
    arena.minimum_field_size = bytes;
    arena
  }
}

impl Default for Arena<Mmap> {
  fn default() -> Self {
    Self::new()
  }
}

impl<S: PageSource> Arena<S> {
  /// Creates an empty arena drawing its fields from `source`.
  pub fn with_source(source: S) -> Self {
    Self {
      head: ptr::null_mut(),
      minimum_field_size: DEFAULT_MINIMUM_FIELD_SIZE,
      buckets: [ptr::null_mut(); NUM_BUCKETS],
      stats: ArenaStats::default(),
      source,
    }
  }

  /// Current floor for new field capacities.
  pub fn minimum_field_size(&self) -> usize {
    self.minimum_field_size
  }

  /// Sets the floor for fields mapped from now on. Existing fields keep
  /// their size. Setting zero makes every subsequent allocation fail.
  pub fn set_minimum_field_size(
    &mut self,
    bytes: usize,
  ) {
    self.minimum_field_size = bytes;
  }

  /// Allocation counters. Observational only.
  pub fn stats(&self) -> &ArenaStats {
    &self.stats
  }

  fn validate(
    &self,
    size: usize,
    align: usize,
  ) -> Result<(), AllocError> {
    if size < 1 || size > isize::MAX as usize {
      return Err(AllocError::InvalidSize(size));
    }

    if !align.is_power_of_two() || align > size {
      return Err(AllocError::InvalidAlign { size, align });
    }

    if self.minimum_field_size == 0 {
      return Err(AllocError::MinimumFieldSizeZero);
    }

    Ok(())
  }

  /// Allocates `size` bytes aligned to `align`.
  ///
  /// `align` must be a power of two no greater than `size`; callers that
  /// need stricter alignment than their payload is large must pad `size`
  /// themselves.
  ///
  /// # Returns
  ///
  /// An `align`-aligned pointer to `size` writable bytes, or null on
  /// invalid parameters or when the page source cannot supply a new
  /// field. On failure the arena is left exactly as it was: previously
  /// returned pointers remain valid.
  ///
  /// # Allocation Strategy
  ///
  /// ```text
  ///   1. first-fit search of the free-lists, starting at the class of
  ///      `size` (alignment-aware, whole block handed back, no split)
  ///   2. bump inside the head field
  ///   3. map a new field and bump there
  /// ```
  ///
  /// # Safety
  ///
  /// The call itself has no preconditions beyond `&mut self`; the
  /// returned region is raw memory, and the caller must not touch more
  /// than `size` bytes nor use the pointer after `free`, `reset`, or
  /// drop.
  pub unsafe fn alloc(
    &mut self,
    size: usize,
    align: usize,
  ) -> *mut u8 {
    if self.validate(size, align).is_err() {
      return ptr::null_mut();
    }

    unsafe { self.alloc_inner(size, align) }
  }

  /// Allocates `size` bytes aligned to `align`, reporting failures as
  /// [`AllocError`] instead of null.
  ///
  /// Same semantics as [`alloc`](Arena::alloc) otherwise.
  ///
  /// # Safety
  ///
  /// See [`alloc`](Arena::alloc).
  pub unsafe fn try_alloc(
    &mut self,
    size: usize,
    align: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    self.validate(size, align)?;

    let payload = unsafe { self.alloc_inner(size, align) };
    NonNull::new(payload).ok_or(AllocError::OutOfMemory)
  }

  /// The shared allocation path; parameters are already validated.
  unsafe fn alloc_inner(
    &mut self,
    size: usize,
    align: usize,
  ) -> *mut u8 {
    unsafe {
      // Fast path: hand back a freed block wholesale.
      let block = self.search(size, align);
      if !block.is_null() {
        let raw = (block as *mut u8).add(SIZE_BYTES);
        let gap = align_up(raw as usize, align) - raw as usize;

        // Re-zero the gap: while the block sat on its free-list the
        // `next` link dirtied the bytes right after the size word.
        ptr::write_bytes(raw, 0, gap);

        self.stats.record_alloc(size, (*block).size);
        return raw.add(gap);
      }

      self.bump(size, align)
    }
  }

  /// Searches the free-lists for a block able to hold `size` bytes at
  /// `align` alignment, unlinking and returning the first fit.
  ///
  /// Buckets are scanned from the class of `size` upward, so a request
  /// never lands in a block too small for it. Within a bucket the walk
  /// keeps the predecessor link slot, making the unlink O(1):
  ///
  /// ```text
  ///   buckets[i] ──► [B1] ──► [B2] ──► [B3] ──► null
  ///                    ▲ prev   │
  ///                    │        ▼ winner: *prev = B2.next
  ///   buckets[i] ──► [B1] ─────────► [B3] ──► null
  /// ```
  ///
  /// A block of recorded size `bs` wins if it has worst-case alignment
  /// slack (`bs >= size + align - 1`) or, more precisely, if at least
  /// `size` bytes remain past the aligned payload start.
  unsafe fn search(
    &mut self,
    size: usize,
    align: usize,
  ) -> *mut FreeBlock {
    unsafe {
      for bucket in size_class_index(size)..NUM_BUCKETS {
        let mut prev: *mut *mut FreeBlock = &mut self.buckets[bucket];

        let mut block = *prev;
        while !block.is_null() {
          let bs = (*block).size;
          let mem = block as usize + SIZE_BYTES;

          if bs >= size + align - 1
            || (bs >= size && mem + bs >= align_up(mem, align) + size)
          {
            *prev = (*block).next;
            return block;
          }

          prev = &mut (*block).next;
          block = *prev;
        }
      }

      ptr::null_mut()
    }
  }

  /// Bump-allocates in the head field, mapping a new field when the
  /// current one (or none) cannot hold the slot.
  unsafe fn bump(
    &mut self,
    mut size: usize,
    align: usize,
  ) -> *mut u8 {
    unsafe {
      let requested = size;

      // Every slot must later be able to host a full header on a
      // free-list, and a zero size word would break header recovery.
      if size < MIN_BLOCK_SIZE {
        size = MIN_BLOCK_SIZE;
      }

      if self.head.is_null() && self.push_field(size).is_null() {
        return ptr::null_mut();
      }

      let mut field = self.head;
      let mut top = (*field).top;

      // Leave room for the size word, align the payload, and round the
      // new top so the next slot's header lands naturally aligned.
      let mut raw = top as usize + SIZE_BYTES;
      let mut aligned = align_up(raw, align.max(H_ALIGN));
      let mut new_top = align_up(aligned + size, H_ALIGN);

      if new_top > (*field).payload_end() as usize {
        field = self.push_field(size);
        if field.is_null() {
          return ptr::null_mut();
        }

        top = (*field).top;
        raw = top as usize + SIZE_BYTES;
        aligned = align_up(raw, align.max(H_ALIGN));
        new_top = align_up(aligned + size, H_ALIGN);

        // A fresh field holds at least twice the request, which covers
        // the size word plus any alignment shift.
        debug_assert!(new_top <= (*field).payload_end() as usize);
      }

      let top_addr = top as usize;
      ptr::write_bytes(top, 0, aligned - top_addr);

      // The size word records the whole slot minus itself; it is the
      // non-zero terminator the recovery scan runs into.
      (top as *mut usize).write(new_top - raw);
      (*field).top = top.add(new_top - top_addr);

      self.stats.record_alloc(requested, new_top - raw);
      top.add(aligned - top_addr)
    }
  }

  /// Maps a new field able to hold `requested` bytes and pushes it onto
  /// the chain. Returns null (arena untouched) if the page source
  /// refuses.
  fn push_field(
    &mut self,
    requested: usize,
  ) -> *mut Field {
    let field = Field::new(requested, self.minimum_field_size, &mut self.source);
    if field.is_null() {
      debug!("out of memory: no field for a {requested} byte request");
      return field;
    }

    // SAFETY: Field::new returned a valid, exclusively owned header.
    unsafe {
      (*field).next = self.head;
    }
    self.head = field;
    field
  }

  /// Returns an allocation to the arena.
  ///
  /// The block's header is recovered by scanning backwards from `ptr`
  /// through the zero-fill gap, then the whole block is pushed onto the
  /// free-list bucket for its recorded size. O(1); no field's cursor
  /// moves, so freeing never shrinks mapped memory.
  ///
  /// Freeing null is a no-op.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a payload pointer returned by this arena's
  /// [`alloc`](Arena::alloc)/[`try_alloc`](Arena::try_alloc) that has
  /// not been freed since, with no `reset` in between. Double frees and
  /// foreign pointers corrupt the free-lists; nothing detects them.
  pub unsafe fn free(
    &mut self,
    ptr: *mut u8,
  ) {
    if ptr.is_null() {
      return;
    }

    unsafe {
      let block = FreeBlock::start_address(ptr);
      let bucket = size_class_index((*block).size);

      (*block).next = self.buckets[bucket];
      self.buckets[bucket] = block;

      self.stats.record_free((*block).size);
    }
  }

  /// Clears the arena while keeping its newest field mapped.
  ///
  /// Every other field is returned to the page source, the retained
  /// field's cursor rewinds to its base, all buckets empty out, and the
  /// stats counters reset. `minimum_field_size` is preserved. Repeated
  /// resets are idempotent.
  ///
  /// Every pointer previously returned by this arena is invalidated;
  /// using one afterwards is undefined behavior.
  pub fn reset(&mut self) {
    unsafe {
      if !self.head.is_null() {
        let head = self.head;

        let mut walk = (*head).next;
        while !walk.is_null() {
          let next = (*walk).next;
          Field::delete(walk, &mut self.source);
          walk = next;
        }

        (*head).next = ptr::null_mut();
        (*head).top = (*head).base();
      }
    }

    self.buckets = [ptr::null_mut(); NUM_BUCKETS];
    self.stats.reset();
  }
}

impl<S: PageSource> Drop for Arena<S> {
  fn drop(&mut self) {
    unsafe {
      let mut walk = self.head;
      while !walk.is_null() {
        let next = (*walk).next;
        Field::delete(walk, &mut self.source);
        walk = next;
      }
    }

    self.head = ptr::null_mut();
  }
}
