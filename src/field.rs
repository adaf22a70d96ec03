//! Fields: the contiguous backing regions an arena bumps into.
//!
//! A field is one page-mapped range holding a small header followed by
//! payload bytes. Fields form a LIFO chain; only the newest participates
//! in bump allocation, older ones are reachable solely through the
//! free-lists.
//!
//! ```text
//!   one mapping
//!   ┌────────────────────┬──────────────────────────────────────────┐
//!   │    Field header    │               payload                    │
//!   ├────────────────────┤                                          │
//!   │ size: usize        │  [ allocated slots | untouched bytes ]   │
//!   │ next: *mut Field   │                    ▲                     │
//!   │ top:  *mut u8      │                    │                     │
//!   └────────────────────┴────────────────────┼─────────────────────┘
//!   ▲                    ▲                    │
//!   │                    └── base()           └── top (bump cursor)
//!   └── start of mapping
//! ```

use log::trace;
use std::{mem, ptr};

use crate::page::PageSource;

/// Header of one backing region. The payload starts immediately after
/// this struct inside the same mapping.
#[repr(C)]
pub(crate) struct Field {
  /// Usable payload capacity in bytes, excluding this header.
  pub size: usize,
  /// Previously active field; the chain is a stack.
  pub next: *mut Field,
  /// Start of untouched payload. `base() <= top <= base() + size`.
  pub top: *mut u8,
}

impl Field {
  /// First payload byte of this field.
  #[inline]
  pub fn base(&self) -> *mut u8 {
    let header = self as *const Field as *mut u8;
    // SAFETY: the payload follows the header within the same mapping.
    unsafe { header.add(mem::size_of::<Field>()) }
  }

  /// One past the last payload byte.
  #[inline]
  pub fn payload_end(&self) -> *mut u8 {
    // SAFETY: size payload bytes follow base() within the same mapping.
    unsafe { self.base().add(self.size) }
  }

  /// Maps and initializes a new field able to hold `requested` bytes.
  ///
  /// The payload capacity is the smallest `minimum_field_size * 2^k`
  /// with `requested <= capacity / 2`, so repeatedly outgrowing fields
  /// doubles the next one rather than thrashing the page source.
  ///
  /// Returns null if the page source fails or the capacity computation
  /// overflows.
  pub fn new<S: PageSource>(
    requested: usize,
    minimum_field_size: usize,
    source: &mut S,
  ) -> *mut Field {
    debug_assert!(minimum_field_size > 0);

    let mut bytes = minimum_field_size;
    while requested > bytes / 2 {
      bytes = match bytes.checked_mul(2) {
        Some(doubled) => doubled,
        None => return ptr::null_mut(),
      };
    }

    let total = match bytes.checked_add(mem::size_of::<Field>()) {
      Some(total) => total,
      None => return ptr::null_mut(),
    };

    let addr = source.map(total);
    if addr.is_null() {
      return ptr::null_mut();
    }

    trace!("new field: {bytes} payload bytes for a {requested} byte request");

    let field = addr as *mut Field;
    // SAFETY: the mapping is at least total bytes and at least
    // header-aligned, so the header write and base() are in bounds.
    unsafe {
      let base = addr.add(mem::size_of::<Field>());
      field.write(Field {
        size: bytes,
        next: ptr::null_mut(),
        top: base,
      });
    }

    field
  }

  /// Returns the whole mapping of `field` to the page source.
  ///
  /// # Safety
  ///
  /// `field` must have come from [`Field::new`] with the same source and
  /// must not be used afterwards; any free-list entries pointing into
  /// its payload become dangling.
  pub unsafe fn delete<S: PageSource>(
    field: *mut Field,
    source: &mut S,
  ) {
    unsafe {
      let bytes = mem::size_of::<Field>() + (*field).size;
      source.unmap(field as *mut u8, bytes);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::page::Mmap;

  #[test]
  fn new_field_initializes_cursor_at_base() {
    let mut source = Mmap;
    let field = Field::new(100, 4096, &mut source);
    assert!(!field.is_null());

    unsafe {
      assert_eq!((*field).size, 4096);
      assert!((*field).next.is_null());
      assert_eq!((*field).top, (*field).base());
      assert_eq!((*field).payload_end(), (*field).base().add(4096));

      Field::delete(field, &mut source);
    }
  }

  #[test]
  fn capacity_doubles_until_request_fits_in_half() {
    let mut source = Mmap;

    // requested <= 4096/2 stays at the minimum.
    let cases = [
      (1usize, 4096usize),
      (2048, 4096),
      (2049, 8192),
      (4000, 8192),
      (4096, 8192),
      (10240, 32768),
    ];

    for (requested, expected) in cases {
      let field = Field::new(requested, 4096, &mut source);
      assert!(!field.is_null());

      unsafe {
        assert_eq!((*field).size, expected, "requested {requested}");
        Field::delete(field, &mut source);
      }
    }
  }

  #[test]
  fn oversized_request_fails_cleanly() {
    let mut source = Mmap;
    let field = Field::new(usize::MAX / 2 + 1, 4096, &mut source);
    assert!(field.is_null());
  }
}
