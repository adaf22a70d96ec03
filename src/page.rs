//! Page source: where fields get their backing memory.
//!
//! The arena never talks to the host directly; it goes through a
//! [`PageSource`], which hands out zero-initialized, readable-writable
//! regions and takes them back. The default source is [`Mmap`]
//! (anonymous private mappings); tests substitute counting or failing
//! sources to observe mapping traffic and inject out-of-memory.

use libc::{c_void, MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE};
use log::trace;
use std::ptr;

/// Supplier of page-mapped backing memory.
///
/// Implementations must return regions that are zero-initialized,
/// readable and writable, and aligned at least to the header alignment
/// (any page-granular mapping satisfies this).
pub trait PageSource {
  /// Maps `bytes` of fresh memory. Returns null on failure.
  fn map(
    &mut self,
    bytes: usize,
  ) -> *mut u8;

  /// Releases a region previously returned by [`map`](PageSource::map).
  ///
  /// # Safety
  ///
  /// `addr` and `bytes` must describe exactly one region handed out by
  /// this source that has not been unmapped before.
  unsafe fn unmap(
    &mut self,
    addr: *mut u8,
    bytes: usize,
  );
}

/// The host page source: anonymous private `mmap`/`munmap`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mmap;

impl PageSource for Mmap {
  fn map(
    &mut self,
    bytes: usize,
  ) -> *mut u8 {
    // SAFETY: an anonymous private mapping with no fixed address has no
    // preconditions; failure is reported through MAP_FAILED.
    let addr = unsafe {
      libc::mmap(
        ptr::null_mut(),
        bytes,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if addr == MAP_FAILED {
      trace!("mmap of {bytes} bytes failed");
      return ptr::null_mut();
    }

    trace!("mapped {bytes} bytes at {addr:?}");
    addr as *mut u8
  }

  unsafe fn unmap(
    &mut self,
    addr: *mut u8,
    bytes: usize,
  ) {
    trace!("unmapping {bytes} bytes at {addr:?}");
    // SAFETY: caller guarantees the region came from map() above.
    unsafe {
      libc::munmap(addr as *mut c_void, bytes);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn map_returns_zeroed_writable_memory() {
    let mut source = Mmap;
    let bytes = 4096;

    let addr = source.map(bytes);
    assert!(!addr.is_null());
    assert_eq!(addr as usize % crate::block::H_ALIGN, 0);

    unsafe {
      for i in 0..bytes {
        assert_eq!(addr.add(i).read(), 0);
      }

      addr.write(0xa5);
      assert_eq!(addr.read(), 0xa5);

      source.unmap(addr, bytes);
    }
  }

  #[test]
  fn distinct_maps_do_not_overlap() {
    let mut source = Mmap;

    let a = source.map(4096);
    let b = source.map(4096);
    assert!(!a.is_null() && !b.is_null());
    assert_ne!(a, b);

    unsafe {
      source.unmap(a, 4096);
      source.unmap(b, 4096);
    }
  }
}
