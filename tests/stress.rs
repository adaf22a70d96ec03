//! Randomized allocate / verify / free driver.
//!
//! Keeps a table of live allocations, each filled with a slot-specific
//! byte pattern; on every revisit the pattern is checked before the slot
//! is freed, so any overlap between allocations or corruption through
//! the free-lists shows up as a mismatch.

use rarena::Arena;

const NUM_SLOTS: usize = 1024;
const ITERATIONS: usize = 1 << 16;

struct Slot {
  ptr: *mut u8,
  len: usize,
}

/// Deterministic xorshift64 so failures replay exactly.
struct Rng(u64);

impl Rng {
  fn next(&mut self) -> u64 {
    let mut x = self.0;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    self.0 = x;
    x
  }

  fn below(
    &mut self,
    bound: u64,
  ) -> u64 {
    self.next() % bound
  }
}

fn is_aligned(
  ptr: *mut u8,
  align: usize,
) -> bool {
  (ptr as usize) % align == 0
}

#[test]
fn random_traffic_keeps_every_allocation_intact() {
  let mut arena = Arena::with_minimum_field_size(256 * 1024);
  let mut rng = Rng(0x12345);
  let mut slots: Vec<Option<Slot>> = (0..NUM_SLOTS).map(|_| None).collect();

  let mut live = 0usize;

  for _ in 0..ITERATIONS {
    let idx = rng.below(NUM_SLOTS as u64) as usize;
    let pattern = (idx & 0xff) as u8;

    match slots[idx].take() {
      None => {
        let len = rng.below(1 << 13) as usize + 1;
        let mut align = 1usize << rng.below(11);
        if align > len {
          align = 1;
        }

        let ptr = unsafe { arena.alloc(len, align) };
        assert!(!ptr.is_null(), "allocation of {len} bytes failed");
        assert!(is_aligned(ptr, align), "{align}-byte alignment violated");

        unsafe {
          std::ptr::write_bytes(ptr, pattern, len);
        }

        live += 1;
        slots[idx] = Some(Slot { ptr, len });
      }
      Some(slot) => {
        unsafe {
          for i in 0..slot.len {
            assert_eq!(
              slot.ptr.add(i).read(),
              pattern,
              "corruption in slot {idx} at offset {i}"
            );
          }

          arena.free(slot.ptr);
        }
        live -= 1;
      }
    }
  }

  let stats = arena.stats();
  assert_eq!(stats.allocs - stats.frees, live);
}

#[test]
fn random_traffic_survives_periodic_resets() {
  let mut arena = Arena::with_minimum_field_size(64 * 1024);
  let mut rng = Rng(0xdeadbeef);
  let mut slots: Vec<Option<Slot>> = (0..NUM_SLOTS).map(|_| None).collect();

  for round in 0u8..8 {
    for _ in 0..ITERATIONS / 16 {
      let idx = rng.below(NUM_SLOTS as u64) as usize;
      let pattern = (idx & 0xff) as u8 ^ round;

      match slots[idx].take() {
        None => {
          let len = rng.below(1 << 10) as usize + 1;
          let mut align = 1usize << rng.below(7);
          if align > len {
            align = 1;
          }

          let ptr = unsafe { arena.alloc(len, align) };
          assert!(!ptr.is_null());

          unsafe {
            std::ptr::write_bytes(ptr, pattern, len);
          }
          slots[idx] = Some(Slot { ptr, len });
        }
        Some(slot) => unsafe {
          for i in 0..slot.len {
            assert_eq!(slot.ptr.add(i).read(), pattern);
          }
          arena.free(slot.ptr);
        },
      }
    }

    // Everything is invalidated in one stroke; forget the pointers.
    arena.reset();
    slots.iter_mut().for_each(|slot| *slot = None);
    assert_eq!(arena.stats().allocs, 0);
  }
}
