//! # rarena - A Growable Region Allocator
//!
//! This crate provides a **region (arena) allocator** that combines fast
//! bump allocation with individual frees through size-classed free-lists,
//! growing on demand by chaining page-mapped backing regions ("fields").
//!
//! ## Overview
//!
//! ```text
//!   Region Allocator Concept:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                              ARENA                                   │
//!   │                                                                      │
//!   │   head ──► ┌───────────────────────────┐     ┌────────────────────┐  │
//!   │            │  Field 2 (newest, bump)   │ ──► │  Field 1 (oldest)  │  │
//!   │            │ ┌────┬────┬────┬────────┐ │     │ ┌────┬────┬─────┐  │  │
//!   │            │ │ A4 │ A5 │ A6 │  free  │ │     │ │ A1 │ A2 │ A3  │  │  │
//!   │            │ └────┴────┴────┴────────┘ │     │ └────┴────┴─────┘  │  │
//!   │            └──────────────▲────────────┘     └────────────────────┘  │
//!   │                           │ top                                      │
//!   │                                                                      │
//!   │   buckets: ┌──────┬──────┬──────┬─────┬──────┐                       │
//!   │            │ ≤2⁵  │ ≤2⁶  │ ≤2⁷  │ ... │ rest │  freed blocks,       │
//!   │            └──────┴──────┴──────┴─────┴──────┘  one list per class   │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Allocation: free-list hit, else bump, else map a new field.
//!   Free: recover the header behind the pointer, push onto its bucket.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rarena
//!   ├── align      - align_up / align_down helpers
//!   ├── block      - block header, size classes, header recovery (internal)
//!   ├── page       - PageSource trait and the mmap-backed default
//!   ├── field      - one backing region with a bump cursor (internal)
//!   ├── error      - AllocError taxonomy
//!   ├── stats      - ArenaStats counters
//!   └── arena      - the Arena itself
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rarena::Arena;
//!
//! let mut arena = Arena::with_minimum_field_size(4096);
//!
//! unsafe {
//!     let ptr = arena.alloc(64, 8);
//!     assert!(!ptr.is_null());
//!
//!     ptr.write(42);
//!     assert_eq!(ptr.read(), 42);
//!
//!     arena.free(ptr);
//! }
//!
//! // Or drop everything at once, keeping the backing memory:
//! arena.reset();
//! ```
//!
//! ## How Headers Are Found
//!
//! Every allocation is preceded by a machine word recording its size,
//! separated from the payload by a run of zero bytes:
//!
//! ```text
//!   ┌───────────┬─────────────────┬──────────────────────────┐
//!   │ size word │ 00 00 ... 00    │         payload          │
//!   └───────────┴─────────────────┴──────────────────────────┘
//!               ▲                 ▲
//!               │                 └── pointer returned to the user
//!               └── found again by scanning backwards to the first
//!                   non-zero byte and rounding down
//! ```
//!
//! This is why `free` needs nothing but the payload pointer: no side
//! tables, no fat pointers.
//!
//! ## Features
//!
//! - **Fast allocation**: free-list hit or pointer bump, O(1) amortized
//! - **Individual frees**: O(1), into segregated size-class lists
//! - **Bulk reset**: keep the biggest field, drop the rest
//! - **Pluggable backing**: any [`PageSource`], `mmap` by default
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization primitives
//! - **No splitting or coalescing**: freed blocks are reused whole
//! - **No realloc**: allocate and copy instead
//! - **Unix-only default source**: [`Mmap`] requires `mmap(2)`
//!
//! ## Safety
//!
//! The returned regions are raw memory; allocation, use, and freeing
//! follow the usual manual-memory rules spelled out on
//! [`Arena::alloc`] and [`Arena::free`].

pub mod align;
mod arena;
mod block;
mod error;
mod field;
pub mod page;
mod stats;

pub use arena::{Arena, DEFAULT_MINIMUM_FIELD_SIZE};
pub use error::AllocError;
pub use page::{Mmap, PageSource};
pub use stats::ArenaStats;
