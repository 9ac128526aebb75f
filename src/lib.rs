//! # rallocator - A Custom Memory Allocator Library
//!
//! This crate provides a **general-purpose heap allocator** implementation in
//! Rust that manages memory using the `sbrk` system call and anonymous
//! `mmap`.
//!
//! ## Overview
//!
//! Small and medium requests are served from a single break-heap arena, kept
//! as a singly-linked list of headers with a best-fit placement strategy:
//!
//! ```text
//!   Break-heap Arena:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP MEMORY                                  │
//!   │                                                                      │
//!   │   ┌─────┬──────┬─────┬────────┬───────────────────────────────────┐  │
//!   │   │ A1  │ free │ A3  │  free  │           Uncommitted              │  │
//!   │   └─────┴──────┴─────┴────────┴───────────────────────────────────┘  │
//!   │                                                                 ▲    │
//!   │                                                            Program  │
//!   │                                                             Break   │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   allocate() walks the list for the smallest free block that fits;
//!   only when nothing fits does the break move.
//! ```
//!
//! Requests at or above a size threshold bypass the arena entirely and are
//! satisfied with their own anonymous mapping, so a single oversized
//! allocation can never fragment the break-heap.
//!
//! ## Crate Structure
//!
//! ```text
//!   rallocator
//!   ├── align      - Alignment helpers
//!   ├── block      - Block header layout (internal)
//!   ├── backend    - sbrk / mmap OS-primitive router (internal)
//!   ├── placement  - Best-fit search, splitting, coalescing (internal)
//!   ├── error      - Internal failure detail behind the null-on-failure API
//!   └── allocator  - Allocator: allocate, release, zeroed_allocate, resize
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rallocator::Allocator;
//!
//! fn main() {
//!     let mut allocator = Allocator::new();
//!
//!     unsafe {
//!         let ptr = allocator.allocate(64) as *mut u64;
//!         *ptr = 42;
//!         println!("Value: {}", *ptr);
//!         allocator.release(ptr as *mut u8);
//!     }
//! }
//! ```
//!
//! ## How It Works
//!
//! The allocator uses `sbrk(2)` to extend the program's data segment for
//! small and medium requests, and `mmap(2)` for large ones:
//!
//! ```text
//!   Program Memory Layout:
//!
//!   High Address ┌─────────────────────┐
//!                │       Stack         │ ↓ grows down
//!                │         │           │
//!                │         ▼           │
//!                │                     │
//!                │         ▲           │
//!                │         │           │
//!                │       Heap          │ ↑ grows up (sbrk)
//!                ├─────────────────────┤ ← Program Break
//!                │   Uninitialized     │
//!                │       Data          │
//!                ├─────────────────────┤
//!                │   Initialized       │
//!                │       Data          │
//!                ├─────────────────────┤
//!                │       Text          │
//!   Low Address  └─────────────────────┘
//! ```
//!
//! Each allocation, whether carved from the break-heap or freshly mapped, is
//! preceded by a block header:
//!
//! ```text
//!   Single Allocation:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ status: Status  │  │  │                          │  │
//!   │  │ next: null/ptr  │  │  │     N bytes usable       │  │
//!   │  └─────────────────┘  │  │                          │  │
//!   │      24 bytes         │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to caller
//! ```
//!
//! ## Features
//!
//! - **Best-fit placement**: reuses the smallest free block that satisfies a
//!   request before ever moving the break.
//! - **Two backends**: the break-heap for small and medium requests, and
//!   anonymous `mmap` for large ones, so one big allocation can't pin down
//!   the whole arena.
//! - **In-place resize**: shrinks and grows reuse the existing block or its
//!   immediate free neighbor whenever the policy table allows it.
//! - **Opt-in tracing**: enable the `logging` feature to get `log`-crate
//!   trace/debug output of allocator decisions; compiled out entirely by
//!   default.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization primitives.
//! - **No fragmentation metrics or introspection API**: this crate answers
//!   `allocate`/`release`/`zeroed_allocate`/`resize` and nothing else.
//! - **Unix-only**: requires `libc`, `sbrk`, and `mmap` (POSIX systems).
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! The four public operations on [`Allocator`] are safe to call, but the
//! pointers they hand back carry the same obligations as any allocator: no
//! double release, no use-after-release, no resizing or releasing a foreign
//! pointer.

mod align;
mod allocator;
mod backend;
mod block;
mod error;
mod placement;

pub use allocator::Allocator;
