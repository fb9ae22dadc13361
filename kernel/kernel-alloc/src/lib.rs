//! # Physical Frame Allocation
//!
//! The kernel's physical memory manager: a pool of 4 KiB frames kept on an
//! intrusive free list.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Paging / Kernel users               │
//! │    • page tables via PageTableFrames                │
//! │    • batch requests via FrameAllocator::allocate    │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │           Physical Frame Allocator                  │
//! │    • 4 KiB frame management                         │
//! │    • intrusive free list (no side tables)           │
//! │    • all-or-nothing batch allocation                │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design
//!
//! Free frames store their own list link in their first word, so the
//! allocator needs no heap and no bitmap. Batch allocation either delivers
//! the full request or leaves the pool untouched, which keeps callers from
//! having to unwind partial grabs.
//!
//! The allocator itself is not synchronized; the kernel wraps it in a spin
//! lock.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod frame_alloc;
mod free_list;

pub use frame_alloc::PageTableFrames;
pub use free_list::{AllocError, FRAME_SIZE, FrameAllocator, FrameList};
