//! # Kernel synchronization primitives

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod ring;
mod spin_lock;

pub use irq::IrqGuard;
pub use ring::SpscRing;
pub use spin_lock::{SpinLock, SpinLockGuard};
