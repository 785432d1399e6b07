//! # Strata Core
//!
//! Concurrency building blocks shared by the world generation crates:
//! - Pooled objects handed out as exclusive, scope-bound leases
//! - Single-assignment promises that many threads can wait on
//!
//! ## Architecture Rules
//!
//! 1. **Release on every path** - Leases return to their pool in `Drop`
//! 2. **One writer, many readers** - A promise is completed exactly once
//! 3. **No global state** - Pools and promises are owned by their users
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_core::ResourcePool;
//!
//! let pool = ResourcePool::new(64, || vec![0u8; 4096]);
//! {
//!     let mut buffer = pool.acquire();
//!     buffer[0] = 1;
//! } // returned to the pool here
//! assert_eq!(pool.stats().outstanding, 0);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod memory;
pub mod sync;

pub use memory::{PoolStats, Resource, ResourcePool};
pub use sync::InFlight;
