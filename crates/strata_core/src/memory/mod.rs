//! # Memory Management
//!
//! Object pools that let hot paths reuse allocations.
//!
//! ## Design Philosophy
//!
//! Every coordinate query may need a scratch cell or buffer. Instead of
//! allocating one per query:
//! - Objects are leased from a shared pool
//! - Leases are exclusive (the object is moved into the lease)
//! - Leases go back to the pool when dropped

mod pool;

pub use pool::{PoolStats, Resource, ResourcePool};
