//! # Synchronization Primitives
//!
//! ## The Problem
//!
//! ```text
//! Thread 1: region (3, 4) missing -> start generating
//! Thread 2: region (3, 4) missing -> start generating   <- wasted work
//! Thread 3: region (3, 4) missing -> start generating   <- wasted work
//! ```
//!
//! ## The Solution: In-Flight Promises
//!
//! ```text
//! Thread 1: installs InFlight for (3, 4), generates, completes it
//! Thread 2: finds InFlight for (3, 4), waits
//! Thread 3: finds InFlight for (3, 4), waits
//!           -> all three observe the same result
//! ```

mod in_flight;

pub use in_flight::InFlight;
