//! Subprocess gateway to the content-addressed storage daemon.
//!
//! Every operation spawns the daemon's CLI once (`add`, `cat`, `pin add`,
//! `id`) and talks to it over stdin/stdout/stderr and the exit code. There
//! are no retries: a failed invocation is returned to the caller as is.

mod client;
mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use client::{Added, IpfsClient, is_valid_cid};
pub use error::IpfsError;
