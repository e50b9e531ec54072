//! Memo Module
//!
//! Function memoization on top of the bounded TTL cache.

mod key;
mod memoizer;

pub use key::{Arg, Args, CallKey, KeyPart};
pub use memoizer::{memoize, MemoOptions, Memoized};
