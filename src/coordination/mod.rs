//! Request coordination primitives.
//!
//! A single node runs this service, so coordination is in-process: a lock
//! registry keyed by repository name serializes pipelines that would
//! otherwise race on the same workspace directory.

pub mod locks;
