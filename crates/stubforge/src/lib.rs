//! Stub package tooling for the OpenImageIO and PyOpenColorIO bindings.
//!
//! This is the library side of the `stubforge` binary: the built-in
//! module profiles, the generation driver and its backend abstraction,
//! the publish flow, and the shared error and output types. The
//! text-level stub rewriting itself lives in the `stubforge-core` crate.

pub mod driver;
pub mod error;
pub mod output;
pub mod profiles;
pub mod publish;
pub mod stubgen;
