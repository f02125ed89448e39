//! Stub post-processing for generated Python interface files.
//!
//! This crate provides the text-level machinery behind the stubforge CLI:
//! - Override tables matching (scope, name, type) candidates against
//!   ordered glob rules
//! - A signature model for generator-shaped `def` declarations
//! - The signature rewriter (whole-signature, parameter, and result
//!   overrides plus the positional-only transform)
//! - A whole-file walker that routes every declaration in a generated
//!   stub through the rewriter
//! - Line-oriented repair passes for known generator artifacts
//!
//! Everything here operates on text in the fixed output shape of one
//! stub generator (mypy stubgen in inspection mode over a pybind11
//! extension module). Lines that do not match that shape pass through
//! unchanged; nothing in this crate fails on unexpected input.

pub mod overrides;
pub mod pyi;
pub mod repair;
pub mod rewrite;
pub mod sig;
