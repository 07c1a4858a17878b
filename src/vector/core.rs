//! Core vector data structures.
//!
//! This module contains the typed representation of a vector literal and the
//! parser that turns query text into it.

pub mod parser;
pub mod vector;
