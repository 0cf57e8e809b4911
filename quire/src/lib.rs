//! Expose quire's internal API for use in integration tests. The engine
//! itself lives in `quire-commonmark`; this crate only wires it to files and
//! the command line.
pub mod cli;
pub mod compile;
pub mod error;
pub mod template;
