#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
/// Error handling and custom [`Error`](std::error::Error) types
pub mod errors;
/// Functions for reading CSV exports and writing per-account OFX files
pub mod io;
/// OFX statement assembly and serialization
pub mod ofx;
/// Business logic for deriving, bucketing and spanning transactions
pub mod ops;
/// Data types used throughout the converter
pub mod types;
