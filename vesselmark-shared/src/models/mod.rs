/// Database models for VesselMark
///
/// Each model pairs a plain row struct with associated async query functions.
/// Nothing here tracks changes or loads relations lazily; callers ask for
/// exactly the rows they need.
///
/// # Models
///
/// - `user`: Accounts provisioned from identity claims
/// - `image`: Image metadata (bytes live in the blob store)
/// - `dataset`: Datasets and their ordered image entries
/// - `annotation`: Vessel annotation trees (points and segments)

pub mod annotation;
pub mod dataset;
pub mod image;
pub mod user;
