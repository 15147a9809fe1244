//! HTTP Route Handlers

pub mod metadata;
pub mod predictions;
pub mod trends;
