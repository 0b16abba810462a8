// SPDX-License-Identifier: MIT

//! Error helpers shared by all `nodeweave` crates
use snafu::Snafu;

pub mod fmt;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type BoxedErrorResult<T> = std::result::Result<T, BoxedError>;
pub type WhateverResult<T> = std::result::Result<T, Whatever>;

/// Snafu's `Whatever`, but `Send + Sync`
///
/// Used at the edges (CLI, setup code), where a typed error would only be
/// reported and never matched on.
#[derive(Debug, Snafu)]
#[snafu(whatever, display("{message}"))]
pub struct Whatever {
    #[snafu(source(from(Box<dyn std::error::Error + Send + Sync>, Some)))]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,

    message: String,
}
