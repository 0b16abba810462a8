// SPDX-License-Identifier: MIT

//! Core types shared across the `nodeweave` resilience layer
//!
//! Nothing in here does any I/O: node identities, API namespaces, request
//! fingerprints and the resource credit regeneration math.
pub mod key;
pub mod namespace;
pub mod node_url;
pub mod rc;
pub mod timestamp;
