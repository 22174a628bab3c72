// Copyright 2026 wxcheck Contributors
// SPDX-License-Identifier: Apache-2.0

//! wxcheck cross-validates weather observations from a rendered weather
//! page and a JSON weather API.
//!
//! This library crate exposes the pipeline modules for the binary and for
//! integration testing.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod renderer;
pub mod report;
pub mod retry;
pub mod store;
pub mod web;

pub use error::{Result, WxError};
