// Copyright 2026 DefaceWatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Defacewatch runtime library.
//!
//! Hybrid page-text extraction (headless render with a quality-gated
//! direct-fetch fallback) feeding a lightweight defacement classifier,
//! exposed over a small REST API.

pub mod acquisition;
pub mod audit;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod renderer;
pub mod rest;
pub mod server;
