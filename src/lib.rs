// Copyright 2026 Pagelite Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pagelite — bandwidth-saving web middleware.
//!
//! Given a URL: fetch the page once, strip heavy markup, harvest navigation
//! links and readable text, then stream either an AI-generated summary or a
//! raw-text fallback to the caller over a single chunked response.

pub mod config;
pub mod extract;
pub mod fetch;
pub mod gemini;
pub mod rest;
pub mod stream;
pub mod summarize;
pub mod validate;
