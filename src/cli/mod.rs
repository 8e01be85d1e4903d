// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Terminal output for the scanalyzer binary

pub mod reporter;

pub use reporter::Reporter;
