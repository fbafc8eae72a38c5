// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for the waitlist intake service.
//!
//! Drives the real router in-process against an in-memory store and a
//! manual clock, and simulates bot and flood traffic.

#![allow(dead_code)]

pub mod app;
pub mod generators;
pub mod metrics;
pub mod stores;
