// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table family.

pub mod bot_config;
pub mod cards;
pub mod conversions;
pub mod dedup;
pub mod tenants;
