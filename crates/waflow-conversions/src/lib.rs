// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion event emission toward the ads attribution API, with a
//! durable audit trail per attempt.

pub mod emitter;

pub use emitter::{ConversionEmitter, EmitOutcome, FIRST_TOUCH_EVENT};
