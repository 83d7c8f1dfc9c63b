// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Sync passes over in-memory collections.
//!
//! These tests drive complete passes through the reconciler and check both
//! collections and the saved sync state afterwards.

mod failures;
mod passes;
