// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for users, sources, and subscriptions.

pub mod sources;
pub mod subscriptions;
pub mod users;
