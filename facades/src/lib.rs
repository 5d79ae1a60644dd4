// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Facades module.
//!
//! Ready-made wrappers over the executor for the workloads it was built
//! around: holding interactive state, coordinating navigation transitions
//! and running repository calls.
//!

pub mod holder;
pub mod navigation;
pub mod repository;

pub use holder::StateHolder;
pub use navigation::NavigationCoordinator;
pub use repository::Repository;
