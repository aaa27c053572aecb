// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PostgreSQL-backed implementation of the two trait boundaries `karya-core`
//! depends on ([`karya_core::JobStore`], [`karya_core::ActionStore`]),
//! including schema bootstrap. Built as an ambient collaborator around the
//! core's tested contract — see `karya-core` for the engine itself.

mod action_store;
mod job_store;
mod pool;
mod schema;

pub use action_store::PgActionStore;
pub use job_store::PgJobStore;
pub use pool::{DbPool, PoolConfig};
pub use schema::bootstrap_schema;
