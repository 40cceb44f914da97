// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! cumulus: a convergence engine for compound cloud resources.
//!
//! Given a desired declarative document for a resource instance and a client
//! for the cloud control plane, the engine makes the live object match the
//! document and hands back a refreshed document with every server-computed
//! field filled in. It does this across four resource kinds — servers,
//! disks, VPN routers, and managed applications — with one driver per kind
//! and a shared core:
//!
//! - [`value`]: the four-state field model (value / null / unknown /
//!   server-default) that keeps repeated applies from seeing phantom diffs.
//! - [`classify`]: change records grading every difference as live,
//!   disruptive, or destructive.
//! - [`lock_table`]: per-identifier mutual exclusion, so two runs against
//!   the same remote object never interleave their mutations.
//! - [`setup`]: bounded-retry creation with cleanup of partial objects.
//! - [`converge`]: the step vocabulary, deadlines, and error taxonomy the
//!   drivers share.
//! - [`client`] and [`store`]: the seams to the control plane and to
//!   persisted state; both are traits, and the engine owns neither.
//!
//! Translators (`expand`/`flatten` in each kind's `convert` module) are pure
//! functions; drivers are the only code that talks to the network, and every
//! remote failure they return is tagged with the orchestration step and the
//! identifier it was acting on.

pub mod app;
pub mod classify;
pub mod client;
pub mod converge;
pub mod convert;
pub mod disk;
pub mod lock_table;
pub mod server;
pub mod setup;
pub mod store;
pub mod value;
pub mod vpn_router;

pub use classify::{ChangeRecord, FieldDiff, Severity};
pub use client::ApiError;
pub use converge::{ConvergeError, ConvergeOptions, Deadline, Outcome, Step};
pub use convert::ExpandError;
pub use lock_table::LockTable;
pub use setup::{RetryableSetup, SetupError, SetupOptions};
pub use store::{MemoryStore, StateStore};
pub use value::FieldValue;
