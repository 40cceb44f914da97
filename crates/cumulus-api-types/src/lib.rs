// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Payload types spoken between the convergence engine and the cloud control
//! plane.
//!
//! Everything in this crate is pure data: the canonical shape of a remote
//! object as the control plane reports it, and the request bodies the engine
//! submits to create or mutate one. Canonical objects are always fully known;
//! they never carry "to be computed" placeholders. Request types may omit
//! optional fields (`None`), which asks the control plane to apply its own
//! default.
//!
//! Types here are shared between the engine library and any client
//! implementation, so changes must remain backward-compatible for serialized
//! state already on disk.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod app;
pub mod disk;
pub mod server;
pub mod vpn_router;

/// An opaque key naming one remote object within its zone scope.
///
/// Identifiers are assigned by the control plane, are stable across in-place
/// updates, and change only when an object is destroyed and recreated.
#[derive(
    Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, JsonSchema,
)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The power/run state of an instance-like object (server, VPN router).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Up,
    Down,
    /// The control plane is tearing the instance down after a delete.
    Cleaning,
    Unknown,
}

impl InstanceStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, InstanceStatus::Up)
    }

    pub fn is_down(&self) -> bool {
        matches!(self, InstanceStatus::Down)
    }
}

/// Provisioning state of an object whose creation completes asynchronously
/// (e.g. a disk copied from a source archive).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Provisioning finished; the object is usable.
    Available,
    /// A copy or migration is still in flight.
    Migrating,
    /// Provisioning failed terminally; the partial object should be deleted.
    Failed,
}

impl Availability {
    /// Returns `true` once the control plane will make no further progress,
    /// for better or worse.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Availability::Migrating)
    }
}

/// The visibility scope of the switch an interface is attached to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SwitchScope {
    /// The provider-operated shared segment.
    Shared,
    /// A user-created switch.
    User,
}
