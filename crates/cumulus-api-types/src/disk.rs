// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Disk payloads. Disks are provisioned asynchronously when sourced from an
//! archive or another disk; `availability` reports copy progress.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Availability, ResourceId};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DiskPlan {
    Ssd,
    Hdd,
}

impl Default for DiskPlan {
    fn default() -> Self {
        DiskPlan::Ssd
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DiskConnection {
    Virtio,
    Ide,
}

impl Default for DiskConnection {
    fn default() -> Self {
        DiskConnection::Virtio
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionAlgorithm {
    None,
    Aes256Xts,
}

impl Default for EncryptionAlgorithm {
    fn default() -> Self {
        EncryptionAlgorithm::None
    }
}

/// Canonical state of a disk.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiDisk {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub plan: DiskPlan,
    pub connection: DiskConnection,
    pub size_mb: u64,
    #[serde(default)]
    pub source_archive_id: Option<ResourceId>,
    #[serde(default)]
    pub source_disk_id: Option<ResourceId>,
    pub encryption_algorithm: EncryptionAlgorithm,
    /// The server this disk is attached to, if any.
    #[serde(default)]
    pub server_id: Option<ResourceId>,
    pub availability: Availability,
}

impl ApiDisk {
    pub fn size_gb(&self) -> u64 {
        self.size_mb / 1024
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DiskCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub plan: DiskPlan,
    pub connection: DiskConnection,
    pub size_mb: u64,
    #[serde(default)]
    pub source_archive_id: Option<ResourceId>,
    #[serde(default)]
    pub source_disk_id: Option<ResourceId>,
    pub encryption_algorithm: EncryptionAlgorithm,
    /// Attach to this server as part of creation.
    #[serde(default)]
    pub server_id: Option<ResourceId>,
    /// Place the new disk on different physical storage from these disks.
    #[serde(default)]
    pub distant_from: Vec<ResourceId>,
}

/// The only disk attributes the control plane mutates in place. Everything
/// else requires a new disk.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DiskUpdateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub connection: DiskConnection,
}
