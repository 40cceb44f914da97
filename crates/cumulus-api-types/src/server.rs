// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server payloads: a virtual machine with attached disks and an ordered set
//! of network interfaces. The first interface is the primary one; the
//! control plane reports assigned addresses there.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{InstanceStatus, ResourceId, SwitchScope};

/// CPU allocation policy for a server plan.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Commitment {
    Standard,
    DedicatedCpu,
}

impl Default for Commitment {
    fn default() -> Self {
        Commitment::Standard
    }
}

/// Paravirtual driver exposed to the guest for its NICs.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceDriver {
    Virtio,
    E1000,
}

impl Default for InterfaceDriver {
    fn default() -> Self {
        InterfaceDriver::Virtio
    }
}

/// One network interface as the control plane reports it.
///
/// `ip_address` is populated for interfaces on the shared segment;
/// `user_ip_address` is the display address an operator recorded for
/// interfaces on a user switch and has no effect on the actual NIC.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiInterface {
    #[serde(default)]
    pub switch_id: Option<ResourceId>,
    #[serde(default)]
    pub switch_scope: Option<SwitchScope>,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub user_ip_address: String,
    #[serde(default)]
    pub user_netmask_len: Option<u8>,
    #[serde(default)]
    pub user_default_route: String,
    #[serde(default)]
    pub subnet_network_address: String,
    #[serde(default)]
    pub packet_filter_id: Option<ResourceId>,
    pub mac_address: String,
}

/// Canonical state of a server.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiServer {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub cpu: u32,
    pub memory_mb: u64,
    #[serde(default)]
    pub gpu: u32,
    #[serde(default)]
    pub cpu_model: String,
    pub commitment: Commitment,
    pub interface_driver: InterfaceDriver,
    pub instance_status: InstanceStatus,
    #[serde(default)]
    pub interfaces: Vec<ApiInterface>,
    #[serde(default)]
    pub disk_ids: Vec<ResourceId>,
    #[serde(default)]
    pub cdrom_id: Option<ResourceId>,
    #[serde(default)]
    pub private_host_id: Option<ResourceId>,
    #[serde(default)]
    pub private_host_name: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub dns_servers: Vec<String>,
}

impl ApiServer {
    pub fn memory_gb(&self) -> u64 {
        self.memory_mb / 1024
    }
}

/// Upstream wiring requested for one interface at create/update time.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, tag = "type", rename_all = "snake_case")]
pub enum InterfaceRequest {
    /// Attach to the provider-operated shared segment.
    Shared {
        #[serde(default)]
        packet_filter_id: Option<ResourceId>,
    },
    /// Leave the NIC present but unplugged.
    Disconnected,
    /// Attach to a user switch.
    Switch {
        switch_id: ResourceId,
        #[serde(default)]
        packet_filter_id: Option<ResourceId>,
        /// Display-only address recorded alongside the NIC.
        #[serde(default)]
        display_ip_address: Option<String>,
    },
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ServerCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub cpu: u32,
    pub memory_mb: u64,
    #[serde(default)]
    pub gpu: u32,
    /// `None` lets the control plane pick the zone's current model.
    #[serde(default)]
    pub cpu_model: Option<String>,
    pub commitment: Commitment,
    pub interface_driver: InterfaceDriver,
    #[serde(default)]
    pub interfaces: Vec<InterfaceRequest>,
    #[serde(default)]
    pub disk_ids: Vec<ResourceId>,
    #[serde(default)]
    pub cdrom_id: Option<ResourceId>,
    #[serde(default)]
    pub private_host_id: Option<ResourceId>,
    /// Power the server on once provisioning completes.
    pub boot_after_create: bool,
}

/// In-place mutation of an existing server. Disk attachment changes are
/// separate calls and intentionally absent here.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ServerUpdateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub cpu: u32,
    pub memory_mb: u64,
    #[serde(default)]
    pub gpu: u32,
    #[serde(default)]
    pub cpu_model: Option<String>,
    pub commitment: Commitment,
    pub interface_driver: InterfaceDriver,
    #[serde(default)]
    pub interfaces: Vec<InterfaceRequest>,
    #[serde(default)]
    pub cdrom_id: Option<ResourceId>,
    #[serde(default)]
    pub private_host_id: Option<ResourceId>,
}
