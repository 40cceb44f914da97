// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Managed application service payloads.
//!
//! An application is its own compound: the application body (scaling knobs
//! and components), plus three separately-addressed sub-entities — the
//! version history, the traffic split across versions, and an inbound packet
//! filter. The control plane accepts a container registry password on write
//! but never echoes it back on read; [`ApiContainerRegistry`] therefore has
//! no password field at all.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ResourceId;

/// Canonical state of an application.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiApplication {
    pub id: ResourceId,
    pub name: String,
    pub timeout_seconds: u32,
    pub port: u16,
    pub min_scale: u32,
    pub max_scale: u32,
    pub components: Vec<ApiComponent>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub public_url: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiComponent {
    pub name: String,
    pub max_cpu: String,
    pub max_memory: String,
    pub deploy_source: ApiDeploySource,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub probe: Option<Probe>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiDeploySource {
    pub container_registry: ApiContainerRegistry,
}

/// Registry coordinates as read back. The password is write-only.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiContainerRegistry {
    pub image: String,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, JsonSchema,
)]
#[serde(deny_unknown_fields)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Probe {
    pub http_get: HttpGet,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HttpGet {
    pub path: String,
    pub port: u16,
    #[serde(default)]
    pub headers: Vec<HttpHeader>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HttpHeader {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AppCreateRequest {
    pub name: String,
    pub timeout_seconds: u32,
    pub port: u16,
    pub min_scale: u32,
    pub max_scale: u32,
    pub components: Vec<ComponentRequest>,
}

/// Application body mutation. The same component list shape is used for
/// create and update.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AppUpdateRequest {
    pub timeout_seconds: u32,
    pub port: u16,
    pub min_scale: u32,
    pub max_scale: u32,
    pub components: Vec<ComponentRequest>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ComponentRequest {
    pub name: String,
    pub max_cpu: String,
    pub max_memory: String,
    pub deploy_source: DeploySourceRequest,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub probe: Option<Probe>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DeploySourceRequest {
    pub container_registry: ContainerRegistryRequest,
}

/// Registry coordinates as written, password included.
#[derive(Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ContainerRegistryRequest {
    pub image: String,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for ContainerRegistryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerRegistryRequest")
            .field("image", &self.image)
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// One entry in an application's version history. The control plane orders
/// the list newest-first.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiVersion {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
}

/// What a traffic entry routes to.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, tag = "type", rename_all = "snake_case")]
pub enum TrafficTarget {
    /// Whatever version is newest at the time the split is applied.
    LatestVersion,
    /// A fixed version, addressed by its server-assigned name.
    Version { name: String },
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiTraffic {
    pub target: TrafficTarget,
    pub percent: u8,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PacketFilterRule {
    pub from_ip: String,
    pub prefix_len: u8,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiPacketFilter {
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<PacketFilterRule>,
}
