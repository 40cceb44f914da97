// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! VPN router payloads.
//!
//! A router is the most compound object in the catalogue: the chassis itself,
//! an indexed set of interfaces, and a settings document holding every
//! routing/VPN sub-resource. Interface index 0 is the public side; indexes
//! 1..=7 are private. Interface attachment (`interfaces`) and interface IP
//! configuration (`settings.interface_settings`) are reported separately and
//! are correlated by `index`, not by list position — the control plane makes
//! no ordering promise for either list.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{InstanceStatus, ResourceId};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RouterPlan {
    Standard,
    Premium,
    HighSpec,
}

impl Default for RouterPlan {
    fn default() -> Self {
        RouterPlan::Standard
    }
}

/// Physical attachment of one router interface to a switch.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiRouterInterface {
    pub index: u8,
    /// `None` on the public side of a standard-plan router, which sits on
    /// the shared segment.
    #[serde(default)]
    pub switch_id: Option<ResourceId>,
}

/// IP configuration of one interface, correlated with [`ApiRouterInterface`]
/// by `index`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct InterfaceSetting {
    pub index: u8,
    #[serde(default)]
    pub ip_addresses: Vec<String>,
    #[serde(default)]
    pub netmask_len: Option<u8>,
    #[serde(default)]
    pub virtual_ip_address: Option<String>,
    #[serde(default)]
    pub ip_aliases: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StaticNat {
    pub global_address: String,
    pub private_address: String,
    #[serde(default)]
    pub description: String,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ForwardProtocol {
    Tcp,
    Udp,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PortForwarding {
    pub protocol: ForwardProtocol,
    pub global_port: u16,
    pub private_address: String,
    pub private_port: u16,
    #[serde(default)]
    pub description: String,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum FirewallProtocol {
    Tcp,
    Udp,
    Icmp,
    Ip,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Send,
    Receive,
}

/// One firewall rule. Rules are evaluated in order within an interface and
/// direction, so their relative position is load-bearing.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FirewallRule {
    pub interface_index: u8,
    pub direction: Direction,
    pub protocol: FirewallProtocol,
    #[serde(default)]
    pub source_network: String,
    #[serde(default)]
    pub source_port: String,
    #[serde(default)]
    pub destination_network: String,
    #[serde(default)]
    pub destination_port: String,
    pub allow: bool,
    #[serde(default)]
    pub logging: bool,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DhcpServer {
    pub interface_index: u8,
    pub range_start: String,
    pub range_stop: String,
    #[serde(default)]
    pub dns_servers: Vec<String>,
}

#[derive(Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct L2tpServer {
    pub pre_shared_secret: String,
    pub range_start: String,
    pub range_stop: String,
}

impl fmt::Debug for L2tpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("L2tpServer")
            .field("pre_shared_secret", &"<redacted>".to_string())
            .field("range_start", &self.range_start)
            .field("range_stop", &self.range_stop)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WireGuardPeer {
    pub name: String,
    pub ip_address: String,
    pub public_key: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WireGuardServer {
    pub ip_address: String,
    #[serde(default)]
    pub peers: Vec<WireGuardPeer>,
}

#[derive(Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RemoteAccessUser {
    pub name: String,
    pub password: String,
}

impl fmt::Debug for RemoteAccessUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteAccessUser")
            .field("name", &self.name)
            .field("password", &"<redacted>".to_string())
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StaticRoute {
    pub prefix: String,
    pub next_hop: String,
}

/// The router settings document: everything the router applies with a config
/// reload rather than a reboot.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RouterSettings {
    #[serde(default)]
    pub vrid: u32,
    #[serde(default)]
    pub internet_connection: bool,
    #[serde(default)]
    pub interface_settings: Vec<InterfaceSetting>,
    #[serde(default)]
    pub static_nat: Vec<StaticNat>,
    #[serde(default)]
    pub port_forwarding: Vec<PortForwarding>,
    #[serde(default)]
    pub firewall: Vec<FirewallRule>,
    #[serde(default)]
    pub dhcp_servers: Vec<DhcpServer>,
    #[serde(default)]
    pub l2tp: Option<L2tpServer>,
    #[serde(default)]
    pub wire_guard: Option<WireGuardServer>,
    #[serde(default)]
    pub users: Vec<RemoteAccessUser>,
    #[serde(default)]
    pub static_routes: Vec<StaticRoute>,
    #[serde(default)]
    pub syslog_host: String,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            vrid: 0,
            internet_connection: true,
            interface_settings: Vec::new(),
            static_nat: Vec::new(),
            port_forwarding: Vec::new(),
            firewall: Vec::new(),
            dhcp_servers: Vec::new(),
            l2tp: None,
            wire_guard: None,
            users: Vec::new(),
            static_routes: Vec::new(),
            syslog_host: String::new(),
        }
    }
}

/// Canonical state of a VPN router.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiVpnRouter {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub plan: RouterPlan,
    pub version: u32,
    pub instance_status: InstanceStatus,
    #[serde(default)]
    pub interfaces: Vec<ApiRouterInterface>,
    pub settings: RouterSettings,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct VpnRouterCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub plan: RouterPlan,
    pub version: u32,
    #[serde(default)]
    pub interfaces: Vec<ApiRouterInterface>,
    pub settings: RouterSettings,
    pub boot_after_create: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct VpnRouterUpdateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub interfaces: Vec<ApiRouterInterface>,
    pub settings: RouterSettings,
}
