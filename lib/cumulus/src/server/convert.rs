// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Expand/flatten translation for servers.
//!
//! Pure in both directions. Expansion resolves schema defaults (one core,
//! one GiB) and omits anything the operator left to the control plane;
//! flattening rebuilds a desired document from canonical state, deriving
//! each NIC's upstream from its switch attachment and scope.

use cumulus_api_types::server::{
    ApiInterface, ApiServer, InterfaceRequest, ServerCreateRequest,
    ServerUpdateRequest,
};
use cumulus_api_types::SwitchScope;

use crate::convert::{expand_tags, flatten_tags, ExpandError};
use crate::value::FieldValue;

use super::{NicSpec, ServerSpec, Upstream};

const DEFAULT_CORE: u32 = 1;
const DEFAULT_MEMORY_GB: u32 = 1;

pub fn expand_create(spec: &ServerSpec) -> Result<ServerCreateRequest, ExpandError> {
    if spec.name.is_empty() {
        return Err(ExpandError::MissingRequired("name"));
    }
    Ok(ServerCreateRequest {
        name: spec.name.clone(),
        description: spec.description.value_or(String::new()),
        tags: expand_tags(&spec.tags),
        cpu: spec.core.value_or(DEFAULT_CORE),
        memory_mb: u64::from(spec.memory_gb.value_or(DEFAULT_MEMORY_GB)) * 1024,
        gpu: spec.gpu.value_or(0),
        cpu_model: spec.cpu_model.request_value(),
        commitment: spec.commitment.value_or(Default::default()),
        interface_driver: spec.interface_driver.value_or(Default::default()),
        interfaces: spec.network_interfaces.iter().map(expand_interface).collect(),
        disk_ids: spec.disks.iter().cloned().collect(),
        cdrom_id: spec.cdrom_id.request_value(),
        private_host_id: spec.private_host_id.request_value(),
        boot_after_create: true,
    })
}

pub fn expand_update(spec: &ServerSpec) -> Result<ServerUpdateRequest, ExpandError> {
    if spec.name.is_empty() {
        return Err(ExpandError::MissingRequired("name"));
    }
    Ok(ServerUpdateRequest {
        name: spec.name.clone(),
        description: spec.description.value_or(String::new()),
        tags: expand_tags(&spec.tags),
        cpu: spec.core.value_or(DEFAULT_CORE),
        memory_mb: u64::from(spec.memory_gb.value_or(DEFAULT_MEMORY_GB)) * 1024,
        gpu: spec.gpu.value_or(0),
        cpu_model: spec.cpu_model.request_value(),
        commitment: spec.commitment.value_or(Default::default()),
        interface_driver: spec.interface_driver.value_or(Default::default()),
        interfaces: spec.network_interfaces.iter().map(expand_interface).collect(),
        cdrom_id: spec.cdrom_id.request_value(),
        private_host_id: spec.private_host_id.request_value(),
    })
}

fn expand_interface(nic: &NicSpec) -> InterfaceRequest {
    match &nic.upstream {
        Upstream::Shared => InterfaceRequest::Shared {
            packet_filter_id: nic.packet_filter_id.request_value(),
        },
        Upstream::Disconnect => InterfaceRequest::Disconnected,
        Upstream::Switch { switch_id } => InterfaceRequest::Switch {
            switch_id: switch_id.clone(),
            packet_filter_id: nic.packet_filter_id.request_value(),
            display_ip_address: nic.user_ip_address.request_value(),
        },
    }
}

/// Rebuilds a desired document from canonical state.
///
/// `prior` supplies the fields the control plane does not echo: here that is
/// only the local `force_shutdown` knob, which has no remote counterpart.
pub fn flatten(api: &ApiServer, prior: Option<&ServerSpec>) -> ServerSpec {
    let (ip, gateway, netmask, network_address) = flatten_network_info(api);

    ServerSpec {
        id: FieldValue::Value(api.id.clone()),
        name: api.name.clone(),
        description: FieldValue::Value(api.description.clone()),
        tags: flatten_tags(&api.tags),
        core: FieldValue::Value(api.cpu),
        memory_gb: FieldValue::Value(api.memory_gb() as u32),
        gpu: FieldValue::Value(api.gpu),
        cpu_model: FieldValue::Value(api.cpu_model.clone()),
        commitment: FieldValue::Value(api.commitment),
        interface_driver: FieldValue::Value(api.interface_driver),
        disks: api.disk_ids.iter().cloned().collect(),
        network_interfaces: api.interfaces.iter().map(flatten_interface).collect(),
        cdrom_id: api.cdrom_id.clone().into(),
        private_host_id: api.private_host_id.clone().into(),
        private_host_name: FieldValue::Value(api.private_host_name.clone()),
        force_shutdown: prior.map(|p| p.force_shutdown).unwrap_or(false),
        ip_address: ip,
        gateway,
        network_address,
        netmask,
        hostname: FieldValue::Value(api.hostname.clone()),
        dns_servers: FieldValue::Value(api.dns_servers.clone()),
    }
}

fn flatten_interface(nic: &ApiInterface) -> NicSpec {
    let upstream = match (&nic.switch_id, nic.switch_scope) {
        (None, _) => Upstream::Disconnect,
        (Some(_), Some(SwitchScope::Shared)) => Upstream::Shared,
        (Some(id), _) => Upstream::Switch { switch_id: id.clone() },
    };
    let user_ip_address = if nic.user_ip_address.is_empty() {
        FieldValue::Null
    } else {
        FieldValue::Value(nic.user_ip_address.clone())
    };
    NicSpec {
        upstream,
        user_ip_address,
        packet_filter_id: nic.packet_filter_id.clone().into(),
        mac_address: FieldValue::Value(nic.mac_address.to_lowercase()),
    }
}

/// Network facts are reported on the primary NIC: the shared segment assigns
/// the address itself, a user switch only records what the operator wrote.
/// A disconnected primary has no network facts at all.
fn flatten_network_info(
    api: &ApiServer,
) -> (FieldValue<String>, FieldValue<String>, FieldValue<u8>, FieldValue<String>) {
    let Some(nic) = api.interfaces.first() else {
        return (FieldValue::Null, FieldValue::Null, FieldValue::Null, FieldValue::Null);
    };
    if nic.switch_id.is_none() {
        return (FieldValue::Null, FieldValue::Null, FieldValue::Null, FieldValue::Null);
    }

    let ip = match nic.switch_scope {
        Some(SwitchScope::Shared) => nic.ip_address.clone(),
        _ => nic.user_ip_address.clone(),
    };
    let ip = if ip.is_empty() { FieldValue::Null } else { FieldValue::Value(ip) };
    let gateway = if nic.user_default_route.is_empty() {
        FieldValue::Null
    } else {
        FieldValue::Value(nic.user_default_route.clone())
    };
    let netmask = nic.user_netmask_len.into();
    let network_address = if nic.subnet_network_address.is_empty() {
        FieldValue::Null
    } else {
        FieldValue::Value(nic.subnet_network_address.clone())
    };
    (ip, gateway, netmask, network_address)
}
