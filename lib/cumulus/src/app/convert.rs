// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Expand/flatten translation for managed applications.
//!
//! Two things make this translator more than field copying. First, the
//! traffic split references versions positionally against a separately
//! fetched list, so expansion takes that list and refuses out-of-range
//! indexes before anything is sent. Second, the registry password is
//! write-only: reads never include it, so flattening looks the prior
//! document's component of the same name up and carries the credential
//! forward — a versioned write-once marker wins over a plain password when
//! prior state somehow carries both.

use cumulus_api_types::app::{
    ApiApplication, ApiComponent, ApiPacketFilter, ApiTraffic, ApiVersion,
    AppCreateRequest, AppUpdateRequest, ComponentRequest, ContainerRegistryRequest,
    DeploySourceRequest, TrafficTarget,
};

use crate::convert::ExpandError;
use crate::value::FieldValue;

use super::{AppSpec, ComponentSpec, PacketFilterSpec, RegistrySpec, TrafficSpec};

pub fn expand_create(spec: &AppSpec) -> Result<AppCreateRequest, ExpandError> {
    if spec.name.is_empty() {
        return Err(ExpandError::MissingRequired("name"));
    }
    if spec.components.is_empty() {
        return Err(ExpandError::MissingRequired("components"));
    }
    Ok(AppCreateRequest {
        name: spec.name.clone(),
        timeout_seconds: spec.timeout_seconds,
        port: spec.port,
        min_scale: spec.min_scale,
        max_scale: spec.max_scale,
        components: spec.components.iter().map(expand_component).collect(),
    })
}

pub fn expand_update(spec: &AppSpec) -> Result<AppUpdateRequest, ExpandError> {
    if spec.components.is_empty() {
        return Err(ExpandError::MissingRequired("components"));
    }
    Ok(AppUpdateRequest {
        timeout_seconds: spec.timeout_seconds,
        port: spec.port,
        min_scale: spec.min_scale,
        max_scale: spec.max_scale,
        components: spec.components.iter().map(expand_component).collect(),
    })
}

fn expand_component(component: &ComponentSpec) -> ComponentRequest {
    ComponentRequest {
        name: component.name.clone(),
        max_cpu: component.max_cpu.clone(),
        max_memory: component.max_memory.clone(),
        deploy_source: DeploySourceRequest {
            container_registry: expand_registry(&component.registry),
        },
        env: component.env.iter().cloned().collect(),
        probe: component.probe.request_value(),
    }
}

fn expand_registry(registry: &RegistrySpec) -> ContainerRegistryRequest {
    // The write-once form takes precedence on the wire as well: when the
    // operator moved its version marker they intend that value, whatever a
    // stale plain password says.
    let password = registry
        .password_wo
        .request_value()
        .or_else(|| registry.password.request_value());
    ContainerRegistryRequest {
        image: registry.image.clone(),
        server: registry.server.request_value(),
        username: registry.username.request_value(),
        password,
    }
}

/// Resolves the traffic split against the fetched version list. An empty
/// split routes everything to the latest version. An index beyond the list
/// is a configuration error reported before any mutating call.
pub fn expand_traffics(
    traffics: &[TrafficSpec],
    versions: &[ApiVersion],
) -> Result<Vec<ApiTraffic>, ExpandError> {
    if traffics.is_empty() {
        return Ok(vec![ApiTraffic { target: TrafficTarget::LatestVersion, percent: 100 }]);
    }

    let mut result = Vec::with_capacity(traffics.len());
    for traffic in traffics {
        let version = versions.get(traffic.version_index).ok_or(
            ExpandError::VersionIndexOutOfRange {
                index: traffic.version_index,
                len: versions.len(),
            },
        )?;
        result.push(ApiTraffic {
            target: TrafficTarget::Version { name: version.name.clone() },
            percent: traffic.percent,
        });
    }
    Ok(result)
}

/// An absent packet filter expands to "disabled", which is what the control
/// plane reports for an application that never had one.
pub fn expand_packet_filter(spec: &AppSpec) -> ApiPacketFilter {
    match spec.packet_filter.as_value() {
        Some(filter) => ApiPacketFilter {
            enabled: filter.enabled,
            rules: filter.rules.clone(),
        },
        None => ApiPacketFilter { enabled: false, rules: Vec::new() },
    }
}

pub fn flatten(
    api: &ApiApplication,
    versions: &[ApiVersion],
    traffics: &[ApiTraffic],
    packet_filter: &ApiPacketFilter,
    prior: Option<&AppSpec>,
) -> AppSpec {
    AppSpec {
        id: FieldValue::Value(api.id.clone()),
        name: api.name.clone(),
        timeout_seconds: api.timeout_seconds,
        port: api.port,
        min_scale: api.min_scale,
        max_scale: api.max_scale,
        components: api
            .components
            .iter()
            .map(|c| flatten_component(c, prior))
            .collect(),
        traffics: flatten_traffics(traffics, versions),
        packet_filter: flatten_packet_filter(packet_filter),
        status: FieldValue::Value(api.status.clone()),
        public_url: FieldValue::Value(api.public_url.clone()),
    }
}

fn flatten_component(api: &ApiComponent, prior: Option<&AppSpec>) -> ComponentSpec {
    let mut registry = RegistrySpec {
        image: api.deploy_source.container_registry.image.clone(),
        server: api.deploy_source.container_registry.server.clone().into(),
        username: api.deploy_source.container_registry.username.clone().into(),
        password: FieldValue::Null,
        password_wo: FieldValue::Null,
        password_wo_version: FieldValue::Null,
    };

    // The password is never echoed. Without the carry-forward the flattened
    // document would clear it and every subsequent plan would try to "fix"
    // the credential. Prior components are matched by name; the versioned
    // write-once marker takes precedence over a plain password.
    if let Some(prior_component) = prior.and_then(|p| {
        p.components.iter().find(|c| c.name == api.name)
    }) {
        if prior_component
            .registry
            .password_wo_version
            .as_value()
            .is_some_and(|v| *v > 0)
        {
            registry.password_wo_version =
                prior_component.registry.password_wo_version.clone();
        } else if prior_component
            .registry
            .password
            .as_value()
            .is_some_and(|p| !p.is_empty())
        {
            registry.password = prior_component.registry.password.clone();
        }
    }

    ComponentSpec {
        name: api.name.clone(),
        max_cpu: api.max_cpu.clone(),
        max_memory: api.max_memory.clone(),
        registry,
        env: api.env.iter().cloned().collect(),
        probe: api.probe.clone().into(),
    }
}

/// Maps wire traffic entries back to positional references. The version list
/// is newest-first, so "latest" is index 0; an entry naming a version that
/// has since been pruned from the list has nothing to reference and is
/// dropped.
fn flatten_traffics(traffics: &[ApiTraffic], versions: &[ApiVersion]) -> Vec<TrafficSpec> {
    let mut result = Vec::new();
    for traffic in traffics {
        let version_index = match &traffic.target {
            TrafficTarget::LatestVersion => Some(0),
            TrafficTarget::Version { name } => {
                versions.iter().position(|v| &v.name == name)
            }
        };
        if let Some(version_index) = version_index {
            result.push(TrafficSpec { version_index, percent: traffic.percent });
        }
    }
    result
}

fn flatten_packet_filter(filter: &ApiPacketFilter) -> FieldValue<PacketFilterSpec> {
    if !filter.enabled && filter.rules.is_empty() {
        return FieldValue::Null;
    }
    FieldValue::Value(PacketFilterSpec {
        enabled: filter.enabled,
        rules: filter.rules.clone(),
    })
}
