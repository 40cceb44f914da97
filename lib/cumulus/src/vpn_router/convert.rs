// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Expand/flatten translation for VPN routers.
//!
//! The control plane reports interface attachment and interface IP
//! configuration as two separate lists with no ordering promise between or
//! within them. Flattening joins the two by the server-assigned `index` and
//! emits private interfaces sorted by it, so a document produced from
//! canonical state is stable no matter what order the API returned.

use cumulus_api_types::vpn_router::{
    ApiRouterInterface, ApiVpnRouter, InterfaceSetting, RouterPlan,
    RouterSettings, VpnRouterCreateRequest, VpnRouterUpdateRequest,
};

use crate::convert::{expand_tags, flatten_tags, ExpandError};
use crate::value::FieldValue;

use super::{PrivateInterfaceSpec, PublicInterfaceSpec, VpnRouterSpec};

const DEFAULT_VERSION: u32 = 2;

pub fn expand_create(
    spec: &VpnRouterSpec,
) -> Result<VpnRouterCreateRequest, ExpandError> {
    if spec.name.is_empty() {
        return Err(ExpandError::MissingRequired("name"));
    }
    Ok(VpnRouterCreateRequest {
        name: spec.name.clone(),
        description: spec.description.value_or(String::new()),
        tags: expand_tags(&spec.tags),
        plan: spec.plan,
        version: spec.version.value_or(DEFAULT_VERSION),
        interfaces: expand_interfaces(spec)?,
        settings: expand_settings(spec)?,
        boot_after_create: true,
    })
}

pub fn expand_update(
    spec: &VpnRouterSpec,
) -> Result<VpnRouterUpdateRequest, ExpandError> {
    if spec.name.is_empty() {
        return Err(ExpandError::MissingRequired("name"));
    }
    Ok(VpnRouterUpdateRequest {
        name: spec.name.clone(),
        description: spec.description.value_or(String::new()),
        tags: expand_tags(&spec.tags),
        interfaces: expand_interfaces(spec)?,
        settings: expand_settings(spec)?,
    })
}

fn public_interface(
    spec: &VpnRouterSpec,
) -> Result<Option<&PublicInterfaceSpec>, ExpandError> {
    match spec.plan {
        RouterPlan::Standard => Ok(None),
        // The premium plans front a user switch; without one there is
        // nothing to attach the public side to.
        RouterPlan::Premium | RouterPlan::HighSpec => spec
            .public_interface
            .as_value()
            .map(Some)
            .ok_or(ExpandError::MissingRequired("public_network_interface")),
    }
}

fn expand_interfaces(
    spec: &VpnRouterSpec,
) -> Result<Vec<ApiRouterInterface>, ExpandError> {
    let mut interfaces = vec![ApiRouterInterface {
        index: 0,
        switch_id: public_interface(spec)?.map(|p| p.switch_id.clone()),
    }];
    for iface in &spec.private_interfaces {
        interfaces.push(ApiRouterInterface {
            index: iface.index,
            switch_id: Some(iface.switch_id.clone()),
        });
    }
    Ok(interfaces)
}

fn expand_settings(spec: &VpnRouterSpec) -> Result<RouterSettings, ExpandError> {
    let public = public_interface(spec)?;

    let mut interface_settings = Vec::new();
    if let Some(public) = public {
        interface_settings.push(InterfaceSetting {
            index: 0,
            ip_addresses: public.ip_addresses.clone(),
            netmask_len: None,
            virtual_ip_address: public.virtual_ip_address.request_value(),
            ip_aliases: public.ip_aliases.clone(),
        });
    }
    for iface in &spec.private_interfaces {
        interface_settings.push(InterfaceSetting {
            index: iface.index,
            ip_addresses: iface.ip_addresses.clone(),
            netmask_len: Some(iface.netmask_len),
            virtual_ip_address: iface.virtual_ip_address.request_value(),
            ip_aliases: Vec::new(),
        });
    }

    Ok(RouterSettings {
        vrid: public.map(|p| p.vrid).unwrap_or(0),
        internet_connection: spec.internet_connection.value_or(true),
        interface_settings,
        static_nat: spec.static_nat.clone(),
        port_forwarding: spec.port_forwarding.clone(),
        firewall: spec.firewall.clone(),
        dhcp_servers: spec.dhcp_servers.clone(),
        l2tp: spec.l2tp.request_value(),
        wire_guard: spec.wire_guard.request_value(),
        users: spec.users.clone(),
        static_routes: spec.static_routes.clone(),
        syslog_host: spec.syslog_host.value_or(String::new()),
    })
}

pub fn flatten(api: &ApiVpnRouter, prior: Option<&VpnRouterSpec>) -> VpnRouterSpec {
    VpnRouterSpec {
        id: FieldValue::Value(api.id.clone()),
        name: api.name.clone(),
        description: FieldValue::Value(api.description.clone()),
        tags: flatten_tags(&api.tags),
        plan: api.plan,
        version: FieldValue::Value(api.version),
        public_interface: flatten_public_interface(api),
        private_interfaces: flatten_private_interfaces(api),
        internet_connection: FieldValue::Value(api.settings.internet_connection),
        static_nat: api.settings.static_nat.clone(),
        port_forwarding: api.settings.port_forwarding.clone(),
        firewall: api.settings.firewall.clone(),
        dhcp_servers: api.settings.dhcp_servers.clone(),
        l2tp: api.settings.l2tp.clone().into(),
        wire_guard: api.settings.wire_guard.clone().into(),
        users: api.settings.users.clone(),
        static_routes: api.settings.static_routes.clone(),
        syslog_host: if api.settings.syslog_host.is_empty() {
            FieldValue::Null
        } else {
            FieldValue::Value(api.settings.syslog_host.clone())
        },
        force_shutdown: prior.map(|p| p.force_shutdown).unwrap_or(false),
    }
}

fn flatten_public_interface(api: &ApiVpnRouter) -> FieldValue<PublicInterfaceSpec> {
    if api.plan == RouterPlan::Standard {
        return FieldValue::Null;
    }
    let Some(attachment) =
        api.interfaces.iter().find(|i| i.index == 0).and_then(|i| i.switch_id.clone())
    else {
        return FieldValue::Null;
    };
    let setting = api.settings.interface_settings.iter().find(|s| s.index == 0);

    FieldValue::Value(PublicInterfaceSpec {
        switch_id: attachment,
        ip_addresses: setting.map(|s| s.ip_addresses.clone()).unwrap_or_default(),
        virtual_ip_address: setting
            .and_then(|s| s.virtual_ip_address.clone())
            .into(),
        ip_aliases: setting.map(|s| s.ip_aliases.clone()).unwrap_or_default(),
        vrid: api.settings.vrid,
    })
}

/// Joins IP configuration with switch attachment by interface index. A
/// settings entry whose interface has no attachment is configuration debris
/// left behind by a detach and is skipped. The result is sorted by index.
fn flatten_private_interfaces(api: &ApiVpnRouter) -> Vec<PrivateInterfaceSpec> {
    let mut interfaces = Vec::new();
    for setting in &api.settings.interface_settings {
        if setting.index == 0 {
            continue;
        }
        let attachment = api
            .interfaces
            .iter()
            .find(|i| i.index == setting.index)
            .and_then(|i| i.switch_id.clone());
        let Some(switch_id) = attachment else {
            continue;
        };
        interfaces.push(PrivateInterfaceSpec {
            index: setting.index,
            switch_id,
            ip_addresses: setting.ip_addresses.clone(),
            netmask_len: setting.netmask_len.unwrap_or(0),
            virtual_ip_address: setting.virtual_ip_address.clone().into(),
        });
    }
    interfaces.sort_by_key(|i| i.index);
    interfaces
}

#[cfg(test)]
mod tests {
    use super::*;

    use cumulus_api_types::{InstanceStatus, ResourceId};

    fn premium_spec() -> VpnRouterSpec {
        VpnRouterSpec {
            name: "edge-01".into(),
            plan: RouterPlan::Premium,
            public_interface: FieldValue::Value(PublicInterfaceSpec {
                switch_id: ResourceId::new("sw-pub"),
                ip_addresses: vec!["203.0.113.2".into(), "203.0.113.3".into()],
                virtual_ip_address: FieldValue::Value("203.0.113.1".into()),
                ip_aliases: Vec::new(),
                vrid: 1,
            }),
            private_interfaces: vec![
                PrivateInterfaceSpec {
                    index: 2,
                    switch_id: ResourceId::new("sw-2"),
                    ip_addresses: vec!["192.168.2.1".into()],
                    netmask_len: 24,
                    virtual_ip_address: FieldValue::Null,
                },
                PrivateInterfaceSpec {
                    index: 1,
                    switch_id: ResourceId::new("sw-1"),
                    ip_addresses: vec!["192.168.1.1".into()],
                    netmask_len: 24,
                    virtual_ip_address: FieldValue::Null,
                },
            ],
            ..Default::default()
        }
    }

    fn apply_create(req: &VpnRouterCreateRequest) -> ApiVpnRouter {
        ApiVpnRouter {
            id: ResourceId::new("vr-100"),
            name: req.name.clone(),
            description: req.description.clone(),
            tags: req.tags.clone(),
            plan: req.plan,
            version: req.version,
            instance_status: InstanceStatus::Up,
            interfaces: req.interfaces.clone(),
            settings: req.settings.clone(),
        }
    }

    #[test]
    fn premium_plan_requires_a_public_interface() {
        let mut spec = premium_spec();
        spec.public_interface = FieldValue::Default;
        assert!(matches!(
            expand_create(&spec),
            Err(ExpandError::MissingRequired("public_network_interface"))
        ));
    }

    #[test]
    fn standard_plan_attaches_index_zero_to_the_shared_segment() {
        let spec = VpnRouterSpec {
            name: "edge-01".into(),
            plan: RouterPlan::Standard,
            ..Default::default()
        };
        let req = expand_create(&spec).unwrap();
        assert_eq!(req.interfaces[0].index, 0);
        assert!(req.interfaces[0].switch_id.is_none());
        // No IP configuration is emitted for the shared side.
        assert!(req.settings.interface_settings.is_empty());
    }

    #[test]
    fn flatten_joins_settings_and_attachments_by_index() {
        let mut api = apply_create(&expand_create(&premium_spec()).unwrap());
        // Shuffle both lists so a positional join would produce garbage.
        api.interfaces.reverse();
        api.settings.interface_settings.reverse();

        let doc = flatten(&api, None);
        assert_eq!(doc.private_interfaces.len(), 2);
        assert_eq!(doc.private_interfaces[0].index, 1);
        assert_eq!(doc.private_interfaces[0].switch_id.as_str(), "sw-1");
        assert_eq!(doc.private_interfaces[1].index, 2);
        assert_eq!(doc.private_interfaces[1].switch_id.as_str(), "sw-2");
    }

    #[test]
    fn detached_settings_debris_is_skipped() {
        let mut api = apply_create(&expand_create(&premium_spec()).unwrap());
        // Interface 2 was detached but its IP configuration lingers.
        api.interfaces.retain(|i| i.index != 2);

        let doc = flatten(&api, None);
        assert_eq!(doc.private_interfaces.len(), 1);
        assert_eq!(doc.private_interfaces[0].index, 1);
    }

    #[test]
    fn standard_plan_flattens_without_a_public_interface() {
        let spec = VpnRouterSpec {
            name: "edge-01".into(),
            plan: RouterPlan::Standard,
            ..Default::default()
        };
        let api = apply_create(&expand_create(&spec).unwrap());
        let doc = flatten(&api, None);
        assert_eq!(doc.public_interface, FieldValue::Null);
    }

    #[test]
    fn round_trips_persisted_fields() {
        let spec = premium_spec();
        let api = apply_create(&expand_create(&spec).unwrap());
        let doc = flatten(&api, Some(&spec));

        assert_eq!(doc.name, spec.name);
        assert_eq!(doc.plan, spec.plan);
        assert_eq!(doc.public_interface, spec.public_interface);
        // Flattening orders by index; the document had them reversed.
        assert_eq!(doc.private_interfaces[0], spec.private_interfaces[1]);
        assert_eq!(doc.private_interfaces[1], spec.private_interfaces[0]);
    }
}
