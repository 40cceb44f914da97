// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The managed application desired document and its change classifier.
//!
//! An application has no power state; its disruptive boundary is component
//! identity. Components are addressed by name on the control plane, so
//! renaming one (or adding/removing one) is a different application as far
//! as deployment history is concerned and grades as recreation. Everything
//! else — scaling knobs, component internals, the traffic split, the packet
//! filter — applies live.

pub mod convert;
pub mod driver;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use cumulus_api_types::{
    app::{EnvVar, PacketFilterRule, Probe},
    ResourceId,
};

use crate::classify::{ChangeRecord, Severity};
use crate::value::FieldValue;

/// Container registry coordinates. The password family is write-only: the
/// control plane accepts it and never echoes it, so flattening carries it
/// forward from the prior document (see [`convert::flatten`]).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RegistrySpec {
    pub image: String,
    pub server: FieldValue<String>,
    pub username: FieldValue<String>,
    /// Plain write-only password, re-sent on every apply.
    pub password: FieldValue<String>,
    /// Write-once password; sent only when its version marker moves.
    pub password_wo: FieldValue<String>,
    pub password_wo_version: FieldValue<u32>,
}

impl RegistrySpec {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            server: FieldValue::Default,
            username: FieldValue::Default,
            password: FieldValue::Default,
            password_wo: FieldValue::Default,
            password_wo_version: FieldValue::Default,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ComponentSpec {
    pub name: String,
    pub max_cpu: String,
    pub max_memory: String,
    pub registry: RegistrySpec,
    pub env: BTreeSet<EnvVar>,
    pub probe: FieldValue<Probe>,
}

/// One entry of the traffic split. `version_index` addresses the separately
/// fetched version list positionally (0 is the newest version).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrafficSpec {
    pub version_index: usize,
    pub percent: u8,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PacketFilterSpec {
    pub enabled: bool,
    pub rules: Vec<PacketFilterRule>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AppSpec {
    pub id: FieldValue<ResourceId>,
    pub name: String,
    pub timeout_seconds: u32,
    pub port: u16,
    pub min_scale: u32,
    pub max_scale: u32,
    pub components: Vec<ComponentSpec>,
    pub traffics: Vec<TrafficSpec>,
    pub packet_filter: FieldValue<PacketFilterSpec>,

    // Filled from canonical state on read-back.
    pub status: FieldValue<String>,
    pub public_url: FieldValue<String>,
}

pub fn classify(prior: Option<&AppSpec>, new: &AppSpec) -> ChangeRecord {
    let Some(prior) = prior else {
        return ChangeRecord::no_prior_state();
    };

    let mut record = ChangeRecord::new();
    record.compare("name", Severity::LiveUpdatable, &prior.name, &new.name);
    record.compare(
        "timeout_seconds",
        Severity::LiveUpdatable,
        &prior.timeout_seconds,
        &new.timeout_seconds,
    );
    record.compare("port", Severity::LiveUpdatable, &prior.port, &new.port);
    record.compare(
        "min_scale",
        Severity::LiveUpdatable,
        &prior.min_scale,
        &new.min_scale,
    );
    record.compare(
        "max_scale",
        Severity::LiveUpdatable,
        &prior.max_scale,
        &new.max_scale,
    );

    // Component identity is by name; a different name set means a different
    // application. Same names with different contents update live.
    let prior_names: Vec<&str> = prior.components.iter().map(|c| c.name.as_str()).collect();
    let new_names: Vec<&str> = new.components.iter().map(|c| c.name.as_str()).collect();
    if prior_names != new_names {
        record.push("components.name", Severity::RequiresRecreation);
    } else if prior.components != new.components {
        record.push("components", Severity::LiveUpdatable);
    }

    record.compare("traffics", Severity::LiveUpdatable, &prior.traffics, &new.traffics);
    record.compare(
        "packet_filter",
        Severity::LiveUpdatable,
        &prior.packet_filter,
        &new.packet_filter,
    );

    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str) -> ComponentSpec {
        ComponentSpec {
            name: name.to_string(),
            max_cpu: "1".to_string(),
            max_memory: "1Gi".to_string(),
            registry: RegistrySpec::new("registry.example.com/app:v1"),
            env: BTreeSet::new(),
            probe: FieldValue::Null,
        }
    }

    fn base_spec() -> AppSpec {
        AppSpec {
            id: FieldValue::Value(ResourceId::new("app-1")),
            name: "orders".to_string(),
            timeout_seconds: 60,
            port: 8080,
            min_scale: 1,
            max_scale: 4,
            components: vec![component("web")],
            ..Default::default()
        }
    }

    #[test]
    fn no_prior_state_always_requires_disruption() {
        assert!(classify(None, &base_spec()).requires_disruption());
    }

    #[test]
    fn scale_change_is_live() {
        let prior = base_spec();
        let mut new = base_spec();
        new.max_scale = 8;

        let record = classify(Some(&prior), &new);
        assert_eq!(record.severity(), Some(Severity::LiveUpdatable));
    }

    #[test]
    fn component_rename_requires_recreation() {
        let prior = base_spec();
        let mut new = base_spec();
        new.components[0].name = "frontend".to_string();

        assert!(classify(Some(&prior), &new).requires_recreation());
    }

    #[test]
    fn component_image_bump_is_live() {
        let prior = base_spec();
        let mut new = base_spec();
        new.components[0].registry.image = "registry.example.com/app:v2".to_string();

        let record = classify(Some(&prior), &new);
        assert_eq!(record.severity(), Some(Severity::LiveUpdatable));
    }

    #[test]
    fn traffic_shift_is_live() {
        let prior = base_spec();
        let mut new = base_spec();
        new.traffics = vec![
            TrafficSpec { version_index: 0, percent: 90 },
            TrafficSpec { version_index: 1, percent: 10 },
        ];

        let record = classify(Some(&prior), &new);
        assert_eq!(record.severity(), Some(Severity::LiveUpdatable));
    }
}
