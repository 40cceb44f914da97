// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drives a VPN router toward its desired document.
//!
//! The router's status endpoint reports nothing for a few seconds after it
//! boots, so every mutation is followed by an unconditional settle delay
//! before the first read-back. Reading immediately would flatten an empty
//! status into the document and report phantom drift on the next plan.

use std::sync::Arc;

use slog::{info, o, Logger};

use cumulus_api_types::ResourceId;

use crate::client::VpnRouterClient;
use crate::converge::{ConvergeError, ConvergeOptions, Deadline, Outcome, Step};
use crate::lock_table::LockTable;
use crate::store::StateStore;

use super::{classify, convert, VpnRouterSpec};

pub struct VpnRouterDriver {
    client: Arc<dyn VpnRouterClient>,
    store: Arc<dyn StateStore<VpnRouterSpec>>,
    locks: Arc<LockTable>,
    opts: ConvergeOptions,
    log: Logger,
}

impl VpnRouterDriver {
    pub fn new(
        client: Arc<dyn VpnRouterClient>,
        store: Arc<dyn StateStore<VpnRouterSpec>>,
        locks: Arc<LockTable>,
        opts: ConvergeOptions,
        log: Logger,
    ) -> Self {
        Self { client, store, locks, opts, log: log.new(o!("driver" => "vpn_router")) }
    }

    pub async fn converge(
        &self,
        desired: &VpnRouterSpec,
        deadline: &Deadline,
    ) -> Result<Outcome<VpnRouterSpec>, ConvergeError> {
        let Some(id) = desired.id.as_value().cloned() else {
            return self.create(desired, deadline).await;
        };

        let prior = self.store.get(&id);
        let record = classify(prior.as_ref(), desired);
        if record.is_converged() {
            return self.read_back(&id, desired).await;
        }
        info!(self.log, "converging vpn router"; "id" => %id, "changes" => %record);

        if record.requires_recreation() {
            let req = convert::expand_create(desired)?;
            deadline.check(Step::Locking)?;
            let _guard = self.locks.lock(&id).await;
            self.teardown(&id, desired.force_shutdown).await?;
            self.store.remove(&id);

            deadline.check(Step::Mutating)?;
            let created = self
                .client
                .create(&req)
                .await
                .map_err(|e| ConvergeError::api(Step::Mutating, &id, e))?;
            self.wait_for_power(&created.id, Step::Polling, true).await?;
            self.settle().await;
            return self.read_back(&created.id, desired).await;
        }

        let payload = convert::expand_update(desired)?;
        deadline.check(Step::Locking)?;
        let _guard = self.locks.lock(&id).await;

        let mut stopped = false;
        if record.requires_disruption() {
            deadline.check(Step::Disrupting)?;
            let current = match self.client.read(&id).await {
                Ok(current) => current,
                Err(e) if e.is_not_found() => {
                    self.store.remove(&id);
                    return Ok(Outcome::Drop);
                }
                Err(e) => return Err(ConvergeError::api(Step::Disrupting, &id, e)),
            };
            if current.instance_status.is_up() {
                self.client
                    .shutdown(&id, desired.force_shutdown)
                    .await
                    .map_err(|e| ConvergeError::api(Step::Disrupting, &id, e))?;
                self.wait_for_power(&id, Step::Disrupting, false).await?;
                stopped = true;
            }
        }

        deadline.check(Step::Mutating)?;
        self.client
            .update(&id, &payload)
            .await
            .map_err(|e| ConvergeError::api(Step::Mutating, &id, e))?;

        if stopped {
            deadline.check(Step::Polling)?;
            self.client
                .boot(&id)
                .await
                .map_err(|e| ConvergeError::api(Step::Polling, &id, e))?;
            self.wait_for_power(&id, Step::Polling, true).await?;
        }
        self.settle().await;

        deadline.check(Step::Reading)?;
        self.read_back(&id, desired).await
    }

    pub async fn delete(
        &self,
        id: &ResourceId,
        force: bool,
        deadline: &Deadline,
    ) -> Result<(), ConvergeError> {
        deadline.check(Step::Locking)?;
        let _guard = self.locks.lock(id).await;
        self.teardown(id, force).await?;
        self.store.remove(id);
        Ok(())
    }

    async fn create(
        &self,
        desired: &VpnRouterSpec,
        deadline: &Deadline,
    ) -> Result<Outcome<VpnRouterSpec>, ConvergeError> {
        let req = convert::expand_create(desired)?;
        let name_id = ResourceId::new(desired.name.clone());

        deadline.check(Step::Mutating)?;
        info!(self.log, "creating vpn router"; "name" => %desired.name);
        let created = self
            .client
            .create(&req)
            .await
            .map_err(|e| ConvergeError::api(Step::Mutating, &name_id, e))?;

        self.wait_for_power(&created.id, Step::Polling, true).await?;
        self.settle().await;

        deadline.check(Step::Reading)?;
        self.read_back(&created.id, desired).await
    }

    async fn teardown(&self, id: &ResourceId, force: bool) -> Result<(), ConvergeError> {
        let current = match self.client.read(id).await {
            Ok(current) => current,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(ConvergeError::api(Step::Reading, id, e)),
        };

        if current.instance_status.is_up() {
            self.client
                .shutdown(id, force)
                .await
                .map_err(|e| ConvergeError::api(Step::Disrupting, id, e))?;
            self.wait_for_power(id, Step::Disrupting, false).await?;
        }

        self.client
            .delete(id)
            .await
            .map_err(|e| ConvergeError::api(Step::Mutating, id, e))?;
        info!(self.log, "deleted vpn router"; "id" => %id);
        Ok(())
    }

    /// The post-mutation settle delay. Unconditional and uninterruptible;
    /// there is no signal to wake up early for.
    async fn settle(&self) {
        tokio::time::sleep(self.opts.settle_delay).await;
    }

    async fn read_back(
        &self,
        id: &ResourceId,
        prior_desired: &VpnRouterSpec,
    ) -> Result<Outcome<VpnRouterSpec>, ConvergeError> {
        match self.client.read(id).await {
            Ok(api) => {
                let doc = convert::flatten(&api, Some(prior_desired));
                self.store.put(id.clone(), doc.clone());
                Ok(Outcome::Converged(doc))
            }
            Err(e) if e.is_not_found() => {
                info!(self.log, "vpn router vanished; dropping from state"; "id" => %id);
                self.store.remove(id);
                Ok(Outcome::Drop)
            }
            Err(e) => Err(ConvergeError::api(Step::Reading, id, e)),
        }
    }

    async fn wait_for_power(
        &self,
        id: &ResourceId,
        step: Step,
        want_up: bool,
    ) -> Result<(), ConvergeError> {
        for _ in 0..self.opts.poll_attempts {
            let current = self
                .client
                .read(id)
                .await
                .map_err(|e| ConvergeError::api(step, id, e))?;
            let settled = if want_up {
                current.instance_status.is_up()
            } else {
                current.instance_status.is_down()
            };
            if settled {
                return Ok(());
            }
            tokio::time::sleep(self.opts.poll_interval).await;
        }
        Err(ConvergeError::Timeout { step, id: id.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;

    use cumulus_api_types::vpn_router::{
        ApiVpnRouter, RouterPlan, VpnRouterCreateRequest, VpnRouterUpdateRequest,
    };
    use cumulus_api_types::InstanceStatus;

    use crate::client::ApiError;
    use crate::store::MemoryStore;
    use crate::value::FieldValue;
    use crate::vpn_router::{PrivateInterfaceSpec, PublicInterfaceSpec};

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, o!())
    }

    fn test_options() -> ConvergeOptions {
        ConvergeOptions {
            settle_delay: Duration::from_millis(20),
            poll_interval: Duration::from_millis(1),
            poll_attempts: 10,
            setup_retries: 3,
        }
    }

    struct MockRouterClient {
        state: Mutex<Option<ApiVpnRouter>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockRouterClient {
        fn new() -> Arc<Self> {
            Arc::new(Self { state: Mutex::new(None), calls: Mutex::new(Vec::new()) })
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VpnRouterClient for MockRouterClient {
        async fn create(
            &self,
            req: &VpnRouterCreateRequest,
        ) -> Result<ApiVpnRouter, ApiError> {
            self.record("create");
            let router = ApiVpnRouter {
                id: ResourceId::new("vr-100"),
                name: req.name.clone(),
                description: req.description.clone(),
                tags: req.tags.clone(),
                plan: req.plan,
                version: req.version,
                instance_status: if req.boot_after_create {
                    InstanceStatus::Up
                } else {
                    InstanceStatus::Down
                },
                interfaces: req.interfaces.clone(),
                settings: req.settings.clone(),
            };
            *self.state.lock().unwrap() = Some(router.clone());
            Ok(router)
        }

        async fn read(&self, _id: &ResourceId) -> Result<ApiVpnRouter, ApiError> {
            self.record("read");
            self.state.lock().unwrap().clone().ok_or(ApiError::NotFound)
        }

        async fn update(
            &self,
            _id: &ResourceId,
            req: &VpnRouterUpdateRequest,
        ) -> Result<ApiVpnRouter, ApiError> {
            self.record("update");
            let mut state = self.state.lock().unwrap();
            let router = state.as_mut().ok_or(ApiError::NotFound)?;
            router.name = req.name.clone();
            router.description = req.description.clone();
            router.tags = req.tags.clone();
            router.interfaces = req.interfaces.clone();
            router.settings = req.settings.clone();
            Ok(router.clone())
        }

        async fn delete(&self, _id: &ResourceId) -> Result<(), ApiError> {
            self.record("delete");
            *self.state.lock().unwrap() = None;
            Ok(())
        }

        async fn boot(&self, _id: &ResourceId) -> Result<(), ApiError> {
            self.record("boot");
            let mut state = self.state.lock().unwrap();
            let router = state.as_mut().ok_or(ApiError::NotFound)?;
            router.instance_status = InstanceStatus::Up;
            Ok(())
        }

        async fn shutdown(&self, _id: &ResourceId, _force: bool) -> Result<(), ApiError> {
            self.record("shutdown");
            let mut state = self.state.lock().unwrap();
            let router = state.as_mut().ok_or(ApiError::NotFound)?;
            router.instance_status = InstanceStatus::Down;
            Ok(())
        }
    }

    fn build_driver(
        client: &Arc<MockRouterClient>,
        store: &Arc<MemoryStore<VpnRouterSpec>>,
    ) -> VpnRouterDriver {
        VpnRouterDriver::new(
            Arc::clone(client) as Arc<dyn VpnRouterClient>,
            Arc::clone(store) as Arc<dyn StateStore<VpnRouterSpec>>,
            Arc::new(LockTable::new()),
            test_options(),
            test_logger(),
        )
    }

    fn desired() -> VpnRouterSpec {
        VpnRouterSpec {
            name: "edge-01".into(),
            plan: RouterPlan::Standard,
            private_interfaces: vec![PrivateInterfaceSpec {
                index: 1,
                switch_id: ResourceId::new("sw-1"),
                ip_addresses: vec!["192.168.1.1".into()],
                netmask_len: 24,
                virtual_ip_address: FieldValue::Null,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_settles_before_reading_back() {
        let client = MockRouterClient::new();
        let store = Arc::new(MemoryStore::new());
        let driver = build_driver(&client, &store);

        let started = Instant::now();
        let outcome = driver.converge(&desired(), &Deadline::none()).await.unwrap();
        assert!(
            started.elapsed() >= Duration::from_millis(20),
            "read-back must wait out the settle delay"
        );
        match outcome {
            Outcome::Converged(doc) => {
                assert_eq!(doc.id, FieldValue::Value(ResourceId::new("vr-100")));
            }
            Outcome::Drop => panic!("unexpected drop"),
        }
    }

    #[tokio::test]
    async fn settings_edit_applies_live() {
        let client = MockRouterClient::new();
        let store = Arc::new(MemoryStore::new());
        let driver = build_driver(&client, &store);

        let mut doc = match driver.converge(&desired(), &Deadline::none()).await.unwrap() {
            Outcome::Converged(doc) => doc,
            Outcome::Drop => panic!("unexpected drop"),
        };
        doc.syslog_host = FieldValue::Value("192.168.1.250".into());

        let before = client.calls().len();
        driver.converge(&doc, &Deadline::none()).await.unwrap();
        let after: Vec<_> = client.calls().split_off(before);
        assert!(after.contains(&"update".to_string()));
        assert!(!after.contains(&"shutdown".to_string()));
    }

    #[tokio::test]
    async fn interface_move_stops_the_router_first() {
        let client = MockRouterClient::new();
        let store = Arc::new(MemoryStore::new());
        let driver = build_driver(&client, &store);

        let mut doc = match driver.converge(&desired(), &Deadline::none()).await.unwrap() {
            Outcome::Converged(doc) => doc,
            Outcome::Drop => panic!("unexpected drop"),
        };
        doc.private_interfaces[0].switch_id = ResourceId::new("sw-2");

        let before = client.calls().len();
        driver.converge(&doc, &Deadline::none()).await.unwrap();
        let after: Vec<_> = client.calls().split_off(before);

        let shutdown = after.iter().position(|c| c == "shutdown").unwrap();
        let update = after.iter().position(|c| c == "update").unwrap();
        let boot = after.iter().position(|c| c == "boot").unwrap();
        assert!(shutdown < update && update < boot);
    }

    #[tokio::test]
    async fn plan_change_recreates() {
        let client = MockRouterClient::new();
        let store = Arc::new(MemoryStore::new());
        let driver = build_driver(&client, &store);

        let mut doc = match driver.converge(&desired(), &Deadline::none()).await.unwrap() {
            Outcome::Converged(doc) => doc,
            Outcome::Drop => panic!("unexpected drop"),
        };
        doc.plan = RouterPlan::Premium;
        doc.public_interface = FieldValue::Value(PublicInterfaceSpec {
            switch_id: ResourceId::new("sw-pub"),
            ip_addresses: vec!["203.0.113.2".into()],
            virtual_ip_address: FieldValue::Null,
            ip_aliases: Vec::new(),
            vrid: 1,
        });

        let before = client.calls().len();
        driver.converge(&doc, &Deadline::none()).await.unwrap();
        let after: Vec<_> = client.calls().split_off(before);

        let delete = after.iter().position(|c| c == "delete").unwrap();
        let create = after.iter().position(|c| c == "create").unwrap();
        assert!(delete < create);
    }

    #[tokio::test]
    async fn vanished_router_drops_from_state() {
        let client = MockRouterClient::new();
        let store = Arc::new(MemoryStore::new());
        let driver = build_driver(&client, &store);

        let doc = match driver.converge(&desired(), &Deadline::none()).await.unwrap() {
            Outcome::Converged(doc) => doc,
            Outcome::Drop => panic!("unexpected drop"),
        };

        *client.state.lock().unwrap() = None;

        let outcome = driver.converge(&doc, &Deadline::none()).await.unwrap();
        assert_eq!(outcome, Outcome::Drop);
        assert!(store.get(&ResourceId::new("vr-100")).is_none());
    }
}
