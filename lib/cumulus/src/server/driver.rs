// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drives a server toward its desired document.
//!
//! A run is a straight line through the convergence steps: classify, lock,
//! stop if the change demands it, mutate, reconcile disk attachments, restore
//! power, read canonical state back, flatten. The per-identifier lock is held
//! from before the first mutating call until the run ends, and is released by
//! guard drop on every path out, including panics and expired deadlines.

use std::collections::BTreeSet;
use std::sync::Arc;

use slog::{info, o, Logger};

use cumulus_api_types::ResourceId;

use crate::client::ServerClient;
use crate::converge::{ConvergeError, ConvergeOptions, Deadline, Outcome, Step};
use crate::lock_table::LockTable;
use crate::store::StateStore;

use super::{classify, convert, ServerSpec};

pub struct ServerDriver {
    client: Arc<dyn ServerClient>,
    store: Arc<dyn StateStore<ServerSpec>>,
    locks: Arc<LockTable>,
    opts: ConvergeOptions,
    log: Logger,
}

impl ServerDriver {
    pub fn new(
        client: Arc<dyn ServerClient>,
        store: Arc<dyn StateStore<ServerSpec>>,
        locks: Arc<LockTable>,
        opts: ConvergeOptions,
        log: Logger,
    ) -> Self {
        Self { client, store, locks, opts, log: log.new(o!("driver" => "server")) }
    }

    /// Converges the remote server to `desired`. With no identifier in the
    /// document the object does not exist yet and is created; otherwise the
    /// change record decides between a live update, a stop-update-boot
    /// cycle, and doing nothing but refreshing canonical state.
    pub async fn converge(
        &self,
        desired: &ServerSpec,
        deadline: &Deadline,
    ) -> Result<Outcome<ServerSpec>, ConvergeError> {
        let Some(id) = desired.id.as_value().cloned() else {
            return self.create(desired, deadline).await;
        };

        let prior = self.store.get(&id);
        let record = classify(prior.as_ref(), desired);
        if record.is_converged() {
            return self.read_back(&id, desired).await;
        }
        info!(self.log, "converging server"; "id" => %id, "changes" => %record);

        if record.requires_recreation() {
            let payload = convert::expand_create(desired)?;
            deadline.check(Step::Locking)?;
            let _guard = self.locks.lock(&id).await;
            self.teardown(&id, desired.force_shutdown).await?;
            self.store.remove(&id);

            deadline.check(Step::Mutating)?;
            let created = self
                .client
                .create(&payload)
                .await
                .map_err(|e| ConvergeError::api(Step::Mutating, &id, e))?;
            self.wait_for_power(&created.id, Step::Polling, true).await?;
            return self.read_back(&created.id, desired).await;
        }

        // Expand before any remote call so a bad document cannot half-apply.
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
        let updated = self
            .client
            .update(&id, &payload)
            .await
            .map_err(|e| ConvergeError::api(Step::Mutating, &id, e))?;

        // Disk attachments are their own remote entities; reconcile them one
        // call at a time. A failure here leaves the primary update in place.
        deadline.check(Step::SubResourceSyncing)?;
        let attached: BTreeSet<ResourceId> = updated.disk_ids.iter().cloned().collect();
        for disk_id in attached.difference(&desired.disks) {
            self.client.detach_disk(&id, disk_id).await.map_err(|source| {
                ConvergeError::PartialSync {
                    sub_resource: "disk_detach",
                    id: id.clone(),
                    source,
                }
            })?;
        }
        for disk_id in desired.disks.difference(&attached) {
            self.client.attach_disk(&id, disk_id).await.map_err(|source| {
                ConvergeError::PartialSync {
                    sub_resource: "disk_attach",
                    id: id.clone(),
                    source,
                }
            })?;
        }

        if stopped {
            deadline.check(Step::Polling)?;
            self.client
                .boot(&id)
                .await
                .map_err(|e| ConvergeError::api(Step::Polling, &id, e))?;
            self.wait_for_power(&id, Step::Polling, true).await?;
        }

        deadline.check(Step::Reading)?;
        self.read_back(&id, desired).await
    }

    /// Deletes the remote server, stopping it first if it is running. A
    /// server that is already gone is success, not failure.
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
        info!(self.log, "deleted server"; "id" => %id);
        Ok(())
    }

    async fn create(
        &self,
        desired: &ServerSpec,
        deadline: &Deadline,
    ) -> Result<Outcome<ServerSpec>, ConvergeError> {
        let payload = convert::expand_create(desired)?;
        // No identifier exists yet; failures are reported against the name.
        let name_id = ResourceId::new(desired.name.clone());

        deadline.check(Step::Mutating)?;
        info!(self.log, "creating server"; "name" => %desired.name);
        let created = self
            .client
            .create(&payload)
            .await
            .map_err(|e| ConvergeError::api(Step::Mutating, &name_id, e))?;

        // The create boots the guest; wait for it to come up before trusting
        // the status fields of the read-back.
        self.wait_for_power(&created.id, Step::Polling, true).await?;

        deadline.check(Step::Reading)?;
        self.read_back(&created.id, desired).await
    }

    /// Fetches canonical state and flattens it into the refreshed document.
    /// A vanished object is dropped from the state store and reported as
    /// [`Outcome::Drop`] rather than treated as an error.
    async fn read_back(
        &self,
        id: &ResourceId,
        prior_desired: &ServerSpec,
    ) -> Result<Outcome<ServerSpec>, ConvergeError> {
        match self.client.read(id).await {
            Ok(api) => {
                let doc = convert::flatten(&api, Some(prior_desired));
                self.store.put(id.clone(), doc.clone());
                Ok(Outcome::Converged(doc))
            }
            Err(e) if e.is_not_found() => {
                info!(self.log, "server vanished; dropping from state"; "id" => %id);
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

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use cumulus_api_types::server::{
        ApiInterface, ApiServer, InterfaceRequest, ServerCreateRequest,
        ServerUpdateRequest,
    };
    use cumulus_api_types::{InstanceStatus, SwitchScope};

    use crate::client::ApiError;
    use crate::server::{NicSpec, Upstream};
    use crate::store::MemoryStore;
    use crate::value::FieldValue;

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, o!())
    }

    fn test_options() -> ConvergeOptions {
        ConvergeOptions {
            settle_delay: Duration::ZERO,
            poll_interval: Duration::from_millis(1),
            poll_attempts: 10,
            setup_retries: 3,
        }
    }

    fn build_interfaces(reqs: &[InterfaceRequest]) -> Vec<ApiInterface> {
        reqs.iter()
            .enumerate()
            .map(|(i, req)| {
                let mac = format!("9c:a3:ba:00:00:{i:02x}");
                match req {
                    InterfaceRequest::Shared { packet_filter_id } => ApiInterface {
                        switch_id: Some("shared-segment".into()),
                        switch_scope: Some(SwitchScope::Shared),
                        ip_address: format!("203.0.113.{}", i + 10),
                        user_ip_address: String::new(),
                        user_netmask_len: Some(24),
                        user_default_route: "203.0.113.1".into(),
                        subnet_network_address: "203.0.113.0".into(),
                        packet_filter_id: packet_filter_id.clone(),
                        mac_address: mac,
                    },
                    InterfaceRequest::Disconnected => ApiInterface {
                        switch_id: None,
                        switch_scope: None,
                        ip_address: String::new(),
                        user_ip_address: String::new(),
                        user_netmask_len: None,
                        user_default_route: String::new(),
                        subnet_network_address: String::new(),
                        packet_filter_id: None,
                        mac_address: mac,
                    },
                    InterfaceRequest::Switch {
                        switch_id,
                        packet_filter_id,
                        display_ip_address,
                    } => ApiInterface {
                        switch_id: Some(switch_id.clone()),
                        switch_scope: Some(SwitchScope::User),
                        ip_address: String::new(),
                        user_ip_address: display_ip_address.clone().unwrap_or_default(),
                        user_netmask_len: None,
                        user_default_route: String::new(),
                        subnet_network_address: String::new(),
                        packet_filter_id: packet_filter_id.clone(),
                        mac_address: mac,
                    },
                }
            })
            .collect()
    }

    struct MockServerClient {
        state: Mutex<Option<ApiServer>>,
        calls: Mutex<Vec<String>>,
        mutating: AtomicBool,
    }

    impl MockServerClient {
        fn new(initial: Option<ApiServer>) -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(initial),
                calls: Mutex::new(Vec::new()),
                mutating: AtomicBool::new(false),
            })
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        /// Asserts no two mutating calls ever overlap. The per-identifier
        /// lock is the only thing standing between concurrent runs and this
        /// panic.
        async fn enter_mutation(&self) {
            assert!(
                !self.mutating.swap(true, Ordering::SeqCst),
                "mutating call re-entered for the same identifier"
            );
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.mutating.store(false, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ServerClient for MockServerClient {
        async fn create(&self, req: &ServerCreateRequest) -> Result<ApiServer, ApiError> {
            self.record("create");
            self.enter_mutation().await;
            let server = ApiServer {
                id: "srv-100".into(),
                name: req.name.clone(),
                description: req.description.clone(),
                tags: req.tags.clone(),
                cpu: req.cpu,
                memory_mb: req.memory_mb,
                gpu: req.gpu,
                cpu_model: req
                    .cpu_model
                    .clone()
                    .unwrap_or_else(|| "amd_epyc_7713p".into()),
                commitment: req.commitment,
                interface_driver: req.interface_driver,
                instance_status: if req.boot_after_create {
                    InstanceStatus::Up
                } else {
                    InstanceStatus::Down
                },
                interfaces: build_interfaces(&req.interfaces),
                disk_ids: req.disk_ids.clone(),
                cdrom_id: req.cdrom_id.clone(),
                private_host_id: req.private_host_id.clone(),
                private_host_name: String::new(),
                hostname: req.name.clone(),
                dns_servers: vec!["198.51.100.1".into()],
            };
            *self.state.lock().unwrap() = Some(server.clone());
            Ok(server)
        }

        async fn read(&self, _id: &ResourceId) -> Result<ApiServer, ApiError> {
            self.record("read");
            self.state.lock().unwrap().clone().ok_or(ApiError::NotFound)
        }

        async fn update(
            &self,
            _id: &ResourceId,
            req: &ServerUpdateRequest,
        ) -> Result<ApiServer, ApiError> {
            self.record("update");
            self.enter_mutation().await;
            let mut state = self.state.lock().unwrap();
            let server = state.as_mut().ok_or(ApiError::NotFound)?;
            server.name = req.name.clone();
            server.description = req.description.clone();
            server.tags = req.tags.clone();
            server.cpu = req.cpu;
            server.memory_mb = req.memory_mb;
            server.gpu = req.gpu;
            server.commitment = req.commitment;
            server.interface_driver = req.interface_driver;
            server.interfaces = build_interfaces(&req.interfaces);
            server.cdrom_id = req.cdrom_id.clone();
            server.private_host_id = req.private_host_id.clone();
            Ok(server.clone())
        }

        async fn delete(&self, _id: &ResourceId) -> Result<(), ApiError> {
            self.record("delete");
            self.enter_mutation().await;
            *self.state.lock().unwrap() = None;
            Ok(())
        }

        async fn boot(&self, _id: &ResourceId) -> Result<(), ApiError> {
            self.record("boot");
            let mut state = self.state.lock().unwrap();
            let server = state.as_mut().ok_or(ApiError::NotFound)?;
            server.instance_status = InstanceStatus::Up;
            Ok(())
        }

        async fn shutdown(&self, _id: &ResourceId, _force: bool) -> Result<(), ApiError> {
            self.record("shutdown");
            let mut state = self.state.lock().unwrap();
            let server = state.as_mut().ok_or(ApiError::NotFound)?;
            server.instance_status = InstanceStatus::Down;
            Ok(())
        }

        async fn attach_disk(
            &self,
            _id: &ResourceId,
            disk_id: &ResourceId,
        ) -> Result<(), ApiError> {
            self.record("attach_disk");
            let mut state = self.state.lock().unwrap();
            let server = state.as_mut().ok_or(ApiError::NotFound)?;
            server.disk_ids.push(disk_id.clone());
            Ok(())
        }

        async fn detach_disk(
            &self,
            _id: &ResourceId,
            disk_id: &ResourceId,
        ) -> Result<(), ApiError> {
            self.record("detach_disk");
            let mut state = self.state.lock().unwrap();
            let server = state.as_mut().ok_or(ApiError::NotFound)?;
            server.disk_ids.retain(|d| d != disk_id);
            Ok(())
        }
    }

    fn driver(
        client: &Arc<MockServerClient>,
        store: &Arc<MemoryStore<ServerSpec>>,
    ) -> ServerDriver {
        ServerDriver::new(
            Arc::clone(client) as Arc<dyn ServerClient>,
            Arc::clone(store) as Arc<dyn StateStore<ServerSpec>>,
            Arc::new(LockTable::new()),
            test_options(),
            test_logger(),
        )
    }

    fn desired() -> ServerSpec {
        ServerSpec {
            name: "web-01".into(),
            core: FieldValue::Value(2),
            memory_gb: FieldValue::Value(4),
            network_interfaces: vec![NicSpec::new(Upstream::Shared)],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn first_convergence_creates_and_stores() {
        let client = MockServerClient::new(None);
        let store = Arc::new(MemoryStore::new());
        let driver = driver(&client, &store);

        let outcome =
            driver.converge(&desired(), &Deadline::none()).await.unwrap();
        let doc = match outcome {
            Outcome::Converged(doc) => doc,
            Outcome::Drop => panic!("create should not drop"),
        };
        assert_eq!(doc.id, FieldValue::Value("srv-100".into()));
        assert!(store.get(&"srv-100".into()).is_some());
        assert!(client.calls().contains(&"create".to_string()));
    }

    #[tokio::test]
    async fn second_run_is_idempotent() {
        let client = MockServerClient::new(None);
        let store = Arc::new(MemoryStore::new());
        let driver = driver(&client, &store);

        let first = match driver.converge(&desired(), &Deadline::none()).await.unwrap() {
            Outcome::Converged(doc) => doc,
            Outcome::Drop => panic!("unexpected drop"),
        };

        // Same document again, no external drift: nothing to change.
        let record = classify(store.get(&"srv-100".into()).as_ref(), &first);
        assert!(record.is_converged());

        let before = client.calls().len();
        driver.converge(&first, &Deadline::none()).await.unwrap();
        let after: Vec<_> = client.calls().split_off(before);
        assert_eq!(after, vec!["read".to_string()]);
    }

    #[tokio::test]
    async fn live_update_skips_disrupting() {
        let client = MockServerClient::new(None);
        let store = Arc::new(MemoryStore::new());
        let driver = driver(&client, &store);

        let mut doc = match driver.converge(&desired(), &Deadline::none()).await.unwrap() {
            Outcome::Converged(doc) => doc,
            Outcome::Drop => panic!("unexpected drop"),
        };
        doc.memory_gb = FieldValue::Value(8);

        let before = client.calls().len();
        driver.converge(&doc, &Deadline::none()).await.unwrap();
        let after: Vec<_> = client.calls().split_off(before);
        assert!(after.contains(&"update".to_string()));
        assert!(!after.contains(&"shutdown".to_string()));
        assert!(!after.contains(&"boot".to_string()));
    }

    #[tokio::test]
    async fn disruptive_update_stops_before_mutating_and_reboots() {
        let client = MockServerClient::new(None);
        let store = Arc::new(MemoryStore::new());
        let driver = driver(&client, &store);

        let mut doc = match driver.converge(&desired(), &Deadline::none()).await.unwrap() {
            Outcome::Converged(doc) => doc,
            Outcome::Drop => panic!("unexpected drop"),
        };
        doc.network_interfaces = vec![NicSpec::new(Upstream::Disconnect)];

        let before = client.calls().len();
        driver.converge(&doc, &Deadline::none()).await.unwrap();
        let after: Vec<_> = client.calls().split_off(before);

        let shutdown = after.iter().position(|c| c == "shutdown").unwrap();
        let update = after.iter().position(|c| c == "update").unwrap();
        let boot = after.iter().position(|c| c == "boot").unwrap();
        assert!(shutdown < update, "stop must precede the mutation");
        assert!(update < boot, "power returns only after the mutation");
    }

    #[tokio::test]
    async fn vanished_server_drops_from_state() {
        let client = MockServerClient::new(None);
        let store = Arc::new(MemoryStore::new());
        let driver = driver(&client, &store);

        let doc = match driver.converge(&desired(), &Deadline::none()).await.unwrap() {
            Outcome::Converged(doc) => doc,
            Outcome::Drop => panic!("unexpected drop"),
        };

        // Someone deleted the server out from under us.
        *client.state.lock().unwrap() = None;

        let outcome = driver.converge(&doc, &Deadline::none()).await.unwrap();
        assert_eq!(outcome, Outcome::Drop);
        assert!(store.get(&"srv-100".into()).is_none());
    }

    #[tokio::test]
    async fn disk_sync_failure_reports_the_sub_resource() {
        struct FailingAttach(Arc<MockServerClient>);

        // Delegate everything except attach_disk, which always fails.
        #[async_trait]
        impl ServerClient for FailingAttach {
            async fn create(&self, req: &ServerCreateRequest) -> Result<ApiServer, ApiError> {
                self.0.create(req).await
            }
            async fn read(&self, id: &ResourceId) -> Result<ApiServer, ApiError> {
                self.0.read(id).await
            }
            async fn update(
                &self,
                id: &ResourceId,
                req: &ServerUpdateRequest,
            ) -> Result<ApiServer, ApiError> {
                self.0.update(id, req).await
            }
            async fn delete(&self, id: &ResourceId) -> Result<(), ApiError> {
                self.0.delete(id).await
            }
            async fn boot(&self, id: &ResourceId) -> Result<(), ApiError> {
                self.0.boot(id).await
            }
            async fn shutdown(&self, id: &ResourceId, force: bool) -> Result<(), ApiError> {
                self.0.shutdown(id, force).await
            }
            async fn attach_disk(
                &self,
                _id: &ResourceId,
                _disk_id: &ResourceId,
            ) -> Result<(), ApiError> {
                Err(ApiError::Conflict)
            }
            async fn detach_disk(
                &self,
                id: &ResourceId,
                disk_id: &ResourceId,
            ) -> Result<(), ApiError> {
                self.0.detach_disk(id, disk_id).await
            }
        }

        let inner = MockServerClient::new(None);
        let client: Arc<dyn ServerClient> = Arc::new(FailingAttach(Arc::clone(&inner)));
        let store = Arc::new(MemoryStore::new());
        let driver = ServerDriver::new(
            client,
            Arc::clone(&store) as Arc<dyn StateStore<ServerSpec>>,
            Arc::new(LockTable::new()),
            test_options(),
            test_logger(),
        );

        let mut doc = match driver.converge(&desired(), &Deadline::none()).await.unwrap() {
            Outcome::Converged(doc) => doc,
            Outcome::Drop => panic!("unexpected drop"),
        };
        doc.disks.insert("disk-7".into());

        match driver.converge(&doc, &Deadline::none()).await {
            Err(ConvergeError::PartialSync { sub_resource, .. }) => {
                assert_eq!(sub_resource, "disk_attach");
            }
            other => panic!("expected PartialSync, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrent_runs_for_one_id_never_overlap() {
        let client = MockServerClient::new(None);
        let store = Arc::new(MemoryStore::new());
        let driver = Arc::new(driver(&client, &store));

        let doc = match driver.converge(&desired(), &Deadline::none()).await.unwrap() {
            Outcome::Converged(doc) => doc,
            Outcome::Drop => panic!("unexpected drop"),
        };

        // Two racing runs that both want a live mutation. The mock panics if
        // its mutating calls ever interleave.
        let mut a = doc.clone();
        a.memory_gb = FieldValue::Value(8);
        let mut b = doc.clone();
        b.memory_gb = FieldValue::Value(16);

        let run_a = {
            let driver = Arc::clone(&driver);
            tokio::spawn(async move { driver.converge(&a, &Deadline::none()).await })
        };
        let run_b = {
            let driver = Arc::clone(&driver);
            tokio::spawn(async move { driver.converge(&b, &Deadline::none()).await })
        };
        run_a.await.unwrap().unwrap();
        run_b.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn expired_deadline_cancels_and_releases_the_lock() {
        let client = MockServerClient::new(None);
        let store = Arc::new(MemoryStore::new());
        let driver = driver(&client, &store);

        let mut doc = match driver.converge(&desired(), &Deadline::none()).await.unwrap() {
            Outcome::Converged(doc) => doc,
            Outcome::Drop => panic!("unexpected drop"),
        };
        doc.memory_gb = FieldValue::Value(8);

        let expired = Deadline::after(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(2)).await;
        match driver.converge(&doc, &expired).await {
            Err(ConvergeError::Canceled { .. }) => {}
            other => panic!("expected Canceled, got {other:?}"),
        }

        // The lock must have been released; a fresh run completes.
        driver.converge(&doc, &Deadline::none()).await.unwrap();
    }

    #[tokio::test]
    async fn delete_stops_a_running_server_first() {
        let client = MockServerClient::new(None);
        let store = Arc::new(MemoryStore::new());
        let driver = driver(&client, &store);

        driver.converge(&desired(), &Deadline::none()).await.unwrap();

        let before = client.calls().len();
        driver.delete(&"srv-100".into(), false, &Deadline::none()).await.unwrap();
        let after: Vec<_> = client.calls().split_off(before);

        let shutdown = after.iter().position(|c| c == "shutdown").unwrap();
        let delete = after.iter().position(|c| c == "delete").unwrap();
        assert!(shutdown < delete);
        assert!(store.get(&"srv-100".into()).is_none());
    }

    #[tokio::test]
    async fn delete_of_a_vanished_server_is_success() {
        let client = MockServerClient::new(None);
        let store = Arc::new(MemoryStore::new());
        let driver = driver(&client, &store);

        driver.delete(&"srv-404".into(), false, &Deadline::none()).await.unwrap();
    }
}
