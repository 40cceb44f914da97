// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drives a disk toward its desired document.
//!
//! Creation goes through the retryable setup runner because a disk copied
//! from a source archive can fail mid-copy and leave a partial object.
//! Recreation (plan/size/source changes) tears the old disk down under the
//! same lock before provisioning the replacement. Attachment moves need the
//! owning server powered off, which is this driver's only disruption.

use std::sync::Arc;

use slog::{info, o, Logger};

use cumulus_api_types::{disk::DiskCreateRequest, ResourceId};

use crate::client::{DiskClient, ServerClient};
use crate::converge::{ConvergeError, ConvergeOptions, Deadline, Outcome, Step};
use crate::lock_table::LockTable;
use crate::setup::{RetryableSetup, SetupOptions};
use crate::store::StateStore;

use super::{classify, convert, DiskSpec};

pub struct DiskDriver {
    disks: Arc<dyn DiskClient>,
    servers: Arc<dyn ServerClient>,
    store: Arc<dyn StateStore<DiskSpec>>,
    locks: Arc<LockTable>,
    opts: ConvergeOptions,
    log: Logger,
}

impl DiskDriver {
    pub fn new(
        disks: Arc<dyn DiskClient>,
        servers: Arc<dyn ServerClient>,
        store: Arc<dyn StateStore<DiskSpec>>,
        locks: Arc<LockTable>,
        opts: ConvergeOptions,
        log: Logger,
    ) -> Self {
        Self { disks, servers, store, locks, opts, log: log.new(o!("driver" => "disk")) }
    }

    pub async fn converge(
        &self,
        desired: &DiskSpec,
        deadline: &Deadline,
    ) -> Result<Outcome<DiskSpec>, ConvergeError> {
        let Some(id) = desired.id.as_value().cloned() else {
            let req = convert::expand_create(desired)?;
            deadline.check(Step::Mutating)?;
            info!(self.log, "creating disk"; "name" => %desired.name);
            let new_id = self.run_setup(&req).await?;
            return self.read_back(&new_id, desired).await;
        };

        let prior = self.store.get(&id);
        let record = classify(prior.as_ref(), desired);
        if record.is_converged() {
            return self.read_back(&id, desired).await;
        }
        info!(self.log, "converging disk"; "id" => %id, "changes" => %record);

        if record.requires_recreation() {
            // Validate the replacement before destroying anything.
            let req = convert::expand_create(desired)?;
            deadline.check(Step::Locking)?;
            let _guard = self.locks.lock(&id).await;
            self.teardown(&id).await?;
            self.store.remove(&id);

            deadline.check(Step::Mutating)?;
            let new_id = self.run_setup(&req).await?;
            return self.read_back(&new_id, desired).await;
        }

        let payload = convert::expand_update(desired)?;
        deadline.check(Step::Locking)?;
        let _guard = self.locks.lock(&id).await;

        let current = match self.disks.read(&id).await {
            Ok(current) => current,
            Err(e) if e.is_not_found() => {
                self.store.remove(&id);
                return Ok(Outcome::Drop);
            }
            Err(e) => return Err(ConvergeError::api(Step::Disrupting, &id, e)),
        };

        // An attachment move needs the current owner powered off first.
        let desired_server = desired.server_id.request_value();
        if record.requires_disruption() && current.server_id != desired_server {
            if let Some(owner) = &current.server_id {
                deadline.check(Step::Disrupting)?;
                self.stop_server_if_up(owner).await?;
            }
        }

        deadline.check(Step::Mutating)?;
        self.disks
            .update(&id, &payload)
            .await
            .map_err(|e| ConvergeError::api(Step::Mutating, &id, e))?;

        deadline.check(Step::SubResourceSyncing)?;
        if current.server_id != desired_server {
            if current.server_id.is_some() {
                self.disks.detach(&id).await.map_err(|source| {
                    ConvergeError::PartialSync {
                        sub_resource: "detach",
                        id: id.clone(),
                        source,
                    }
                })?;
            }
            if let Some(server_id) = &desired_server {
                self.disks.attach(&id, server_id).await.map_err(|source| {
                    ConvergeError::PartialSync {
                        sub_resource: "attach",
                        id: id.clone(),
                        source,
                    }
                })?;
            }
        }

        deadline.check(Step::Reading)?;
        self.read_back(&id, desired).await
    }

    /// Deletes the disk, detaching it from its server first (stopping that
    /// server if it is running). A disk that is already gone is success.
    pub async fn delete(
        &self,
        id: &ResourceId,
        deadline: &Deadline,
    ) -> Result<(), ConvergeError> {
        deadline.check(Step::Locking)?;
        let _guard = self.locks.lock(id).await;
        self.teardown(id).await?;
        self.store.remove(id);
        Ok(())
    }

    async fn teardown(&self, id: &ResourceId) -> Result<(), ConvergeError> {
        let current = match self.disks.read(id).await {
            Ok(current) => current,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(ConvergeError::api(Step::Reading, id, e)),
        };

        if let Some(owner) = &current.server_id {
            self.stop_server_if_up(owner).await?;
            self.disks
                .detach(id)
                .await
                .map_err(|e| ConvergeError::api(Step::Disrupting, id, e))?;
        }

        self.disks
            .delete(id)
            .await
            .map_err(|e| ConvergeError::api(Step::Mutating, id, e))?;
        info!(self.log, "deleted disk"; "id" => %id);
        Ok(())
    }

    async fn stop_server_if_up(&self, server_id: &ResourceId) -> Result<(), ConvergeError> {
        let server = self
            .servers
            .read(server_id)
            .await
            .map_err(|e| ConvergeError::api(Step::Disrupting, server_id, e))?;
        if !server.instance_status.is_up() {
            return Ok(());
        }

        // Forced stop: the disk operation cannot proceed with the guest up,
        // and the guest gets no say in its disk being moved.
        self.servers
            .shutdown(server_id, true)
            .await
            .map_err(|e| ConvergeError::api(Step::Disrupting, server_id, e))?;
        for _ in 0..self.opts.poll_attempts {
            let server = self
                .servers
                .read(server_id)
                .await
                .map_err(|e| ConvergeError::api(Step::Disrupting, server_id, e))?;
            if server.instance_status.is_down() {
                return Ok(());
            }
            tokio::time::sleep(self.opts.poll_interval).await;
        }
        Err(ConvergeError::Timeout { step: Step::Disrupting, id: server_id.clone() })
    }

    async fn run_setup(&self, req: &DiskCreateRequest) -> Result<ResourceId, ConvergeError> {
        let create = {
            let disks = Arc::clone(&self.disks);
            let req = req.clone();
            move || {
                let disks = Arc::clone(&disks);
                let req = req.clone();
                async move { disks.create(&req).await }
            }
        };
        let read = {
            let disks = Arc::clone(&self.disks);
            move |id: ResourceId| {
                let disks = Arc::clone(&disks);
                async move { disks.read(&id).await }
            }
        };
        let delete = {
            let disks = Arc::clone(&self.disks);
            move |id: ResourceId| {
                let disks = Arc::clone(&disks);
                async move { disks.delete(&id).await }
            }
        };

        let setup = RetryableSetup::new(
            create,
            read,
            delete,
            SetupOptions {
                max_retries: self.opts.setup_retries,
                wait_for_copy: true,
                poll_interval: self.opts.poll_interval,
                poll_attempts: self.opts.poll_attempts,
            },
            self.log.clone(),
        );
        let disk = setup.run().await?;
        Ok(disk.id)
    }

    async fn read_back(
        &self,
        id: &ResourceId,
        prior_desired: &DiskSpec,
    ) -> Result<Outcome<DiskSpec>, ConvergeError> {
        match self.disks.read(id).await {
            Ok(api) => {
                let doc = convert::flatten(&api, Some(prior_desired));
                self.store.put(id.clone(), doc.clone());
                Ok(Outcome::Converged(doc))
            }
            Err(e) if e.is_not_found() => {
                info!(self.log, "disk vanished; dropping from state"; "id" => %id);
                self.store.remove(id);
                Ok(Outcome::Drop)
            }
            Err(e) => Err(ConvergeError::api(Step::Reading, id, e)),
        }
    }
}
