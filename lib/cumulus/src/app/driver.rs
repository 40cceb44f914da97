// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drives a managed application toward its desired document.
//!
//! The application body, its packet filter, and its traffic split are three
//! separately-addressed remote entities, so one convergence run issues up to
//! three mutations. On the update path every payload — including the traffic
//! split, which needs the freshly fetched version list — is expanded before
//! the first mutating call, so a bad version index aborts the run with
//! nothing changed remotely. Sub-resource failures after the primary patch
//! surface as partial-sync errors and leave the patch in place; the next
//! apply finishes the job.
//!
//! The control plane requires a one-time account-level user before any
//! application call; every entry point ensures it exists rather than making
//! operators provision it by hand.

use std::sync::Arc;

use slog::{info, o, Logger};

use cumulus_api_types::ResourceId;

use crate::client::AppClient;
use crate::converge::{ConvergeError, Deadline, Outcome, Step};
use crate::lock_table::LockTable;
use crate::store::StateStore;

use super::{classify, convert, AppSpec};

pub struct AppDriver {
    client: Arc<dyn AppClient>,
    store: Arc<dyn StateStore<AppSpec>>,
    locks: Arc<LockTable>,
    log: Logger,
}

impl AppDriver {
    pub fn new(
        client: Arc<dyn AppClient>,
        store: Arc<dyn StateStore<AppSpec>>,
        locks: Arc<LockTable>,
        log: Logger,
    ) -> Self {
        Self { client, store, locks, log: log.new(o!("driver" => "app")) }
    }

    pub async fn converge(
        &self,
        desired: &AppSpec,
        deadline: &Deadline,
    ) -> Result<Outcome<AppSpec>, ConvergeError> {
        let name_id = ResourceId::new(desired.name.clone());
        self.ensure_user(&name_id).await?;

        let Some(id) = desired.id.as_value().cloned() else {
            return self.create(desired, deadline).await;
        };

        let prior = self.store.get(&id);
        let record = classify(prior.as_ref(), desired);
        if record.is_converged() {
            return self.read_back(&id, desired).await;
        }
        info!(self.log, "converging app"; "id" => %id, "changes" => %record);

        if record.requires_recreation() {
            deadline.check(Step::Locking)?;
            let _guard = self.locks.lock(&id).await;
            match self.client.delete(&id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(ConvergeError::api(Step::Mutating, &id, e)),
            }
            self.store.remove(&id);
            return self.create(desired, deadline).await;
        }

        deadline.check(Step::Locking)?;
        let _guard = self.locks.lock(&id).await;

        // Fetch the version list and expand every payload up front. The
        // traffic split's index check happens here, before anything mutates.
        let versions = self
            .client
            .list_versions(&id)
            .await
            .map_err(|e| ConvergeError::api(Step::Planning, &id, e))?;
        let payload = convert::expand_update(desired)?;
        let traffics = convert::expand_traffics(&desired.traffics, &versions)?;
        let packet_filter = convert::expand_packet_filter(desired);

        deadline.check(Step::Mutating)?;
        self.client
            .update(&id, &payload)
            .await
            .map_err(|e| ConvergeError::api(Step::Mutating, &id, e))?;

        deadline.check(Step::SubResourceSyncing)?;
        self.client
            .update_packet_filter(&id, &packet_filter)
            .await
            .map_err(|source| ConvergeError::PartialSync {
                sub_resource: "packet_filter",
                id: id.clone(),
                source,
            })?;
        self.client
            .update_traffics(&id, &traffics)
            .await
            .map_err(|source| ConvergeError::PartialSync {
                sub_resource: "traffic",
                id: id.clone(),
                source,
            })?;

        deadline.check(Step::Reading)?;
        self.read_back(&id, desired).await
    }

    pub async fn delete(
        &self,
        id: &ResourceId,
        deadline: &Deadline,
    ) -> Result<(), ConvergeError> {
        self.ensure_user(id).await?;
        deadline.check(Step::Locking)?;
        let _guard = self.locks.lock(id).await;
        match self.client.delete(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(ConvergeError::api(Step::Mutating, id, e)),
        }
        self.store.remove(id);
        info!(self.log, "deleted app"; "id" => %id);
        Ok(())
    }

    /// The account's application user exists exactly once; provision it on
    /// first contact instead of failing every call until someone does it out
    /// of band.
    async fn ensure_user(&self, id: &ResourceId) -> Result<(), ConvergeError> {
        match self.client.read_user().await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => self
                .client
                .create_user()
                .await
                .map_err(|e| ConvergeError::api(Step::Planning, id, e)),
            Err(e) => Err(ConvergeError::api(Step::Planning, id, e)),
        }
    }

    async fn create(
        &self,
        desired: &AppSpec,
        deadline: &Deadline,
    ) -> Result<Outcome<AppSpec>, ConvergeError> {
        let payload = convert::expand_create(desired)?;
        let packet_filter = convert::expand_packet_filter(desired);
        let name_id = ResourceId::new(desired.name.clone());

        deadline.check(Step::Mutating)?;
        info!(self.log, "creating app"; "name" => %desired.name);
        let created = self
            .client
            .create(&payload)
            .await
            .map_err(|e| ConvergeError::api(Step::Mutating, &name_id, e))?;
        let id = created.id.clone();

        // The first version only exists now; the traffic split can only be
        // resolved (and validated) after the primary create.
        deadline.check(Step::SubResourceSyncing)?;
        let versions = self
            .client
            .list_versions(&id)
            .await
            .map_err(|e| ConvergeError::api(Step::SubResourceSyncing, &id, e))?;
        let traffics = convert::expand_traffics(&desired.traffics, &versions)?;

        self.client
            .update_packet_filter(&id, &packet_filter)
            .await
            .map_err(|source| ConvergeError::PartialSync {
                sub_resource: "packet_filter",
                id: id.clone(),
                source,
            })?;
        self.client
            .update_traffics(&id, &traffics)
            .await
            .map_err(|source| ConvergeError::PartialSync {
                sub_resource: "traffic",
                id: id.clone(),
                source,
            })?;

        deadline.check(Step::Reading)?;
        self.read_back(&id, desired).await
    }

    async fn read_back(
        &self,
        id: &ResourceId,
        prior_desired: &AppSpec,
    ) -> Result<Outcome<AppSpec>, ConvergeError> {
        let api = match self.client.read(id).await {
            Ok(api) => api,
            Err(e) if e.is_not_found() => {
                info!(self.log, "app vanished; dropping from state"; "id" => %id);
                self.store.remove(id);
                return Ok(Outcome::Drop);
            }
            Err(e) => return Err(ConvergeError::api(Step::Reading, id, e)),
        };
        let versions = self
            .client
            .list_versions(id)
            .await
            .map_err(|e| ConvergeError::api(Step::Reading, id, e))?;
        let traffics = self
            .client
            .list_traffics(id)
            .await
            .map_err(|e| ConvergeError::api(Step::Reading, id, e))?;
        let packet_filter = self
            .client
            .read_packet_filter(id)
            .await
            .map_err(|e| ConvergeError::api(Step::Reading, id, e))?;

        let doc = convert::flatten(&api, &versions, &traffics, &packet_filter, Some(prior_desired));
        self.store.put(id.clone(), doc.clone());
        Ok(Outcome::Converged(doc))
    }
}
