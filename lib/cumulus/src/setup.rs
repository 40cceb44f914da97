// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Retryable creation for resources whose provisioning can fail in flight.
//!
//! Creating a disk from a source archive kicks off a server-side copy that
//! occasionally fails partway through, leaving a half-provisioned object
//! behind. The runner here retries creation a bounded number of times,
//! deleting the partial object between attempts so each retry starts clean.
//! Cleanup is deliberately an explicit loop with its own accumulator rather
//! than unwinding: a failed delete is logged and the original failure is the
//! one reported.

use std::future::Future;
use std::time::Duration;

use slog::{info, warn, Logger};
use thiserror::Error;

use cumulus_api_types::{disk::ApiDisk, Availability, ResourceId};

use crate::client::ApiError;

/// An object the runner can provision: it has an identifier once created and
/// reports whether its asynchronous provisioning has settled.
pub trait Provisioned {
    fn id(&self) -> &ResourceId;
    fn availability(&self) -> Availability;
}

impl Provisioned for ApiDisk {
    fn id(&self) -> &ResourceId {
        &self.id
    }

    fn availability(&self) -> Availability {
        self.availability
    }
}

#[derive(Clone, Debug)]
pub struct SetupOptions {
    /// Total creation attempts before giving up.
    pub max_retries: u32,
    /// Poll the object after creation until its availability settles.
    pub wait_for_copy: bool,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            wait_for_copy: true,
            poll_interval: Duration::from_secs(3),
            poll_attempts: 100,
        }
    }
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("create failed on attempt {attempt}: {source}")]
    CreateFailed {
        attempt: u32,
        #[source]
        source: ApiError,
    },

    #[error("provisioning of {id} failed during copy")]
    CopyFailed { id: ResourceId },

    #[error("provisioning of {id} did not settle after {attempts} polls")]
    CopyTimedOut { id: ResourceId, attempts: u32 },

    #[error("reading {id} while waiting for provisioning failed: {source}")]
    ReadFailed {
        id: ResourceId,
        #[source]
        source: ApiError,
    },
}

pub struct RetryableSetup<C, R, D> {
    create: C,
    read: R,
    delete: D,
    options: SetupOptions,
    log: Logger,
}

impl<T, C, CFut, R, RFut, D, DFut> RetryableSetup<C, R, D>
where
    T: Provisioned,
    C: Fn() -> CFut,
    CFut: Future<Output = Result<T, ApiError>>,
    R: Fn(ResourceId) -> RFut,
    RFut: Future<Output = Result<T, ApiError>>,
    D: Fn(ResourceId) -> DFut,
    DFut: Future<Output = Result<(), ApiError>>,
{
    pub fn new(create: C, read: R, delete: D, options: SetupOptions, log: Logger) -> Self {
        Self { create, read, delete, options, log }
    }

    /// Runs creation to completion or exhaustion, returning the settled
    /// object or the failure from the final attempt.
    pub async fn run(&self) -> Result<T, SetupError> {
        let attempts = self.options.max_retries.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            match (self.create)().await {
                Ok(created) => {
                    if !self.options.wait_for_copy {
                        return Ok(created);
                    }
                    let id = created.id().clone();
                    match self.wait_for_copy(id.clone()).await {
                        Ok(settled) => return Ok(settled),
                        Err(err) => {
                            info!(self.log, "provisioning attempt failed";
                                  "id" => %id,
                                  "attempt" => attempt,
                                  "error" => %err);
                            // A partial object exists; remove it so the next
                            // attempt starts from nothing.
                            self.cleanup(&id).await;
                            last_err = Some(err);
                        }
                    }
                }
                Err(err) => {
                    info!(self.log, "create attempt failed";
                          "attempt" => attempt,
                          "error" => %err);
                    last_err = Some(SetupError::CreateFailed { attempt, source: err });
                }
            }
        }

        // attempts >= 1, so at least one failure was recorded.
        Err(last_err.expect("setup loop records an error before exhausting"))
    }

    async fn wait_for_copy(&self, id: ResourceId) -> Result<T, SetupError> {
        for _ in 0..self.options.poll_attempts {
            let current = (self.read)(id.clone())
                .await
                .map_err(|source| SetupError::ReadFailed { id: id.clone(), source })?;
            match current.availability() {
                Availability::Available => return Ok(current),
                Availability::Failed => {
                    return Err(SetupError::CopyFailed { id });
                }
                Availability::Migrating => {
                    tokio::time::sleep(self.options.poll_interval).await;
                }
            }
        }
        Err(SetupError::CopyTimedOut { id, attempts: self.options.poll_attempts })
    }

    /// Best-effort removal of a partial object. A delete failure is logged
    /// and otherwise ignored so it never masks the provisioning failure.
    async fn cleanup(&self, id: &ResourceId) {
        if let Err(err) = (self.delete)(id.clone()).await {
            warn!(self.log, "cleanup of partial object failed";
                  "id" => %id,
                  "error" => %err);
        }
    }
}
