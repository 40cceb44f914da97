// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scaffolding shared by the per-kind convergence drivers.
//!
//! A convergence run moves through a fixed sequence of steps; every failure
//! is tagged with the step it happened in and the identifier it was acting
//! on, so an operator reading one error line knows which object broke and
//! how far the run got. There is no rollback machinery here: when a step
//! fails after the primary mutation, the object is left partially converged
//! and the next apply picks it up again.

use std::time::{Duration, Instant};

use thiserror::Error;

use cumulus_api_types::ResourceId;

use crate::client::ApiError;
use crate::convert::ExpandError;
use crate::setup::SetupError;

/// The phases of a convergence run, in execution order. `Disrupting` is
/// skipped when the change record allows a live apply; `Polling` is skipped
/// for kinds whose status is synchronous.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    Planning,
    Locking,
    Disrupting,
    Mutating,
    SubResourceSyncing,
    Polling,
    Reading,
    Flattening,
}

/// What a convergence run produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<D> {
    /// The remote object now matches; here is the refreshed document.
    Converged(D),
    /// The remote object no longer exists. The driver has already removed it
    /// from the state store; the caller should stop tracking it.
    Drop,
}

#[derive(Debug, Error)]
pub enum ConvergeError {
    /// A remote call failed. `id` names the object, or the declared name
    /// when the object had not been assigned an identifier yet.
    #[error("{step} failed for {id}: {source}")]
    Api {
        step: Step,
        id: ResourceId,
        #[source]
        source: ApiError,
    },

    /// The desired document could not be expanded. A caller configuration
    /// error, surfaced verbatim and never retried.
    #[error(transparent)]
    Validation(#[from] ExpandError),

    /// The primary mutation succeeded but a dependent sub-resource call did
    /// not. The primary change is NOT rolled back; re-applying converges the
    /// remainder.
    #[error(
        "syncing {sub_resource} failed for {id} \
         (the primary change is not rolled back): {source}"
    )]
    PartialSync {
        sub_resource: &'static str,
        id: ResourceId,
        #[source]
        source: ApiError,
    },

    /// Retryable creation gave up.
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// The object's status did not settle within the polling budget.
    #[error("{step} timed out waiting for {id} to settle")]
    Timeout { step: Step, id: ResourceId },

    /// The caller's deadline expired between remote calls.
    #[error("deadline expired before {step}")]
    Canceled { step: Step },
}

impl ConvergeError {
    pub(crate) fn api(step: Step, id: &ResourceId, source: ApiError) -> Self {
        ConvergeError::Api { step, id: id.clone(), source }
    }
}

/// A caller-supplied cancellation point. Runs check it between remote calls;
/// an in-flight call is never interrupted.
#[derive(Clone, Copy, Debug)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Deadline(None)
    }

    pub fn after(timeout: Duration) -> Self {
        Deadline(Some(Instant::now() + timeout))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.0, Some(at) if Instant::now() >= at)
    }

    pub(crate) fn check(&self, step: Step) -> Result<(), ConvergeError> {
        if self.is_expired() {
            Err(ConvergeError::Canceled { step })
        } else {
            Ok(())
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Deadline::none()
    }
}

/// Tuning for a driver's waits and retries.
#[derive(Clone, Debug)]
pub struct ConvergeOptions {
    /// Unconditional delay between the primary mutation and the first
    /// read-back, for kinds whose status API reports nothing right after a
    /// boot.
    pub settle_delay: Duration,
    /// Interval and bound for power-state polls.
    pub poll_interval: Duration,
    pub poll_attempts: u32,
    /// Creation attempts for kinds provisioned through the setup runner.
    pub setup_retries: u32,
}

impl Default for ConvergeOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(10),
            poll_interval: Duration::from_secs(3),
            poll_attempts: 100,
            setup_retries: 3,
        }
    }
}
