// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client traits for the cloud control plane.
//!
//! The engine never talks HTTP itself; it consumes these traits and leaves
//! transport, auth, and retries-below-the-API-contract to the
//! implementation. Implementations must be safe for concurrent use across
//! different resource identifiers; the engine serializes calls for any one
//! identifier itself.

use async_trait::async_trait;
use thiserror::Error;

use cumulus_api_types::{
    app::{
        ApiApplication, ApiPacketFilter, ApiTraffic, ApiVersion,
        AppCreateRequest, AppUpdateRequest,
    },
    disk::{ApiDisk, DiskCreateRequest, DiskUpdateRequest},
    server::{ApiServer, ServerCreateRequest, ServerUpdateRequest},
    vpn_router::{ApiVpnRouter, VpnRouterCreateRequest, VpnRouterUpdateRequest},
    ResourceId,
};

/// Errors a control-plane call can produce. The engine maps these onto
/// convergence outcomes; it never swallows one.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The object does not exist (or no longer exists).
    #[error("resource not found")]
    NotFound,

    /// Another in-flight mutation holds the object remotely. Under correct
    /// per-identifier locking this should not be observed; if it is, it
    /// indicates a locking bug somewhere and is surfaced as-is.
    #[error("resource is busy with another operation")]
    Conflict,

    /// The control plane rejected the request as malformed. A caller
    /// configuration error; retrying without changing the request is useless.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Network-level failure. Eligible for retry where the engine says so.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }
}

#[async_trait]
pub trait ServerClient: Send + Sync {
    async fn create(&self, req: &ServerCreateRequest) -> Result<ApiServer, ApiError>;
    async fn read(&self, id: &ResourceId) -> Result<ApiServer, ApiError>;
    async fn update(
        &self,
        id: &ResourceId,
        req: &ServerUpdateRequest,
    ) -> Result<ApiServer, ApiError>;
    async fn delete(&self, id: &ResourceId) -> Result<(), ApiError>;

    /// Powers the server on. A no-op if it is already running.
    async fn boot(&self, id: &ResourceId) -> Result<(), ApiError>;

    /// Requests shutdown; `force` cuts power instead of signaling the guest.
    /// Completion is observed by polling [`ServerClient::read`].
    async fn shutdown(&self, id: &ResourceId, force: bool) -> Result<(), ApiError>;

    async fn attach_disk(
        &self,
        id: &ResourceId,
        disk_id: &ResourceId,
    ) -> Result<(), ApiError>;
    async fn detach_disk(
        &self,
        id: &ResourceId,
        disk_id: &ResourceId,
    ) -> Result<(), ApiError>;
}

#[async_trait]
pub trait DiskClient: Send + Sync {
    async fn create(&self, req: &DiskCreateRequest) -> Result<ApiDisk, ApiError>;
    async fn read(&self, id: &ResourceId) -> Result<ApiDisk, ApiError>;
    async fn update(
        &self,
        id: &ResourceId,
        req: &DiskUpdateRequest,
    ) -> Result<ApiDisk, ApiError>;
    async fn delete(&self, id: &ResourceId) -> Result<(), ApiError>;

    async fn attach(
        &self,
        id: &ResourceId,
        server_id: &ResourceId,
    ) -> Result<(), ApiError>;
    async fn detach(&self, id: &ResourceId) -> Result<(), ApiError>;
}

#[async_trait]
pub trait VpnRouterClient: Send + Sync {
    async fn create(
        &self,
        req: &VpnRouterCreateRequest,
    ) -> Result<ApiVpnRouter, ApiError>;
    async fn read(&self, id: &ResourceId) -> Result<ApiVpnRouter, ApiError>;
    async fn update(
        &self,
        id: &ResourceId,
        req: &VpnRouterUpdateRequest,
    ) -> Result<ApiVpnRouter, ApiError>;
    async fn delete(&self, id: &ResourceId) -> Result<(), ApiError>;
    async fn boot(&self, id: &ResourceId) -> Result<(), ApiError>;
    async fn shutdown(&self, id: &ResourceId, force: bool) -> Result<(), ApiError>;
}

#[async_trait]
pub trait AppClient: Send + Sync {
    /// Reads the account-level application user. `NotFound` means it has
    /// never been provisioned for this account.
    async fn read_user(&self) -> Result<(), ApiError>;
    async fn create_user(&self) -> Result<(), ApiError>;

    async fn create(&self, req: &AppCreateRequest) -> Result<ApiApplication, ApiError>;
    async fn read(&self, id: &ResourceId) -> Result<ApiApplication, ApiError>;
    async fn update(
        &self,
        id: &ResourceId,
        req: &AppUpdateRequest,
    ) -> Result<ApiApplication, ApiError>;
    async fn delete(&self, id: &ResourceId) -> Result<(), ApiError>;

    /// The full version history, newest first. Implementations page through
    /// the control plane's listing; callers always see the complete list.
    async fn list_versions(&self, id: &ResourceId) -> Result<Vec<ApiVersion>, ApiError>;

    async fn list_traffics(&self, id: &ResourceId) -> Result<Vec<ApiTraffic>, ApiError>;
    async fn update_traffics(
        &self,
        id: &ResourceId,
        traffics: &[ApiTraffic],
    ) -> Result<(), ApiError>;

    async fn read_packet_filter(
        &self,
        id: &ResourceId,
    ) -> Result<ApiPacketFilter, ApiError>;
    async fn update_packet_filter(
        &self,
        id: &ResourceId,
        filter: &ApiPacketFilter,
    ) -> Result<(), ApiError>;
}
