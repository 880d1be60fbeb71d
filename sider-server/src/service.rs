use crate::auth::caller;
use sider_core::{SnapshotError, Store, StoreError};
use sider_proto::sider_server::Sider;
use sider_proto::{
    DeleteExpiredRequest, DeleteExpiredResponse, FlushRequest, FlushResponse, GetRequest,
    GetResponse, KeysRequest, KeysResponse, RemoveRequest, RemoveResponse, SetRequest,
    SetResponse, SnapshotRequest, SnapshotResponse, TtlRequest, TtlResponse, UpdateRequest,
    UpdateResponse,
};
use std::path::PathBuf;
use tonic::{Request, Response, Status};

/// Truncates a key for safe logging (prevents leaking sensitive key data)
fn truncate_key_for_log(key: &str) -> String {
    const MAX_LOG_LEN: usize = 16;
    match key.char_indices().nth(MAX_LOG_LEN) {
        Some((idx, _)) => format!("{}...", &key[..idx]),
        None => key.to_string(),
    }
}

fn store_status(err: StoreError) -> Status {
    match err {
        StoreError::NotFound(_) => Status::not_found("key doesn't exist"),
    }
}

fn snapshot_status(err: SnapshotError) -> Status {
    tracing::error!("Snapshot failed: {}", err);
    Status::internal(err.to_string())
}

/// The gRPC service implementation
///
/// Requests reach this service only after the
/// [`Authenticator`](crate::auth::Authenticator) has accepted them.
pub struct SiderService {
    store: Store,
    snapshot_path: Option<PathBuf>,
}

impl SiderService {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            snapshot_path: None,
        }
    }

    /// Sets the file written by the `Snapshot` call
    pub fn with_snapshot_path(mut self, path: Option<PathBuf>) -> Self {
        self.snapshot_path = path;
        self
    }
}

#[tonic::async_trait]
impl Sider for SiderService {
    async fn set(&self, request: Request<SetRequest>) -> Result<Response<SetResponse>, Status> {
        let client = caller(&request).to_string();
        let req = request.into_inner();
        tracing::debug!(%client, "SET {} (expires: {})", truncate_key_for_log(&req.key), req.expires);

        self.store.set(req.key, req.value, req.expires);
        Ok(Response::new(SetResponse {}))
    }

    async fn get(&self, request: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        let key = &request.get_ref().key;
        tracing::debug!(client = %caller(&request), "GET {}", truncate_key_for_log(key));

        let (value, expires) = self.store.get(key).map_err(store_status)?.into_parts();
        Ok(Response::new(GetResponse { value, expires }))
    }

    async fn update(
        &self,
        request: Request<UpdateRequest>,
    ) -> Result<Response<UpdateResponse>, Status> {
        let client = caller(&request).to_string();
        let req = request.into_inner();
        tracing::debug!(%client, "UPDATE {}", truncate_key_for_log(&req.key));

        self.store.update(&req.key, req.value).map_err(store_status)?;
        Ok(Response::new(UpdateResponse {}))
    }

    async fn remove(
        &self,
        request: Request<RemoveRequest>,
    ) -> Result<Response<RemoveResponse>, Status> {
        let key = &request.get_ref().key;
        tracing::debug!(client = %caller(&request), "REMOVE {}", truncate_key_for_log(key));

        // Removing an absent key is not an error
        let _ = self.store.remove(key);
        Ok(Response::new(RemoveResponse {}))
    }

    async fn keys(&self, request: Request<KeysRequest>) -> Result<Response<KeysResponse>, Status> {
        let pattern = &request.get_ref().pattern;
        tracing::debug!(client = %caller(&request), "KEYS {}", truncate_key_for_log(pattern));

        let keys = self.store.keys(pattern);
        Ok(Response::new(KeysResponse { keys }))
    }

    async fn ttl(&self, request: Request<TtlRequest>) -> Result<Response<TtlResponse>, Status> {
        let key = &request.get_ref().key;
        tracing::debug!(client = %caller(&request), "TTL {}", truncate_key_for_log(key));

        let time = self.store.ttl(key);
        Ok(Response::new(TtlResponse { time }))
    }

    async fn flush(
        &self,
        request: Request<FlushRequest>,
    ) -> Result<Response<FlushResponse>, Status> {
        let removed = self.store.flush() as u64;
        tracing::info!(client = %caller(&request), removed, "FLUSH");

        Ok(Response::new(FlushResponse { removed }))
    }

    async fn delete_expired(
        &self,
        request: Request<DeleteExpiredRequest>,
    ) -> Result<Response<DeleteExpiredResponse>, Status> {
        let removed = self.store.delete_expired() as u64;
        tracing::debug!(client = %caller(&request), removed, "DELETE_EXPIRED");

        Ok(Response::new(DeleteExpiredResponse { removed }))
    }

    async fn snapshot(
        &self,
        request: Request<SnapshotRequest>,
    ) -> Result<Response<SnapshotResponse>, Status> {
        let Some(path) = self.snapshot_path.clone() else {
            return Err(Status::failed_precondition("No snapshot path configured"));
        };
        tracing::info!(client = %caller(&request), path = %path.display(), "SNAPSHOT");

        let store = self.store.clone();
        let target = path.clone();
        let entries = tokio::task::spawn_blocking(move || store.save_to(&target))
            .await
            .map_err(|e| Status::internal(format!("Snapshot task failed: {}", e)))?
            .map_err(snapshot_status)?;

        Ok(Response::new(SnapshotResponse {
            path: path.display().to_string(),
            entries: entries as u64,
        }))
    }
}
