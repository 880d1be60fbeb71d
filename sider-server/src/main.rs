mod auth;
mod config;
mod gateway;
mod service;

use anyhow::Context;
use auth::Authenticator;
use config::ServerConfig;
use service::SiderService;
use sider_core::{Store, Sweeper, SweeperConfig};
use sider_proto::sider_client::SiderClient;
use sider_proto::sider_server::SiderServer;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinError;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Channel, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Restores the store from the snapshot file, falling back to an empty store
fn open_store(snapshot_path: Option<&Path>) -> Store {
    let Some(path) = snapshot_path else {
        return Store::new();
    };
    if !path.exists() {
        tracing::info!("No snapshot at {}, starting with an empty store", path.display());
        return Store::new();
    }

    match Store::load_from(path) {
        Ok(store) => {
            tracing::info!("Restored {} entries from {}", store.len(), path.display());
            store
        }
        Err(e) => {
            tracing::warn!("Failed to load snapshot ({}), starting with an empty store", e);
            Store::new()
        }
    }
}

/// Binds both listeners so an unusable address fails start-up instead of a background task
async fn bind_listeners(
    grpc_addr: SocketAddr,
    rest_addr: SocketAddr,
) -> anyhow::Result<(TcpListener, TcpListener)> {
    let grpc = TcpListener::bind(grpc_addr)
        .await
        .with_context(|| format!("failed to bind gRPC listener on {}", grpc_addr))?;
    let rest = TcpListener::bind(rest_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", rest_addr))?;
    Ok((grpc, rest))
}

/// Turns the early exit of a listener task into an error
fn listener_failure(name: &str, result: Result<anyhow::Result<()>, JoinError>) -> anyhow::Error {
    let err = match result {
        Ok(Ok(())) => anyhow::anyhow!("{} stopped unexpectedly", name),
        Ok(Err(e)) => e.context(format!("{} failed", name)),
        Err(e) => anyhow::Error::new(e).context(format!("{} task panicked", name)),
    };
    tracing::error!("{:#}", err);
    err
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    loop {
        let stop = *rx.borrow();
        if stop || rx.changed().await.is_err() {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sider_server=info,sider_core=info,tonic=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    let store = open_store(config.snapshot_path.as_deref());

    let sweeper = if config.sweep_interval.is_zero() {
        tracing::info!("Background sweeper disabled");
        None
    } else {
        let sweeper_config = SweeperConfig::default().with_interval(config.sweep_interval);
        Some(Sweeper::spawn(store.clone(), sweeper_config))
    };

    let service = SiderService::new(store.clone()).with_snapshot_path(config.snapshot_path.clone());
    let auth = Authenticator::new(config.credentials.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (grpc_listener, rest_listener) = bind_listeners(config.grpc_addr, config.rest_addr).await?;
    let grpc_addr = grpc_listener.local_addr()?;

    let grpc = Server::builder()
        .add_service(SiderServer::with_interceptor(service, auth))
        .serve_with_incoming_shutdown(
            TcpListenerStream::new(grpc_listener),
            wait_for_shutdown(shutdown_rx.clone()),
        );

    // The gateway is a client of the gRPC listener; connect lazily so start-up order doesn't matter
    let channel = Channel::from_shared(format!("http://{}", grpc_addr))?.connect_lazy();
    let app = gateway::router(SiderClient::new(channel));
    let rest =
        axum::serve(rest_listener, app).with_graceful_shutdown(wait_for_shutdown(shutdown_rx));

    tracing::info!("🚀 Sider gRPC server listening on {}", config.grpc_addr);
    tracing::info!("Sider HTTP gateway listening on {}", config.rest_addr);
    tracing::info!("   Sweep interval: {:?}", config.sweep_interval);
    tracing::info!("   Accepting login: {}", config.credentials.login());

    let mut grpc_task = tokio::spawn(async move { grpc.await.map_err(anyhow::Error::from) });
    let mut rest_task = tokio::spawn(async move { rest.await.map_err(anyhow::Error::from) });

    let outcome: anyhow::Result<()> = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutting down");
            let _ = shutdown_tx.send(true);
            match (grpc_task.await, rest_task.await) {
                (Ok(Ok(())), Ok(Ok(()))) => Ok(()),
                (Ok(Ok(())), rest) => Err(listener_failure("HTTP gateway", rest)),
                (grpc, _) => Err(listener_failure("gRPC server", grpc)),
            }
        }
        result = &mut grpc_task => {
            let _ = shutdown_tx.send(true);
            let _ = rest_task.await;
            Err(listener_failure("gRPC server", result))
        }
        result = &mut rest_task => {
            let _ = shutdown_tx.send(true);
            let _ = grpc_task.await;
            Err(listener_failure("HTTP gateway", result))
        }
    };

    if let Some(sweeper) = sweeper {
        sweeper.join().await;
    }

    if config.snapshot_on_shutdown {
        if let Some(path) = &config.snapshot_path {
            match store.save_to(path) {
                Ok(count) => tracing::info!("Saved {} entries to {}", count, path.display()),
                Err(e) => tracing::error!("Final snapshot failed: {}", e),
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use sider_core::NEVER_EXPIRES;

    #[test]
    fn test_open_store_without_path() {
        assert!(open_store(None).is_empty());
    }

    #[test]
    fn test_open_store_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");
        assert!(open_store(Some(path.as_path())).is_empty());
    }

    #[test]
    fn test_open_store_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt");
        std::fs::write(&path, [0xffu8; 8]).unwrap();

        assert!(open_store(Some(path.as_path())).is_empty());
    }

    #[test]
    fn test_open_store_restores_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sider.snapshot");
        let store = Store::new();
        store.set("k", &b"v"[..], NEVER_EXPIRES);
        store.save_to(&path).unwrap();

        let restored = open_store(Some(path.as_path()));
        assert_eq!(restored.entries(), store.entries());
    }

    #[tokio::test]
    async fn test_bind_listeners_reports_port_in_use() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let taken_addr = taken.local_addr().unwrap();
        let free: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let err = bind_listeners(taken_addr, free).await.unwrap_err();
        assert!(format!("{:#}", err).contains("gRPC listener"));

        let err = bind_listeners(free, taken_addr).await.unwrap_err();
        assert!(format!("{:#}", err).contains("HTTP listener"));
    }

    #[tokio::test]
    async fn test_bind_listeners_on_free_ports() {
        let free: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let (grpc, rest) = bind_listeners(free, free).await.unwrap();
        assert_ne!(grpc.local_addr().unwrap(), rest.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_listener_failure_describes_exit() {
        let err = listener_failure("gRPC server", Ok(Err(anyhow::anyhow!("address in use"))));
        let rendered = format!("{:#}", err);
        assert!(rendered.contains("gRPC server failed"));
        assert!(rendered.contains("address in use"));

        let err = listener_failure("HTTP gateway", Ok(Ok(())));
        assert!(err.to_string().contains("stopped unexpectedly"));

        let panicked = tokio::spawn(async { panic!("boom") }).await.map(|()| Ok(()));
        let err = listener_failure("HTTP gateway", panicked);
        assert!(err.to_string().contains("panicked"));
    }
}
