//! Inspection server.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use crate::error::ApiError;
use crate::routes::create_router;
use crate::state::ApiState;

/// The inspection router on a bound listener.
///
/// Binding is separate from serving so a caller can fail startup on an
/// unusable address before anything else runs.
pub struct ApiServer {
    listener: TcpListener,
    state: ApiState,
}

impl ApiServer {
    /// Bind `host:port`. Host names such as `localhost` are resolved.
    pub async fn bind(host: &str, port: u16, state: ApiState) -> Result<Self, ApiError> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| ApiError::Bind {
                addr: format!("{host}:{port}"),
                source,
            })?;
        Ok(Self { listener, state })
    }

    /// Address actually bound, useful with port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ApiError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ApiError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Inspection API listening on {}", self.local_addr()?);
        axum::serve(self.listener, create_router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("Inspection API stopped");
        Ok(())
    }
}
