//! JSON-RPC Server
//!
//! Implements the JSON-RPC 2.0 server over TCP, bound to localhost only.

use crate::handler::RpcHandler;
use crate::types::{ResultsRequest, RowRequest, SubmitDemoRequest, SubmitRequest};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::{ErrorObjectOwned, Params};
use jsonrpsee::RpcModule;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9617;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 binds an ephemeral port (tests)
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

/// Accept both `{"job_id": ..}` and `[{"job_id": ..}]` parameter shapes.
fn parse_params<T: DeserializeOwned>(params: Params<'_>) -> Result<T, ErrorObjectOwned> {
    if params.is_object() {
        params.parse()
    } else {
        params.one()
    }
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: RpcHandler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    /// Start the JSON-RPC server
    ///
    /// Returns the bound address alongside the handle.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let mut module = RpcModule::new(());

        let handler = self.handler.clone();
        module
            .register_async_method("comparison.submit.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: SubmitRequest = parse_params(params)?;
                    handler.submit(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("comparison.submit_demo.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: SubmitDemoRequest = parse_params(params)?;
                    handler.submit_demo(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("comparison.results.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: ResultsRequest = parse_params(params)?;
                    handler.results(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("comparison.row.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: RowRequest = parse_params(params)?;
                    handler.row(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("admin.stats.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.stats().await }
            })
            .map_err(|e| e.to_string())?;

        info!(addr = %local_addr, "JSON-RPC server started (localhost only)");

        let handle = server.start(module);
        Ok((local_addr, handle))
    }
}
