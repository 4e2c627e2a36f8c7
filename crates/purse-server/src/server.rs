//! Listener binding and server lifecycle.

use crate::balance::run_balance_listener;
use crate::config::Config;
use crate::handlers::{self, AppState};
use crate::metrics;
use crate::topup::run_topup_listener;
use anyhow::{bail, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// A server with its listeners bound but not yet serving.
///
/// A listener whose port cannot be bound is logged and skipped; the others
/// still start.
pub struct Server {
    state: Arc<AppState>,
    pubsub: Option<TcpListener>,
    topup: Option<TcpListener>,
    balance: Option<UdpSocket>,
}

impl Server {
    /// Bind every listener named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured host is invalid or no listener
    /// could be bound at all.
    pub async fn bind(config: Config) -> Result<Self> {
        let pubsub_addr = config.socket_addr(config.pubsub.port)?;
        let topup_addr = config.socket_addr(config.topup.port)?;
        let balance_addr = config.socket_addr(config.balance.port)?;

        let pubsub = match TcpListener::bind(pubsub_addr).await {
            Ok(listener) => Some(listener),
            Err(e) => {
                error!(addr = %pubsub_addr, error = %e, "Error starting donation feed server");
                None
            }
        };
        let topup = match TcpListener::bind(topup_addr).await {
            Ok(listener) => Some(listener),
            Err(e) => {
                error!(addr = %topup_addr, error = %e, "Error starting top-up server");
                None
            }
        };
        let balance = match UdpSocket::bind(balance_addr).await {
            Ok(socket) => Some(socket),
            Err(e) => {
                error!(addr = %balance_addr, error = %e, "Error starting balance server");
                None
            }
        };

        if pubsub.is_none() && topup.is_none() && balance.is_none() {
            bail!("No listener could be bound on {}", config.host);
        }

        Ok(Self {
            state: Arc::new(AppState::new(config)),
            pubsub,
            topup,
            balance,
        })
    }

    /// Shared state, for inspection.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Bound address of the donation feed listener.
    #[must_use]
    pub fn pubsub_addr(&self) -> Option<SocketAddr> {
        self.pubsub.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Bound address of the top-up listener.
    #[must_use]
    pub fn topup_addr(&self) -> Option<SocketAddr> {
        self.topup.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Bound address of the balance listener.
    #[must_use]
    pub fn balance_addr(&self) -> Option<SocketAddr> {
        self.balance.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Serve until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Currently infallible once bound; per-connection failures are logged.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server {
            state,
            pubsub,
            topup,
            balance,
        } = self;

        if state.config.metrics.enabled {
            match state.config.metrics_addr() {
                Ok(addr) => {
                    if let Err(e) = metrics::start_metrics_server(addr) {
                        error!("Failed to start metrics server: {}", e);
                    }
                }
                Err(e) => error!("Failed to start metrics server: {:#}", e),
            }
        }

        let mut tasks = JoinSet::new();

        if let Some(listener) = pubsub {
            if let Ok(addr) = listener.local_addr() {
                info!(
                    "Donation feed endpoint: ws://{}{}",
                    addr, state.config.pubsub.path
                );
            }
            let app = handlers::router(Arc::clone(&state))
                .into_make_service_with_connect_info::<SocketAddr>();
            tasks.spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    error!(error = %e, "Donation feed server stopped");
                }
            });
        }
        if let Some(listener) = topup {
            tasks.spawn(run_topup_listener(listener, Arc::clone(&state)));
        }
        if let Some(socket) = balance {
            tasks.spawn(run_balance_listener(socket, Arc::clone(&state)));
        }

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Server shutting down");
                    tasks.abort_all();
                    break;
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok(())) => {}
                    Some(Err(e)) => warn!(error = %e, "Listener task ended abnormally"),
                    None => break,
                },
            }
        }

        Ok(())
    }

    /// Serve until Ctrl-C.
    ///
    /// # Errors
    ///
    /// See [`Server::run_until`].
    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to install ctrl-c handler");
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}
