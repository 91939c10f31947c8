use crate::framework::Gateway;
use crate::gateway::{ActorTransport, StoreActor};
use crate::lifecycle::GatewayConfig;
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("failed to build runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("store actor failed: {0}")]
    ActorFailed(String),
}

/// Owns the in-memory vault and the runtime it runs on.
///
/// `GatewaySystem` is responsible for:
/// - **Lifecycle Management**: starting the store actor on a dedicated tokio
///   runtime and stopping it again
/// - **Wiring**: handing out [`Gateway`] handles connected to the actor
///
/// The record layer is synchronous, so the system itself must be started,
/// used and shut down outside of any async context.
///
/// # Example
///
/// ```ignore
/// let system = GatewaySystem::start(GatewayConfig::default())?;
/// let customer = CustomerRecord::create(system.gateway(), attrs! { "first_name" => "Ada" })?;
/// system.shutdown()?;
/// ```
pub struct GatewaySystem {
    runtime: Runtime,
    transport: ActorTransport,
    handle: JoinHandle<()>,
}

impl GatewaySystem {
    pub fn start(config: GatewayConfig) -> Result<Self, SystemError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .thread_name("gateway-store")
            .enable_all()
            .build()?;

        let (actor, transport) = StoreActor::new(config.buffer_size);
        let handle = runtime.spawn(actor.run());

        info!(
            buffer_size = config.buffer_size,
            worker_threads = config.worker_threads,
            "Gateway system started"
        );
        Ok(Self {
            runtime,
            transport,
            handle,
        })
    }

    /// A fresh handle to the vault. Handles stay usable until shutdown.
    pub fn gateway(&self) -> Gateway {
        Gateway::new(self.transport.clone())
    }

    /// Stops the store actor and waits for it to finish.
    ///
    /// Records still holding a [`Gateway`] fail with a transport error
    /// afterwards.
    pub fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down system...");

        // Already-closed channel means the actor is gone; the join below reports why.
        let _ = self.transport.shutdown();

        if let Err(e) = self.runtime.block_on(self.handle) {
            error!("Store actor failed: {:?}", e);
            return Err(SystemError::ActorFailed(e.to_string()));
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
