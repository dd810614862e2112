//! Client construction from a deployment descriptor

use crate::client::{ClusterClient, RedisClient, StandaloneClient};
use crate::hook::{DebugHook, HookedClient};
use crate::output::OutputSink;
use redview_core::config::{ConnectionConfig, DeploymentDescriptor, Topology};
use tracing::{info, warn};

/// Build the client for `descriptor`.
///
/// Never fails and never touches the network: connection problems surface
/// from the first command. With `debug` set on a single-node deployment,
/// every command is reported to `sink` before it runs. Cluster clients are
/// never intercepted.
pub fn create_client(descriptor: &DeploymentDescriptor, sink: OutputSink) -> Box<dyn RedisClient> {
    let config = ConnectionConfig::from_descriptor(descriptor);

    match descriptor.topology {
        Topology::Cluster => {
            info!("Creating cluster client seeded at {}", descriptor.address());
            if descriptor.debug {
                warn!(
                    "Command tracing is not supported for cluster deployments, ignoring debug flag for {}",
                    descriptor.address()
                );
            }
            Box::new(ClusterClient::new(config))
        }
        Topology::Single => {
            info!(
                "Creating standalone client for {} (db {})",
                descriptor.address(),
                descriptor.database
            );
            let client = StandaloneClient::new(config);
            if descriptor.debug {
                Box::new(HookedClient::new(client, DebugHook::new(sink)))
            } else {
                Box::new(client)
            }
        }
    }
}
