//! Scan a Redis deployment and print the matching keys
//!
//! ```text
//! cargo run --example scan_keys -- localhost 6379 'user:*' 50
//! REDVIEW_CLUSTER=1 REDVIEW_DEBUG=1 cargo run --example scan_keys -- 10.0.0.5 7000
//! ```
//!
//! Set `RUST_LOG=redview=debug` to see every scan step.

use redview::{
    create_client, describe_key, output_channel, scan_keys_with_limit, DeploymentDescriptor,
    ScanLimit, Topology,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "localhost".to_string());
    let port: u16 = args.next().map(|p| p.parse()).transpose()?.unwrap_or(6379);
    let pattern = args.next().unwrap_or_else(|| "*".to_string());
    let raw_limit: i64 = args.next().map(|n| n.parse()).transpose()?.unwrap_or(-1);
    let limit = ScanLimit::from(raw_limit);

    let mut descriptor = DeploymentDescriptor::new(host, port)
        .with_debug(std::env::var_os("REDVIEW_DEBUG").is_some());
    if std::env::var_os("REDVIEW_CLUSTER").is_some() {
        descriptor = descriptor.with_topology(Topology::Cluster);
    }
    if let Ok(password) = std::env::var("REDVIEW_PASSWORD") {
        descriptor = descriptor.with_password(password);
    }

    let (sink, mut messages) = output_channel();
    tokio::spawn(async move {
        while let Some(message) = messages.recv().await {
            eprintln!("{message}");
        }
    });

    let client = create_client(&descriptor, sink);
    println!("Scanning {} for {:?} ({:?})", descriptor.address(), pattern, limit);

    let keys = match scan_keys_with_limit(client.as_ref(), &pattern, limit).await {
        Ok(keys) => keys,
        Err(err) => {
            eprintln!(
                "Scan failed at step {} after {} keys: {}",
                err.step(),
                err.partial_keys().len(),
                err.redis_error()
            );
            err.partial_keys().to_vec()
        }
    };

    for key in &keys {
        println!("{key}");
    }
    println!("{} keys", keys.len());

    if let Some(first) = keys.first() {
        let details = describe_key(client.as_ref(), first).await?;
        println!(
            "{}: {} ({:?}) = {:?}",
            details.key, details.key_type, details.ttl, details.value
        );
    }

    Ok(())
}
