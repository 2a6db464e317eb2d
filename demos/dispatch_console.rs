//! Self-contained example driving the synchronized store against a running
//! dispatch authority.
//!
//! Run with: `cargo run --example dispatch_console`
//!
//! **Requires** a dispatch authority listening on `http://127.0.0.1:4770`.

use firefight_sync::{SyncedStoreBuilder, Vehicle, VehicleState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("firefight_sync=info")),
        )
        .init();

    let store = SyncedStoreBuilder::new()
        .endpoint("http://127.0.0.1:4770")
        .open()
        .await?;

    let sync = store.start_sync().await?;

    // Register a vehicle; the authority assigns the identifier and
    // announces it on the creation side channel.
    let mut vehicle_created = store.vehicle_created();
    store.submit_create_vehicle(Vehicle {
        label: "VTTU-09".to_string(),
        capacity: Some(3),
        state: VehicleState::Available,
        ..Default::default()
    });
    let assigned_id = vehicle_created.recv().await?;
    println!("authority assigned vehicle id {assigned_id}");

    // Follow the vehicle collection for a few pushes.
    let mut vehicles = store.vehicles();
    for _ in 0..3 {
        vehicles.changed().await?;
        let roster: Vec<String> = vehicles
            .borrow()
            .values()
            .map(|v| format!("{} ({:?})", v.label, v.state))
            .collect();
        println!("fleet: {}", roster.join(", "));
    }

    sync.shutdown().await;
    Ok(())
}
