//! Inventory session against the simulated reader

use std::time::Duration;

use rfidlink::{ReaderConfig, ReaderEvent, ReaderManager, SimulatedDriver, TagReadEvent, Transport};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (driver, sim) = SimulatedDriver::new();
    sim.add_reader(Transport::Bluetooth, "RFD40+_211545201D0011");
    sim.add_reader(Transport::Bluetooth, "Headset_42");

    let manager = ReaderManager::new(driver, ReaderConfig::default());
    let mut events = manager.dispatcher().subscribe_channel();

    let outcome = manager.initialize().await?;
    println!("✓ {}", outcome);

    manager.set_antenna_power(200).await?;
    println!("✓ Antenna power: {}", manager.antenna_power().await?);

    manager.start_inventory().await?;

    // Pretend the operator squeezes the trigger over two tags
    sim.trigger(true);
    sim.read_tags(vec![
        TagReadEvent::new("E28011C1A5000062F792696D", -48, 1, 3)?,
        TagReadEvent::new("3005FB63AC1F3681EC880468", -61, 1, 1)?,
    ]);
    sim.trigger(false);
    sim.drop_link();

    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(500), events.recv()).await {
        match &event {
            ReaderEvent::TagRead { tags } => {
                for tag in tags {
                    println!("  {} rssi={} x{}", tag.tag_id, tag.rssi, tag.seen_count);
                }
            }
            other => println!("event: {}", serde_json::to_string(other)?),
        }

        if matches!(event, ReaderEvent::Disconnected) {
            break;
        }
    }

    manager.dispose().await?;
    println!("✓ Disposed");

    Ok(())
}
