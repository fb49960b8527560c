//! Driving a reader through named commands

use rfidlink::{CommandGateway, CommandOutcome, CommandRequest, ReaderConfig, ReaderManager, SimulatedDriver, Transport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let (driver, sim) = SimulatedDriver::new();
    sim.add_reader(Transport::Usb, "RFD8500_123");

    let gateway = CommandGateway::new(ReaderManager::new(driver, ReaderConfig::default()));

    let requests = [
        CommandRequest::new("getPlatformVersion"),
        CommandRequest::new("getAllAvailableReaders"),
        CommandRequest::new("connect").with_argument("readerName", "rfd8500"),
        CommandRequest::new("setAntennaPower").with_argument("powerLevel", 9000),
        CommandRequest::new("setAntennaPower").with_argument("powerLevel", 120),
        CommandRequest::new("getAntennaPower"),
        CommandRequest::new("startInventory"),
        CommandRequest::new("stopInventory"),
        CommandRequest::new("disconnect"),
        CommandRequest::new("eraseTag"),
    ];

    for request in requests {
        let method = request.method.clone();

        match gateway.handle(request).await {
            CommandOutcome::Success(payload) => {
                println!("{:<24} ok    {}", method, serde_json::to_string(&payload)?);
            }
            CommandOutcome::Failure { kind, message, .. } => {
                println!("{:<24} {:<5} {}", method, kind.code(), message);
            }
        }
    }

    Ok(())
}
