//! Minimal demo CLI: wires one Transport into a `ControlPanel`, adds a
//! single device, and issues one synchronous request. Not a full commissioning
//! tool — just enough to drive the core engine from a terminal.

use clap::{Parser, Subcommand};
use osdp_rs::control_panel::ControlPanel;
use osdp_rs::transport::{SerialTransport, TcpClientTransport, Transport};
use osdp_rs::{init_logger, log_info, OsdpError};

#[derive(Parser)]
#[command(name = "osdp-cli")]
#[command(about = "Demo CLI for the OSDP control-panel engine")]
struct Cli {
    /// Serial port path, e.g. /dev/ttyUSB0 (mutually exclusive with --tcp)
    #[arg(short, long)]
    port: Option<String>,

    /// TCP address, e.g. 127.0.0.1:4900 (mutually exclusive with --port)
    #[arg(long)]
    tcp: Option<String>,

    #[arg(short, long, default_value = "9600")]
    baudrate: u32,

    /// PD address to talk to
    #[arg(short, long, default_value = "0")]
    address: u8,

    #[arg(long)]
    use_crc: bool,

    #[arg(long)]
    use_scs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the PD's DeviceIdentification
    IdReport,
    /// Query the PD's DeviceCapabilities
    Capabilities,
    /// Query local (tamper/power) status
    LocalStatus,
}

#[tokio::main]
async fn main() -> Result<(), OsdpError> {
    init_logger();
    let cli = Cli::parse();

    let transport: Box<dyn Transport> = match (&cli.port, &cli.tcp) {
        (Some(port), None) => Box::new(SerialTransport::new(port, cli.baudrate)),
        (None, Some(addr)) => Box::new(TcpClientTransport::new(addr)),
        _ => {
            eprintln!("specify exactly one of --port or --tcp");
            std::process::exit(2);
        }
    };

    let cp = ControlPanel::new();
    let bus_id = cp.start_connection(transport).await;
    cp.add_device(bus_id, cli.address, cli.use_crc, cli.use_scs).await;

    match cli.command {
        Commands::IdReport => {
            let id = cp.id_report(bus_id, cli.address).await?;
            log_info(&format!(
                "vendor={:02X?} model={} version={} serial={} firmware={}.{}.{}",
                id.vendor_code,
                id.model_number,
                id.version,
                id.serial_number,
                id.firmware_major,
                id.firmware_minor,
                id.firmware_build
            ));
        }
        Commands::Capabilities => {
            let caps = cp.device_capabilities(bus_id, cli.address).await?;
            for cap in caps.capabilities {
                log_info(&format!("{:?}", cap));
            }
        }
        Commands::LocalStatus => {
            let status = cp.local_status(bus_id, cli.address).await?;
            log_info(&format!(
                "tamper={} power_failure={}",
                status.tamper, status.power_failure
            ));
        }
    }

    cp.shutdown().await;
    Ok(())
}
