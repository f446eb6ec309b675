use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use cdc_link::config::{Config, ConfigLoader, LogFormat};
use cdc_link::port::{AsyncCdcIo, SerialOptions, TokioCdcPort};
use cdc_link::session::{DeviceSession, TransferStatus};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "cdc-link",
    version,
    about = "Control a serial/USB-CDC device: transfers, line state, and configuration.",
    long_about = "Opens one serial/USB-CDC device at a time and drives it through a \
                  caller-owned session: asynchronous transfers with completion polling, \
                  DTR/RTS and break control, and structured serial parameters."
)]
struct Args {
    /// Explicit configuration file path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial devices present on the system.
    List {
        /// Emit the device list as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Write data to a device and wait for completion.
    Send {
        /// Device path or configured alias.
        device: String,
        /// Data to write.
        data: String,
        /// Baud rate override.
        #[arg(long)]
        baud: Option<u32>,
    },
    /// Read up to --capacity bytes from a device.
    Recv {
        /// Device path or configured alias.
        device: String,
        /// Maximum number of bytes to read.
        #[arg(long, default_value_t = 256)]
        capacity: usize,
        /// Baud rate override.
        #[arg(long)]
        baud: Option<u32>,
        /// Print the received bytes as hex instead of text.
        #[arg(long)]
        hex: bool,
    },
    /// Continuously print device output until Ctrl-C.
    Monitor {
        /// Device path or configured alias.
        device: String,
        /// Baud rate override.
        #[arg(long)]
        baud: Option<u32>,
    },
    /// Drive the DTR/RTS output lines.
    Lines {
        /// Device path or configured alias.
        device: String,
        /// DTR level (true/false).
        #[arg(long, action = ArgAction::Set)]
        dtr: bool,
        /// RTS level (true/false).
        #[arg(long, action = ArgAction::Set)]
        rts: bool,
    },
    /// Send a break pulse.
    Break {
        /// Device path or configured alias.
        device: String,
        /// Break duration in milliseconds.
        #[arg(long, default_value_t = 250)]
        ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let config = loader.into_config();
    init_tracing(&config);

    match args.command {
        Command::List { json } => list_devices(json)?,
        Command::Send { device, data, baud } => {
            let mut session = open_session(&config, &device, baud)?;
            session.start_write(data.as_bytes())?;
            let written = wait_write(&mut session).await?;
            println!("wrote {written} bytes to {}", session.name());
            session.close()?;
        }
        Command::Recv {
            device,
            capacity,
            baud,
            hex,
        } => {
            let mut session = open_session(&config, &device, baud)?;
            session.start_read(capacity)?;
            let data = wait_read(&mut session).await?;
            if data.is_empty() {
                println!("no data before the read timeout");
            } else if hex {
                println!("{}", to_hex(&data));
            } else {
                println!("{}", String::from_utf8_lossy(&data));
            }
            session.close()?;
        }
        Command::Monitor { device, baud } => {
            let path = config.serial.resolve_device(&device);
            let options = session_options(&config, baud);
            monitor(&path, &options).await?;
        }
        Command::Lines { device, dtr, rts } => {
            let mut session = open_session(&config, &device, None)?;
            session.set_control_lines(dtr, rts)?;
            let lines = session.control_lines();
            println!("dtr={} rts={}", lines.dtr, lines.rts);
            session.close()?;
        }
        Command::Break { device, ms } => {
            let mut session = open_session(&config, &device, None)?;
            session.send_break(Duration::from_millis(ms)).await?;
            println!("break pulse of {ms} ms sent");
            session.close()?;
        }
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn session_options(config: &Config, baud: Option<u32>) -> SerialOptions {
    SerialOptions {
        baud_rate: baud.unwrap_or(config.serial.default_baud),
        ..SerialOptions::default()
    }
}

fn open_session(
    config: &Config,
    device: &str,
    baud: Option<u32>,
) -> Result<DeviceSession, Box<dyn std::error::Error>> {
    let path = config.serial.resolve_device(device);
    let options = session_options(config, baud);
    let mut session = DeviceSession::open(&path, &options)?;
    session.set_timeouts(config.serial.timeouts())?;
    Ok(session)
}

async fn wait_write(session: &mut DeviceSession) -> Result<usize, cdc_link::SessionError> {
    loop {
        match session.poll_write()? {
            TransferStatus::Complete(n) => return Ok(n),
            TransferStatus::Pending => tokio::time::sleep(Duration::from_millis(5)).await,
        }
    }
}

async fn wait_read(session: &mut DeviceSession) -> Result<Vec<u8>, cdc_link::SessionError> {
    loop {
        match session.poll_read()? {
            TransferStatus::Complete(data) => return Ok(data),
            TransferStatus::Pending => tokio::time::sleep(Duration::from_millis(5)).await,
        }
    }
}

fn list_devices(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ports = serialport::available_ports()?;

    if json {
        let entries: Vec<serde_json::Value> = ports
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.port_name,
                    "kind": describe_port_type(&p.port_type),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if ports.is_empty() {
        println!("no serial devices found");
    } else {
        for p in &ports {
            println!("{}\t{}", p.port_name, describe_port_type(&p.port_type));
        }
    }

    Ok(())
}

fn describe_port_type(port_type: &serialport::SerialPortType) -> String {
    match port_type {
        serialport::SerialPortType::UsbPort(info) => {
            let mut desc = format!("USB {:04x}:{:04x}", info.vid, info.pid);
            if let Some(product) = &info.product {
                desc.push(' ');
                desc.push_str(product);
            }
            desc
        }
        serialport::SerialPortType::PciPort => "PCI".to_string(),
        serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        serialport::SerialPortType::Unknown => "Unknown".to_string(),
    }
}

async fn monitor(path: &str, options: &SerialOptions) -> Result<(), Box<dyn std::error::Error>> {
    use std::io::Write;

    let mut port = TokioCdcPort::open(path, options)?;
    let mut buffer = [0u8; 1024];
    println!("monitoring {path} at {} baud (Ctrl-C to stop)", options.baud_rate);

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                println!("\nstopping monitor");
                break;
            }
            result = port.read_bytes(&mut buffer) => {
                let n = result?;
                if n > 0 {
                    let mut stdout = std::io::stdout();
                    stdout.write_all(&buffer[..n])?;
                    stdout.flush()?;
                }
            }
        }
    }

    Ok(())
}

fn to_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
