use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::{
    env,
    fs::{File, OpenOptions},
    io::{BufReader, Read, Write},
    path::PathBuf,
};

const DEFAULT_CONFIG_FILENAME: &str = "terminal_config.ron";

/// Build time description of the terminal. Every field ends up as a
/// constant in the generated `config.rs`.
#[derive(Deserialize, Debug)]
struct Configuration {
    storage: StorageConfiguration,
    protocol: ProtocolConfiguration,
    terminal: TerminalConfiguration,
}

#[derive(Deserialize, Debug)]
struct StorageConfiguration {
    page_size: u32,
    sector_size: u32,
    metadata_address: u32,
    records_address: u32,
    data_sectors: u32,
}

#[derive(Deserialize, Debug)]
struct ProtocolConfiguration {
    ring_buffer_size: u32,
    line_buffer_size: u32,
    progress_interval: u32,
}

#[derive(Deserialize, Debug)]
struct TerminalConfiguration {
    cart_capacity: u32,
    payment_timeout_s: u32,
    max_temperature: f32,
    max_humidity: u8,
}

fn main() -> Result<()> {
    process_configuration_file()
}

fn process_configuration_file() -> Result<()> {
    println!("cargo:rerun-if-env-changed=TERMINAL_CONFIG");

    let filename = if let Some(filename) = option_env!("TERMINAL_CONFIG") {
        filename.into()
    } else {
        DEFAULT_CONFIG_FILENAME.to_owned()
    };
    println!("cargo:rerun-if-changed={}", filename);

    let file = File::open(&filename)?;
    let mut buf_reader = BufReader::new(file);
    let mut contents = String::new();
    buf_reader.read_to_string(&mut contents)?;
    let configuration: Configuration = ron::from_str(&contents)?;
    validate(&configuration)?;
    generate_config_module(&configuration)
}

fn validate(configuration: &Configuration) -> Result<()> {
    let storage = &configuration.storage;
    if storage.sector_size % storage.page_size != 0 {
        return Err(anyhow!("Sector size must be a multiple of the page size."));
    }
    if storage.metadata_address % storage.sector_size != 0
        || storage.records_address % storage.sector_size != 0
    {
        return Err(anyhow!("Metadata and record regions must be sector aligned."));
    }
    if storage.records_address <= storage.metadata_address {
        return Err(anyhow!("Records must be stored after the metadata sector."));
    }
    let protocol = &configuration.protocol;
    if protocol.ring_buffer_size < 2 {
        return Err(anyhow!("Ring buffer needs at least two slots."));
    }
    if protocol.line_buffer_size == 0 || protocol.progress_interval == 0 {
        return Err(anyhow!("Line buffer size and progress interval must be positive."));
    }
    if configuration.terminal.cart_capacity == 0 {
        return Err(anyhow!("Cart must hold at least one product."));
    }
    Ok(())
}

fn generate_config_module(configuration: &Configuration) -> Result<()> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(out_dir.join("config.rs"))?;

    let Configuration { storage, protocol, terminal } = configuration;
    writeln!(file, "// Generated from {}. Do not edit.", DEFAULT_CONFIG_FILENAME)?;
    writeln!(file, "pub const PAGE_SIZE: usize = {};", storage.page_size)?;
    writeln!(file, "pub const SECTOR_SIZE: usize = {};", storage.sector_size)?;
    writeln!(file, "pub const METADATA_ADDRESS: u32 = 0x{:06X};", storage.metadata_address)?;
    writeln!(file, "pub const RECORDS_ADDRESS: u32 = 0x{:06X};", storage.records_address)?;
    writeln!(file, "pub const DATA_SECTORS: usize = {};", storage.data_sectors)?;
    writeln!(file, "pub const RING_BUFFER_SIZE: usize = {};", protocol.ring_buffer_size)?;
    writeln!(file, "pub const LINE_BUFFER_SIZE: usize = {};", protocol.line_buffer_size)?;
    writeln!(file, "pub const PROGRESS_INTERVAL: u32 = {};", protocol.progress_interval)?;
    writeln!(file, "pub const CART_CAPACITY: usize = {};", terminal.cart_capacity)?;
    writeln!(file, "pub const PAYMENT_TIMEOUT_S: u32 = {};", terminal.payment_timeout_s)?;
    writeln!(file, "pub const MAX_TEMPERATURE: f32 = {:?};", terminal.max_temperature)?;
    writeln!(file, "pub const MAX_HUMIDITY: u8 = {};", terminal.max_humidity)?;
    Ok(())
}
