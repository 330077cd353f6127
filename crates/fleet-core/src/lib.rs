pub mod duration;
pub mod error;
pub mod models;
pub mod registry;
pub mod stats;

/// Default HTTP port for the metrics server
pub const DEFAULT_PORT: u16 = 6733;

/// Default path of the device list loaded at startup
pub const DEFAULT_DEVICES_CSV: &str = "devices.csv";

/// Route prefix shared by the server and the CLI
pub const API_PREFIX: &str = "/api/v1";
