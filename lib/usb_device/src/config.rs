/// Build-time settings for a `UsbDevice`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Config {
    /// The maximum packet size of endpoint 0. Must match `bMaxPacketSize0` of the device
    /// descriptor, and be one of the sizes allowed for full-speed control endpoints.
    pub control_max_packet_size: u16,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConfigError {
    InvalidControlPacketSize(u16),
}

impl Config {
    pub const fn new() -> Config {
        Config { control_max_packet_size: 64 }
    }

    pub const fn with_control_max_packet_size(mut self, size: u16) -> Config {
        self.control_max_packet_size = size;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.control_max_packet_size {
            8 | 16 | 32 | 64 => Ok(()),
            other => Err(ConfigError::InvalidControlPacketSize(other)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
