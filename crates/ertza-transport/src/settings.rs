use std::time::Duration;

/// Baud rate used by every ertza serial link unless configured otherwise.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Line settings for a serial device.
///
/// Character framing is fixed to 8 data bits, no parity, one stop bit and
/// no flow control; only the fields below vary between links.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialSettings {
    /// Device path (e.g. `/dev/ttyUSB0`). `None` means "not configured".
    pub device: Option<String>,
    /// Line speed.
    pub baud_rate: u32,
    /// Blocking read timeout. Reads return `TimedOut` after this long.
    pub timeout: Duration,
    /// Assert RTS after opening.
    pub rts: bool,
    /// Assert DTR after opening.
    pub dtr: bool,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            device: None,
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_secs(1),
            rts: false,
            dtr: false,
        }
    }
}

impl SerialSettings {
    /// Settings for the given device with default line parameters.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: Some(device.into()),
            ..Self::default()
        }
    }

    /// Override the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Override the read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Assert both modem control lines after opening.
    pub fn with_control_lines(mut self) -> Self {
        self.rts = true;
        self.dtr = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_drive_links() {
        let settings = SerialSettings::default();
        assert_eq!(settings.device, None);
        assert_eq!(settings.baud_rate, 57_600);
        assert_eq!(settings.timeout, Duration::from_secs(1));
        assert!(!settings.rts && !settings.dtr);
    }

    #[test]
    fn builder_overrides() {
        let settings = SerialSettings::new("/dev/ttyUSB0")
            .with_baud_rate(115_200)
            .with_timeout(Duration::from_millis(50))
            .with_control_lines();

        assert_eq!(settings.device.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.timeout, Duration::from_millis(50));
        assert!(settings.rts && settings.dtr);
    }
}
