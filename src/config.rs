//! Configuration for the control point and its optional network surfaces.
//!
//! Uses `heapless` collections for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`.
//!
//! These are the values a node keeps in non-volatile
//! storage: the unlock delay, lamp polarity, bus address, status interval and
//! the input binding tables. How they are stored is up to the host.
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::config::{Config, ControlPointConfig, InputBindings, MqttConfig, WebConfig};
//! use cp_interlock::InputId;
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.control_point.bus_address, 0x03);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_control_point(ControlPointConfig::default().with_unlock_delay_decisecs(300))
//!     .with_bindings(InputBindings::default().with_virtual(InputId::Main1Os, 0x20, b'S', 6))
//!     .with_mqtt(MqttConfig::default().with_host("192.168.1.100"))
//!     .with_web(WebConfig::default().with_port(3000));
//! assert_eq!(config.control_point.unlock_delay_secs, 30);
//! ```

use heapless::String as HString;
use heapless::Vec;

use crate::input::{InputBinding, InputId, PhysicalBinding, VirtualBinding};
use crate::outputs::{PORT_A, PORT_D};

/// Maximum length for short config strings (hostnames, client IDs)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (topic prefixes, paths)
pub const MAX_LONG_STRING: usize = 128;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

fn utf8_prefix(s: &str, max: usize) -> &str {
    let valid_end = s
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|end| *end <= max)
        .last()
        .unwrap_or(0);
    &s[..valid_end]
}

/// Create a ShortString from a &str, truncating at a char boundary if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    let _ = hs.push_str(utf8_prefix(s, MAX_SHORT_STRING));
    hs
}

/// Create a LongString from a &str, truncating at a char boundary if too long
pub fn long_string(s: &str) -> LongString {
    let mut hs = LongString::new();
    let _ = hs.push_str(utf8_prefix(s, MAX_LONG_STRING));
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Interlocking constants
    pub control_point: ControlPointConfig,
    /// Input binding tables
    pub bindings: InputBindings,
    /// MQTT client configuration
    pub mqtt: MqttConfig,
    /// Web server configuration
    pub web: WebConfig,
    /// Device identification
    pub device: DeviceConfig,
}

impl Config {
    /// Set interlocking configuration
    pub fn with_control_point(mut self, control_point: ControlPointConfig) -> Self {
        self.control_point = control_point;
        self
    }

    /// Set input bindings
    pub fn with_bindings(mut self, bindings: InputBindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }

    /// Set web configuration
    pub fn with_web(mut self, web: WebConfig) -> Self {
        self.web = web;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }
}

// ============================================================================
// Control Point Config
// ============================================================================

/// Bus address used when the configured one is invalid.
pub const DEFAULT_BUS_ADDRESS: u8 = 0x03;

/// Shortest status interval, in deciseconds.
pub const MIN_STATUS_INTERVAL: u8 = 10;

/// Interlocking constants, read once at boot.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlPointConfig {
    /// Timelock release delay in whole seconds
    pub unlock_delay_secs: u16,
    /// Signal lamps are common anode (active low)
    pub heads_common_anode: bool,
    /// This node's bus address
    pub bus_address: u8,
    /// Periodic status interval in deciseconds (10..=255)
    pub status_interval_decisecs: u8,
}

impl Default for ControlPointConfig {
    fn default() -> Self {
        Self {
            unlock_delay_secs: 30,
            heads_common_anode: false,
            bus_address: DEFAULT_BUS_ADDRESS,
            status_interval_decisecs: 20,
        }
    }
}

impl ControlPointConfig {
    /// Set the unlock delay in seconds
    pub fn with_unlock_delay_secs(mut self, secs: u16) -> Self {
        self.unlock_delay_secs = secs;
        self
    }

    /// Set the unlock delay from a stored decisecond value, truncated to
    /// whole seconds.
    pub fn with_unlock_delay_decisecs(mut self, decisecs: u16) -> Self {
        self.unlock_delay_secs = decisecs / 10;
        self
    }

    /// Set lamp polarity
    pub fn with_common_anode(mut self, common_anode: bool) -> Self {
        self.heads_common_anode = common_anode;
        self
    }

    /// Set the bus address. 0x00 and 0xFF fall back to 0x03.
    pub fn with_bus_address(mut self, address: u8) -> Self {
        self.bus_address = match address {
            0x00 | 0xFF => DEFAULT_BUS_ADDRESS,
            a => a,
        };
        self
    }

    /// Set the periodic status interval, clamped to 1 s .. 25.5 s.
    pub fn with_status_interval_decisecs(mut self, decisecs: u16) -> Self {
        self.status_interval_decisecs = decisecs.clamp(MIN_STATUS_INTERVAL as u16, 255) as u8;
        self
    }
}

// ============================================================================
// Input Bindings
// ============================================================================

/// One row of the virtual-input table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualInputRecord {
    /// Input being bound
    pub input: InputId,
    /// Where its value is carried
    pub binding: VirtualBinding,
}

/// One row of the physical-input table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicalInputRecord {
    /// Input being bound
    pub input: InputId,
    /// Expander pin it is wired to
    pub binding: PhysicalBinding,
}

/// Physical wiring of the control point board.
pub const DEFAULT_PHYSICAL_INPUTS: [PhysicalInputRecord; 5] = [
    PhysicalInputRecord {
        input: InputId::EastCrossoverActualPos,
        binding: PhysicalBinding::new(1, PORT_A, 6),
    },
    PhysicalInputRecord {
        input: InputId::WestCrossoverActualPos,
        binding: PhysicalBinding::new(1, PORT_A, 7),
    },
    PhysicalInputRecord {
        input: InputId::EastCrossoverManualPos,
        binding: PhysicalBinding::new(1, PORT_A, 3),
    },
    PhysicalInputRecord {
        input: InputId::WestCrossoverManualPos,
        binding: PhysicalBinding::new(1, PORT_A, 4),
    },
    PhysicalInputRecord {
        input: InputId::TimelockSwitch,
        binding: PhysicalBinding::new(0, PORT_D, 7),
    },
];

/// Inputs reported by neighbouring nodes: the sixteen approach inputs and
/// both OS sections.
pub const REMOTE_INPUTS: [InputId; 18] = [
    InputId::Main1EastAdjoin,
    InputId::Main1EastApproach,
    InputId::Main1EastApproach2,
    InputId::Main1EastTumble,
    InputId::Main2EastAdjoin,
    InputId::Main2EastApproach,
    InputId::Main2EastApproach2,
    InputId::Main2EastTumble,
    InputId::Main1WestAdjoin,
    InputId::Main1WestApproach,
    InputId::Main1WestApproach2,
    InputId::Main1WestTumble,
    InputId::Main2WestAdjoin,
    InputId::Main2WestApproach,
    InputId::Main2WestApproach2,
    InputId::Main2WestTumble,
    InputId::Main1Os,
    InputId::Main2Os,
];

/// The two static binding tables, looked up once when the state is built.
///
/// The virtual table is consulted first, then the physical table. An input
/// in neither resolves to a zeroed physical binding.
///
/// # Example
///
/// ```rust
/// use cp_interlock::config::InputBindings;
/// use cp_interlock::input::{InputBinding, PhysicalBinding};
/// use cp_interlock::InputId;
///
/// let bindings = InputBindings::default().with_virtual(InputId::Main2EastAdjoin, 0x21, b'S', (4 << 5) | 7);
/// match bindings.resolve(InputId::Main2EastAdjoin) {
///     InputBinding::Virtual(v) => assert_eq!((v.source, v.byte, v.bit), (0x21, 7, 4)),
///     other => panic!("unexpected {:?}", other),
/// }
///
/// assert_eq!(
///     InputBindings::default().resolve(InputId::TimelockSwitch),
///     InputBinding::Physical(PhysicalBinding::new(0, 3, 7)),
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputBindings {
    /// Virtual-input table
    pub virtual_inputs: Vec<VirtualInputRecord, { InputId::COUNT }>,
    /// Physical-input table
    pub physical_inputs: Vec<PhysicalInputRecord, { InputId::COUNT }>,
}

impl Default for InputBindings {
    /// Board wiring for the physical inputs, and every remote input bound
    /// virtually with a zeroed address until configured.
    fn default() -> Self {
        let mut bindings = Self::empty();
        for record in DEFAULT_PHYSICAL_INPUTS {
            bindings = bindings.with_physical(record.input, record.binding.device, record.binding.port, record.binding.bit);
        }
        for id in REMOTE_INPUTS {
            bindings = bindings.with_virtual(id, 0, 0, 0);
        }
        bindings
    }
}

impl InputBindings {
    /// Both tables empty.
    pub fn empty() -> Self {
        Self {
            virtual_inputs: Vec::new(),
            physical_inputs: Vec::new(),
        }
    }

    /// Bind an input to a bit of a remote node's message. `bit_byte` is the
    /// packed form: low five bits byte offset, high three bits bit number.
    /// Replaces any earlier virtual record for the same input.
    pub fn with_virtual(mut self, input: InputId, source: u8, msg_type: u8, bit_byte: u8) -> Self {
        let record = VirtualInputRecord {
            input,
            binding: VirtualBinding::from_bit_byte(source, msg_type, bit_byte),
        };
        match self.virtual_inputs.iter_mut().find(|r| r.input == input) {
            Some(existing) => *existing = record,
            // One record per input, so the table cannot overflow.
            None => {
                let _ = self.virtual_inputs.push(record);
            }
        }
        self
    }

    /// Bind an input to a local expander pin. Replaces any earlier physical
    /// record for the same input.
    pub fn with_physical(mut self, input: InputId, device: u8, port: u8, bit: u8) -> Self {
        let record = PhysicalInputRecord {
            input,
            binding: PhysicalBinding::new(device, port, bit),
        };
        match self.physical_inputs.iter_mut().find(|r| r.input == input) {
            Some(existing) => *existing = record,
            None => {
                let _ = self.physical_inputs.push(record);
            }
        }
        self
    }

    /// Resolve an input's binding: virtual table first, then physical, else
    /// a zeroed physical binding.
    pub fn resolve(&self, input: InputId) -> InputBinding {
        if let Some(r) = self.virtual_inputs.iter().find(|r| r.input == input) {
            return InputBinding::Virtual(r.binding);
        }
        if let Some(r) = self.physical_inputs.iter().find(|r| r.input == input) {
            return InputBinding::Physical(r.binding);
        }
        InputBinding::default()
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT client configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Client ID (should be unique per control point)
    pub client_id: ShortString,
    /// Topic prefix for all pub/sub (e.g., "cp" -> "cp/status")
    pub topic_prefix: ShortString,
    /// Username for authentication (empty = no auth)
    pub username: ShortString,
    /// Password for authentication
    pub password: ShortString,
    /// Heartbeat status publish interval in milliseconds
    pub heartbeat_ms: u32,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Whether MQTT is enabled
    pub enabled: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: short_string("localhost"),
            port: 1883,
            client_id: short_string("cp-interlock"),
            topic_prefix: short_string("cp"),
            username: ShortString::new(),
            password: ShortString::new(),
            heartbeat_ms: 5000,
            keep_alive_secs: 30,
            enabled: true,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = short_string(host);
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client ID
    pub fn with_client_id(mut self, id: &str) -> Self {
        self.client_id = short_string(id);
        self
    }

    /// Set the topic prefix
    pub fn with_topic_prefix(mut self, prefix: &str) -> Self {
        self.topic_prefix = short_string(prefix);
        self
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = short_string(username);
        self.password = short_string(password);
        self
    }

    /// Set the heartbeat interval
    pub fn with_heartbeat_ms(mut self, ms: u32) -> Self {
        self.heartbeat_ms = ms;
        self
    }

    /// Enable or disable MQTT
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Build a topic string with the configured prefix
    pub fn topic(&self, suffix: &str) -> LongString {
        let mut topic = LongString::new();
        let _ = topic.push_str(self.topic_prefix.as_str());
        let _ = topic.push('/');
        let _ = topic.push_str(suffix);
        topic
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        !self.username.is_empty()
    }
}

// ============================================================================
// Web Config
// ============================================================================

/// Web server configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WebConfig {
    /// Port to listen on
    pub port: u16,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
    /// Whether web server is enabled
    pub enabled: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_permissive: true,
            enabled: true,
        }
    }
}

impl WebConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set CORS mode
    pub fn with_cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Enable or disable web server
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceConfig {
    /// Human-readable control point name
    pub name: ShortString,
    /// Milepost or station identifier
    pub id: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: short_string("cp-interlock"),
            id: short_string("cp1"),
        }
    }
}

impl DeviceConfig {
    /// Set the control point name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }

    /// Set the identifier
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = short_string(id);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
