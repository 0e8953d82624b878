//! Node configuration

/// Uplink period when the duty-cycle restriction is on, in ms
pub const TX_INTERVAL_MS: u32 = 10_000;
/// Delay before resubmitting a payload the stack would not take, in ms
pub const RETRY_DELAY_MS: u32 = 3_000;
/// Application port uplinks are sent on
pub const APP_PORT: u8 = 15;
/// Data rate applied once joined
pub const DATARATE: u8 = 4;
/// Maximum number of retries for CONFIRMED messages before giving up
pub const CONFIRMED_MSG_RETRY_COUNTER: u8 = 3;
/// OTAA join attempts made by the stack
pub const JOIN_TRIALS: u8 = 3;
/// Back-to-back resends after a failed transmission before backing off
pub const MAX_IMMEDIATE_RETRIES: u8 = 3;

/// OTAA keys, all zero until provisioned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Credentials {
    pub dev_eui: [u8; 8],
    pub app_eui: [u8; 8],
    pub app_key: [u8; 16],
}

impl Credentials {
    pub const fn new(dev_eui: [u8; 8], app_eui: [u8; 8], app_key: [u8; 16]) -> Self {
        Self {
            dev_eui,
            app_eui,
            app_key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    /// Stack enforces duty-cycle limits, uplinks are timer driven
    pub duty_cycle: bool,
    pub tx_interval_ms: u32,
    pub retry_delay_ms: u32,
    pub app_port: u8,
    pub datarate: u8,
    pub confirmed_msg_retries: u8,
    pub join_trials: u8,
    pub max_immediate_retries: u8,
    pub credentials: Credentials,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            duty_cycle: cfg!(feature = "duty-cycle"),
            tx_interval_ms: TX_INTERVAL_MS,
            retry_delay_ms: RETRY_DELAY_MS,
            app_port: APP_PORT,
            datarate: DATARATE,
            confirmed_msg_retries: CONFIRMED_MSG_RETRY_COUNTER,
            join_trials: JOIN_TRIALS,
            max_immediate_retries: MAX_IMMEDIATE_RETRIES,
            credentials: Credentials::default(),
        }
    }
}

impl NodeConfig {
    pub fn with_duty_cycle(mut self, duty_cycle: bool) -> Self {
        self.duty_cycle = duty_cycle;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}
