use crate::ship::ShipType;
use std::time::Duration;

pub const BOARD_SIZE: u8 = 10;
pub const NUM_SHIPS: usize = 5;
pub const SHIPS: [ShipType; NUM_SHIPS] = [
    ShipType::new("Carrier", 5),
    ShipType::new("Battleship", 4),
    ShipType::new("Cruiser", 3),
    ShipType::new("Submarine", 3),
    ShipType::new("Destroyer", 2),
];

/// Average hits needed to sink one ship, used for the ships-remaining estimate.
pub const HITS_PER_SHIP_ESTIMATE: usize = 3;

/// Look up a catalog ship by name.
pub fn ship_type_by_name(name: &str) -> Option<ShipType> {
    SHIPS.iter().copied().find(|def| def.name() == name)
}

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_UPSTREAM_ADDR: &str = "localhost:8080";

/// Outbound stream idle window (30 seconds).
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for the outbound TCP connect (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest frame accepted from the authoritative server (1 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 1 << 20;

/// Cap on bytes queued for the outbound socket per connection (1 MiB).
pub const DEFAULT_MAX_PENDING_WRITE: usize = 1 << 20;

/// Runtime settings of the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the browser-facing WebSocket listener binds to.
    pub listen_addr: String,
    /// Address of the authoritative game server.
    pub upstream_addr: String,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_frame_len: usize,
    pub max_pending_write: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            upstream_addr: DEFAULT_UPSTREAM_ADDR.to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_pending_write: DEFAULT_MAX_PENDING_WRITE,
        }
    }
}

impl RelayConfig {
    /// Configuration pointing at `upstream_addr`, everything else default.
    pub fn with_upstream(upstream_addr: impl Into<String>) -> Self {
        Self {
            upstream_addr: upstream_addr.into(),
            ..Self::default()
        }
    }
}
