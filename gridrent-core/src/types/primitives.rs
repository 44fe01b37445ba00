use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kinds of compute cores offered on the marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// General-purpose CPU cores
    Cpu,
    /// GPU accelerator cores
    Gpu,
}

impl ResourceKind {
    /// Returns the numeric index for O(1) rate-table lookup
    pub fn to_index(self) -> usize {
        match self {
            ResourceKind::Cpu => 0,
            ResourceKind::Gpu => 1,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Cpu => write!(f, "cpu"),
            ResourceKind::Gpu => write!(f, "gpu"),
        }
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(ResourceKind::Cpu),
            "gpu" => Ok(ResourceKind::Gpu),
            other => Err(format!("unknown resource kind '{other}', expected cpu or gpu")),
        }
    }
}

/// Pricing/performance classes. Higher tiers trade cost for throughput.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Standard,
    Performance,
    Extreme,
}

impl Tier {
    /// Returns the numeric index for O(1) rate-table lookup
    pub fn to_index(self) -> usize {
        match self {
            Tier::Standard => 0,
            Tier::Performance => 1,
            Tier::Extreme => 2,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Standard => write!(f, "standard"),
            Tier::Performance => write!(f, "performance"),
            Tier::Extreme => write!(f, "extreme"),
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(Tier::Standard),
            "performance" => Ok(Tier::Performance),
            "extreme" => Ok(Tier::Extreme),
            other => Err(format!(
                "unknown tier '{other}', expected standard, performance or extreme"
            )),
        }
    }
}

/// Caller-supplied parameters for a lease acquisition.
/// Immutable once a session has been created from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquireOptions {
    /// Which kind of cores to lease
    pub resource: ResourceKind,
    /// Number of cores, must be at least 1
    pub cores: u32,
    /// Accelerator memory in GB (GPU leases only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_gb: Option<u32>,
    /// Pricing tier
    pub tier: Tier,
    /// Requested lease length in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl AcquireOptions {
    pub fn new(resource: ResourceKind, cores: u32, tier: Tier) -> Self {
        Self {
            resource,
            cores,
            memory_gb: None,
            tier,
            duration_ms: None,
        }
    }

    pub fn with_memory_gb(mut self, memory_gb: u32) -> Self {
        self.memory_gb = Some(memory_gb);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Read-only marketplace snapshot of core availability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreAvailability {
    pub resource: ResourceKind,
    pub available: u32,
    pub total: u32,
    pub tier: String,
}

/// Per-unit-time cost rates for one tier, in marketplace credits per second
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTier {
    pub tier: Tier,
    pub cpu_rate: f64,
    pub gpu_rate: f64,
    /// Surcharge per GB of accelerator memory per second
    pub memory_rate: f64,
}

/// Default marketplace endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.gridrent.io";

/// Broker configuration. Immutable after construction; owned exclusively
/// by the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Identity key used for the 403 handshake
    pub identity_key: String,
    /// Ledger wallet address used for the 402 handshake
    pub wallet_address: String,
    /// Marketplace endpoint
    pub endpoint: String,
    /// Deadline applied to task execution and settlement calls
    pub timeout_ms: u64,
    /// Settlement retry budget
    pub max_retries: u32,
}

impl BrokerConfig {
    pub fn new(identity_key: impl Into<String>, wallet_address: impl Into<String>) -> Self {
        Self {
            identity_key: identity_key.into(),
            wallet_address: wallet_address.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: 30_000,
            max_retries: 3,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}
