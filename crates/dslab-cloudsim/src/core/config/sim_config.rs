//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::core::error::CloudError;

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawSimulationConfig {
    pub broker_start_delay: Option<f64>,
    pub min_time_between_events: Option<f64>,
    pub topology_file: Option<String>,
    pub datacenters: Option<Vec<DatacenterConfig>>,
    pub brokers: Option<Vec<BrokerConfig>>,
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// Number of processing elements.
    pub pes: u32,
    /// MIPS rating of each processing element.
    pub mips: f64,
    /// Memory capacity in MB.
    pub memory: u64,
    /// Bandwidth capacity in Mbit/s.
    pub bandwidth: u64,
    /// Storage capacity in MB.
    pub storage: u64,
    /// Compute allocation policy, `TimeShared` if not set.
    pub allocation_policy: Option<String>,
    /// Number of such hosts.
    pub count: Option<u32>,
}

/// Holds configuration of a storage area network attached to datacenter.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    pub name: String,
    /// Capacity in MB.
    pub capacity: u64,
    /// Network bandwidth in MB/s.
    pub bandwidth: f64,
    /// Network latency in seconds.
    pub latency: Option<f64>,
    /// Maximum disk transfer rate in MB/s.
    pub max_transfer_rate: Option<f64>,
}

/// Holds configuration of a datacenter.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct DatacenterConfig {
    pub name: String,
    /// Topology node the datacenter is mapped to.
    pub topology_node: Option<u32>,
    pub architecture: Option<String>,
    pub os: Option<String>,
    pub vmm: Option<String>,
    pub time_zone: Option<f64>,
    pub cost_per_sec: Option<f64>,
    pub cost_per_mem: Option<f64>,
    pub cost_per_storage: Option<f64>,
    pub cost_per_bw: Option<f64>,
    pub hosts: Vec<HostConfig>,
    pub storage: Option<Vec<StorageConfig>>,
}

/// Holds configuration of a datacenter broker.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct BrokerConfig {
    pub name: String,
    /// Topology node the broker is mapped to.
    pub topology_node: Option<u32>,
    /// Load balancer, `RoundRobin` if not set.
    pub load_balancer: Option<String>,
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Delay in seconds before brokers start requesting VMs.
    pub broker_start_delay: f64,
    /// Minimal delay between two processing updates of a datacenter.
    pub min_time_between_events: f64,
    /// BRITE file describing network topology, no network delays if not set.
    pub topology_file: Option<String>,
    /// Configurations of datacenters.
    pub datacenters: Vec<DatacenterConfig>,
    /// Configurations of brokers.
    pub brokers: Vec<BrokerConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationConfig {
    /// Creates simulation config with default parameter values.
    pub fn new() -> Self {
        Self {
            broker_start_delay: 0.,
            min_time_between_events: 0.01,
            topology_file: None,
            datacenters: Vec::new(),
            brokers: Vec::new(),
        }
    }

    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self, CloudError> {
        let content = std::fs::read_to_string(file_name)
            .map_err(|e| CloudError::Config(format!("can't read file {}: {}", file_name, e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, CloudError> {
        let raw: RawSimulationConfig =
            serde_yaml::from_str(content).map_err(|e| CloudError::Config(format!("can't parse YAML: {}", e)))?;
        let default = Self::new();
        let config = Self {
            broker_start_delay: raw.broker_start_delay.unwrap_or(default.broker_start_delay),
            min_time_between_events: raw.min_time_between_events.unwrap_or(default.min_time_between_events),
            topology_file: raw.topology_file,
            datacenters: raw.datacenters.unwrap_or_default(),
            brokers: raw.brokers.unwrap_or_default(),
        };
        if config.min_time_between_events < 0. {
            return Err(CloudError::Config("min_time_between_events must be non-negative".to_string()));
        }
        Ok(config)
    }
}
