//! Strategies which route cloudlets of a broker to its VMs.

use std::collections::{HashMap, VecDeque};

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::core::config::options::{parse_config_value, parse_options};
use crate::core::error::CloudError;

/// Trait for implementation of VM load balancers.
///
/// Broker asks balancer for a VM for each unbound cloudlet and notifies it when a cloudlet is sent to a VM or
/// returns from it, so that balancer can keep track of VM load.
pub trait VmLoadBalancer {
    /// Returns VM for the next cloudlet among created `vms`, `None` if every VM is busy.
    fn next_available_vm(&mut self, vms: &[u32]) -> Option<u32>;

    fn on_cloudlet_allocated(&mut self, _vm_id: u32) {}

    fn on_cloudlet_finished(&mut self, _vm_id: u32) {}
}

pub fn load_balancer_resolver(config_str: &str) -> Result<Box<dyn VmLoadBalancer>, CloudError> {
    let (balancer_name, options) = parse_config_value(config_str);
    let options = options.unwrap_or_default();
    match balancer_name.as_str() {
        "RoundRobin" => Ok(Box::new(RoundRobinVmLoadBalancer::new())),
        "WeightedRoundRobin" => Ok(Box::new(WeightedRoundRobinVmLoadBalancer::from_str(&options)?)),
        "Threshold" => Ok(Box::new(ThresholdVmLoadBalancer::from_str(&options)?)),
        "Throttled" => Ok(Box::new(ThrottledVmLoadBalancer::from_str(&options)?)),
        "ActiveMonitoring" => Ok(Box::new(ActiveMonitoringVmLoadBalancer::new())),
        _ => Err(CloudError::Config(format!("unknown load balancer: {}", config_str))),
    }
}

fn option_or<T: std::str::FromStr>(options: &HashMap<String, String>, name: &str, default: T) -> Result<T, CloudError> {
    match options.get(name) {
        Some(value) => value
            .parse()
            .map_err(|_| CloudError::Config(format!("bad value of option {}: {}", name, value))),
        None => Ok(default),
    }
}

/// Number of cloudlets sent to each VM and not returned yet.
#[derive(Default)]
struct InFlight {
    counts: HashMap<u32, u32>,
}

impl InFlight {
    fn get(&self, vm_id: u32) -> u32 {
        self.counts.get(&vm_id).copied().unwrap_or(0)
    }

    fn increment(&mut self, vm_id: u32) {
        *self.counts.entry(vm_id).or_insert(0) += 1;
    }

    fn decrement(&mut self, vm_id: u32) {
        if let Some(count) = self.counts.get_mut(&vm_id) {
            *count = count.saturating_sub(1);
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Cycles through VMs ignoring their load.
#[derive(Default)]
pub struct RoundRobinVmLoadBalancer {
    current: Option<usize>,
}

impl RoundRobinVmLoadBalancer {
    pub fn new() -> Self {
        Default::default()
    }
}

impl VmLoadBalancer for RoundRobinVmLoadBalancer {
    fn next_available_vm(&mut self, vms: &[u32]) -> Option<u32> {
        if vms.is_empty() {
            return None;
        }
        let next = self.current.map_or(0, |current| (current + 1) % vms.len());
        self.current = Some(next);
        Some(vms[next])
    }
}

////////////////////////////////////////////////////////////////////////////////

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Interleaved weighted round robin.
///
/// Weights are assigned to VMs by position and repeated if there are more VMs than weights. Each cloudlet in flight
/// lowers the weight of its VM by one, down to 1.
pub struct WeightedRoundRobinVmLoadBalancer {
    weights: Vec<u32>,
    current: Option<usize>,
    current_weight: i64,
    in_flight: InFlight,
}

impl WeightedRoundRobinVmLoadBalancer {
    pub fn new(weights: Vec<u32>) -> Self {
        Self {
            weights,
            current: None,
            current_weight: 0,
            in_flight: InFlight::default(),
        }
    }

    /// Parses options like `weights=3:2:1`.
    pub fn from_str(s: &str) -> Result<Self, CloudError> {
        let options = parse_options(s);
        let weights = match options.get("weights") {
            Some(weights) => weights
                .split(':')
                .map(|w| {
                    w.trim()
                        .parse::<u32>()
                        .map_err(|_| CloudError::Config(format!("bad weight: {}", w)))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        Ok(Self::new(weights))
    }

    fn effective_weight(&self, position: usize, vm_id: u32) -> u32 {
        let base = if self.weights.is_empty() {
            1
        } else {
            self.weights[position % self.weights.len()]
        };
        base.saturating_sub(self.in_flight.get(vm_id)).max(1)
    }
}

impl VmLoadBalancer for WeightedRoundRobinVmLoadBalancer {
    fn next_available_vm(&mut self, vms: &[u32]) -> Option<u32> {
        if vms.is_empty() {
            return None;
        }
        let weights: Vec<u32> = vms
            .iter()
            .enumerate()
            .map(|(position, vm_id)| self.effective_weight(position, *vm_id))
            .collect();
        let max_weight = *weights.iter().max()? as i64;
        let step = weights.iter().fold(0, |acc, w| gcd(acc, *w)) as i64;
        loop {
            let next = self.current.map_or(0, |current| (current + 1) % vms.len());
            self.current = Some(next);
            if next == 0 {
                self.current_weight -= step;
                if self.current_weight <= 0 {
                    self.current_weight = max_weight;
                }
            }
            if weights[next] as i64 >= self.current_weight {
                return Some(vms[next]);
            }
        }
    }

    fn on_cloudlet_allocated(&mut self, vm_id: u32) {
        self.in_flight.increment(vm_id);
    }

    fn on_cloudlet_finished(&mut self, vm_id: u32) {
        self.in_flight.decrement(vm_id);
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Picks a random VM unless it holds more than `upper` cloudlets, in which case a VM with less than `under`
/// cloudlets is preferred.
pub struct ThresholdVmLoadBalancer {
    under: u32,
    upper: u32,
    underloaded: VecDeque<u32>,
    in_flight: InFlight,
    rng: Pcg64,
}

impl ThresholdVmLoadBalancer {
    pub fn new(under: u32, upper: u32, seed: u64) -> Self {
        Self {
            under,
            upper,
            underloaded: VecDeque::new(),
            in_flight: InFlight::default(),
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CloudError> {
        let options = parse_options(s);
        let under = option_or(&options, "under", 50)?;
        let upper = option_or(&options, "upper", 150)?;
        let seed = option_or(&options, "seed", 123)?;
        Ok(Self::new(under, upper, seed))
    }

    fn mark_underloaded(&mut self, vm_id: u32) {
        if !self.underloaded.contains(&vm_id) {
            self.underloaded.push_back(vm_id);
        }
    }

    fn find_underloaded(&mut self, vms: &[u32]) -> Option<u32> {
        while let Some(vm_id) = self.underloaded.pop_front() {
            if vms.contains(&vm_id) && self.in_flight.get(vm_id) < self.under {
                if self.in_flight.get(vm_id) + 1 < self.under {
                    self.underloaded.push_back(vm_id);
                }
                return Some(vm_id);
            }
        }
        None
    }
}

impl VmLoadBalancer for ThresholdVmLoadBalancer {
    fn next_available_vm(&mut self, vms: &[u32]) -> Option<u32> {
        if vms.is_empty() {
            return None;
        }
        for vm_id in vms {
            if self.in_flight.get(*vm_id) < self.under {
                self.mark_underloaded(*vm_id);
            }
        }
        let candidate = *vms.choose(&mut self.rng)?;
        if self.in_flight.get(candidate) <= self.upper {
            return Some(candidate);
        }
        Some(self.find_underloaded(vms).unwrap_or(candidate))
    }

    fn on_cloudlet_allocated(&mut self, vm_id: u32) {
        self.in_flight.increment(vm_id);
    }

    fn on_cloudlet_finished(&mut self, vm_id: u32) {
        self.in_flight.decrement(vm_id);
        if self.in_flight.get(vm_id) < self.under {
            self.mark_underloaded(vm_id);
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Gives each VM at most `threshold` cloudlets at a time.
pub struct ThrottledVmLoadBalancer {
    threshold: u32,
    in_flight: InFlight,
}

impl ThrottledVmLoadBalancer {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            in_flight: InFlight::default(),
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CloudError> {
        let threshold = option_or(&parse_options(s), "threshold", 1)?;
        Ok(Self::new(threshold))
    }
}

impl VmLoadBalancer for ThrottledVmLoadBalancer {
    fn next_available_vm(&mut self, vms: &[u32]) -> Option<u32> {
        vms.iter()
            .copied()
            .find(|vm_id| self.in_flight.get(*vm_id) < self.threshold)
    }

    fn on_cloudlet_allocated(&mut self, vm_id: u32) {
        self.in_flight.increment(vm_id);
    }

    fn on_cloudlet_finished(&mut self, vm_id: u32) {
        self.in_flight.decrement(vm_id);
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Sends each cloudlet to the VM with the fewest cloudlets in flight, the first such VM wins ties.
#[derive(Default)]
pub struct ActiveMonitoringVmLoadBalancer {
    in_flight: InFlight,
}

impl ActiveMonitoringVmLoadBalancer {
    pub fn new() -> Self {
        Default::default()
    }
}

impl VmLoadBalancer for ActiveMonitoringVmLoadBalancer {
    fn next_available_vm(&mut self, vms: &[u32]) -> Option<u32> {
        let mut best: Option<(u32, u32)> = None;
        for &vm_id in vms {
            let load = self.in_flight.get(vm_id);
            if best.map_or(true, |(_, best_load)| load < best_load) {
                best = Some((vm_id, load));
            }
        }
        best.map(|(vm_id, _)| vm_id)
    }

    fn on_cloudlet_allocated(&mut self, vm_id: u32) {
        self.in_flight.increment(vm_id);
    }

    fn on_cloudlet_finished(&mut self, vm_id: u32) {
        self.in_flight.decrement(vm_id);
    }
}
