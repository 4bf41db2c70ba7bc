//! Policies of sharing host processing elements (PEs) between VMs.

use std::collections::{BTreeSet, HashMap};

use crate::core::common::VmKey;
use crate::core::config::options::parse_config_value;
use crate::core::error::CloudError;
use crate::core::vm::VmCharacteristics;

/// Processing element (CPU core) of a host.
#[derive(Clone, Debug, PartialEq)]
pub struct Pe {
    pub id: u32,
    /// Capacity in MIPS.
    pub mips: f64,
    busy: bool,
}

impl Pe {
    pub fn new(id: u32, mips: f64) -> Self {
        Self { id, mips, busy: false }
    }

    /// Only space-shared policies mark PEs as busy.
    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

/// Creates `count` identical PEs numbered from zero.
pub fn make_pes(count: u32, mips: f64) -> Vec<Pe> {
    (0..count).map(|id| Pe::new(id, mips)).collect()
}

/// Trait for implementation of PE allocation policies.
///
/// Policy decides whether a VM is admitted on the host and computes the MIPS share of each host PE given to the
/// VM. The share vector has one entry per host PE and is passed to the VM scheduler on each processing update.
pub trait ComputeAllocationPolicy {
    /// Admits VM on the host, returns `false` without changing state if VM can't be admitted.
    fn allocate_pes_for_vm(&mut self, vm: &VmCharacteristics) -> bool;

    /// Releases PEs used by VM. Unknown VMs are ignored.
    fn deallocate_pes_for_vm(&mut self, key: VmKey);

    /// Returns per-PE MIPS share of VM, all zeros for unknown VM.
    fn get_mips_share(&self, key: VmKey) -> Vec<f64>;

    fn pes(&self) -> &[Pe];

    fn pe_count(&self) -> u32 {
        self.pes().len() as u32
    }

    fn free_pe_count(&self) -> u32 {
        self.pes().iter().filter(|pe| !pe.busy).count() as u32
    }

    fn total_mips(&self) -> f64 {
        self.pes().iter().map(|pe| pe.mips).sum()
    }

    fn is_space_shared(&self) -> bool {
        false
    }
}

pub fn allocation_policy_resolver(
    config_str: &str,
    pes: Vec<Pe>,
) -> Result<Box<dyn ComputeAllocationPolicy>, CloudError> {
    let (policy_name, _) = parse_config_value(config_str);
    match policy_name.as_str() {
        "SpaceShared" => Ok(Box::new(SpaceSharedAllocationPolicy::new(pes))),
        "TimeShared" => Ok(Box::new(TimeSharedAllocationPolicy::new(pes))),
        "TimeSharedWithPriority" => Ok(Box::new(TimeSharedWithPriorityAllocationPolicy::new(pes))),
        "TimeSpaceShared" => Ok(Box::new(TimeSpaceSharedAllocationPolicy::new(pes))),
        _ => Err(CloudError::Config(format!("unknown allocation policy: {}", config_str))),
    }
}

/// VM with more virtual PEs than the host has PEs can't get a share for each of them.
fn exceeds_host(vm: &VmCharacteristics, pe_count: u32) -> bool {
    if vm.pes > pe_count {
        log::debug!("vm {} requests {} pes, host has only {}", vm.key(), vm.pes, pe_count);
        return true;
    }
    false
}

/// Sums MIPS of the first `count` PEs.
fn mips_of_first(pes: &[Pe], count: usize) -> f64 {
    pes.iter().take(count).map(|pe| pe.mips).sum()
}

/// Builds share vector with `value` in the first `pes` slots.
fn uniform_share(pe_count: usize, pes: u32, value: f64) -> Vec<f64> {
    let mut share = vec![0.; pe_count];
    for slot in share.iter_mut().take(pes as usize) {
        *slot = value;
    }
    share
}

////////////////////////////////////////////////////////////////////////////////

/// Space-shared policy: each VM gets exclusive PEs.
pub struct SpaceSharedAllocationPolicy {
    pes: Vec<Pe>,
    allocated_pes: HashMap<VmKey, Vec<usize>>,
}

impl SpaceSharedAllocationPolicy {
    pub fn new(pes: Vec<Pe>) -> Self {
        Self {
            pes,
            allocated_pes: HashMap::new(),
        }
    }

    /// Returns IDs of PEs owned by VM.
    pub fn pe_ids_of(&self, key: VmKey) -> Vec<u32> {
        self.allocated_pes
            .get(&key)
            .map(|indices| indices.iter().map(|&idx| self.pes[idx].id).collect())
            .unwrap_or_default()
    }

    pub fn busy_pe_ids(&self) -> BTreeSet<u32> {
        self.pes.iter().filter(|pe| pe.busy).map(|pe| pe.id).collect()
    }
}

impl ComputeAllocationPolicy for SpaceSharedAllocationPolicy {
    fn allocate_pes_for_vm(&mut self, vm: &VmCharacteristics) -> bool {
        if self.allocated_pes.contains_key(&vm.key()) {
            return false;
        }
        let free: Vec<usize> = self
            .pes
            .iter()
            .enumerate()
            .filter(|(_, pe)| !pe.busy)
            .map(|(idx, _)| idx)
            .take(vm.pes as usize)
            .collect();
        if free.len() < vm.pes as usize {
            log::debug!(
                "not enough free pes for vm {}: requested {}, free {}",
                vm.key(),
                vm.pes,
                free.len()
            );
            return false;
        }
        for &idx in &free {
            self.pes[idx].busy = true;
        }
        self.allocated_pes.insert(vm.key(), free);
        true
    }

    fn deallocate_pes_for_vm(&mut self, key: VmKey) {
        if let Some(indices) = self.allocated_pes.remove(&key) {
            for idx in indices {
                self.pes[idx].busy = false;
            }
        }
    }

    fn get_mips_share(&self, key: VmKey) -> Vec<f64> {
        let mut share = vec![0.; self.pes.len()];
        if let Some(indices) = self.allocated_pes.get(&key) {
            for &idx in indices {
                share[idx] = self.pes[idx].mips;
            }
        }
        share
    }

    fn pes(&self) -> &[Pe] {
        &self.pes
    }

    fn is_space_shared(&self) -> bool {
        true
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Time-shared policy: any number of VMs is admitted, the capacity of PEs in use is divided equally between all
/// requested virtual PEs. A single VM can't have more virtual PEs than the host.
pub struct TimeSharedAllocationPolicy {
    pes: Vec<Pe>,
    pes_in_use: u32,
    requested_pes: HashMap<VmKey, u32>,
}

impl TimeSharedAllocationPolicy {
    pub fn new(pes: Vec<Pe>) -> Self {
        Self {
            pes,
            pes_in_use: 0,
            requested_pes: HashMap::new(),
        }
    }

    pub fn pes_in_use(&self) -> u32 {
        self.pes_in_use
    }
}

impl ComputeAllocationPolicy for TimeSharedAllocationPolicy {
    fn allocate_pes_for_vm(&mut self, vm: &VmCharacteristics) -> bool {
        if self.requested_pes.contains_key(&vm.key()) || exceeds_host(vm, self.pe_count()) {
            return false;
        }
        self.pes_in_use += vm.pes;
        self.requested_pes.insert(vm.key(), vm.pes);
        true
    }

    fn deallocate_pes_for_vm(&mut self, key: VmKey) {
        if let Some(pes) = self.requested_pes.remove(&key) {
            self.pes_in_use -= pes;
        }
    }

    fn get_mips_share(&self, key: VmKey) -> Vec<f64> {
        let pes = match self.requested_pes.get(&key) {
            Some(&pes) if self.pes_in_use > 0 => pes,
            _ => return vec![0.; self.pes.len()],
        };
        let capacity = mips_of_first(&self.pes, self.pes_in_use as usize) / self.pes_in_use as f64;
        uniform_share(self.pes.len(), pes, capacity)
    }

    fn pes(&self) -> &[Pe] {
        &self.pes
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Time-shared policy where capacity is divided proportionally to VM priorities.
pub struct TimeSharedWithPriorityAllocationPolicy {
    pes: Vec<Pe>,
    pes_in_use: u32,
    shares: u32,
    /// (requested PEs, priority) per VM.
    admitted: HashMap<VmKey, (u32, u32)>,
}

impl TimeSharedWithPriorityAllocationPolicy {
    pub fn new(pes: Vec<Pe>) -> Self {
        Self {
            pes,
            pes_in_use: 0,
            shares: 0,
            admitted: HashMap::new(),
        }
    }
}

impl ComputeAllocationPolicy for TimeSharedWithPriorityAllocationPolicy {
    fn allocate_pes_for_vm(&mut self, vm: &VmCharacteristics) -> bool {
        if self.admitted.contains_key(&vm.key()) || exceeds_host(vm, self.pe_count()) {
            return false;
        }
        let priority = vm.priority.max(1);
        self.pes_in_use += vm.pes;
        self.shares += priority;
        self.admitted.insert(vm.key(), (vm.pes, priority));
        true
    }

    fn deallocate_pes_for_vm(&mut self, key: VmKey) {
        if let Some((pes, priority)) = self.admitted.remove(&key) {
            self.pes_in_use -= pes;
            self.shares -= priority;
        }
    }

    fn get_mips_share(&self, key: VmKey) -> Vec<f64> {
        let (pes, priority) = match self.admitted.get(&key) {
            Some(&(pes, priority)) if pes > 0 && self.shares > 0 => (pes, priority),
            _ => return vec![0.; self.pes.len()],
        };
        let capacity = mips_of_first(&self.pes, self.pes_in_use as usize) / self.shares as f64;
        uniform_share(self.pes.len(), pes, capacity * priority as f64 / pes as f64)
    }

    fn pes(&self) -> &[Pe] {
        &self.pes
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Time-shared policy where capacity is divided over `max(pes in use, host PEs)`, so a VM never gets more than the
/// rating of its PEs.
pub struct TimeSpaceSharedAllocationPolicy {
    pes: Vec<Pe>,
    pes_in_use: u32,
    requested_pes: HashMap<VmKey, u32>,
}

impl TimeSpaceSharedAllocationPolicy {
    pub fn new(pes: Vec<Pe>) -> Self {
        Self {
            pes,
            pes_in_use: 0,
            requested_pes: HashMap::new(),
        }
    }
}

impl ComputeAllocationPolicy for TimeSpaceSharedAllocationPolicy {
    fn allocate_pes_for_vm(&mut self, vm: &VmCharacteristics) -> bool {
        if self.requested_pes.contains_key(&vm.key()) || exceeds_host(vm, self.pe_count()) {
            return false;
        }
        self.pes_in_use += vm.pes;
        self.requested_pes.insert(vm.key(), vm.pes);
        true
    }

    fn deallocate_pes_for_vm(&mut self, key: VmKey) {
        if let Some(pes) = self.requested_pes.remove(&key) {
            self.pes_in_use -= pes;
        }
    }

    fn get_mips_share(&self, key: VmKey) -> Vec<f64> {
        let pes = match self.requested_pes.get(&key) {
            Some(&pes) => pes,
            None => return vec![0.; self.pes.len()],
        };
        let divisor = self.pes_in_use.max(self.pe_count()).max(1);
        uniform_share(self.pes.len(), pes, self.total_mips() / divisor as f64)
    }

    fn pes(&self) -> &[Pe] {
        &self.pes
    }
}
