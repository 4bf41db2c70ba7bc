//! Host resource provisioners (bandwidth and memory).

use std::collections::HashMap;

use crate::core::common::VmKey;
use crate::core::error::CloudError;
use crate::core::vm::VmCharacteristics;

/// Trait for provisioning of a single host resource to VMs.
///
/// Provisioner owns a capacity pool and keeps the amount reserved for each VM, so that the release is exact even if
/// the VM description changes after allocation.
pub trait ResourceProvisioner {
    /// Sets the pool size. Must be called before the simulation starts.
    fn init(&mut self, capacity: u64);

    /// Reserves the resource for VM if enough of it is available, otherwise leaves the pool unchanged.
    fn allocate_for_vm(&mut self, vm: &VmCharacteristics) -> bool;

    /// Releases the amount reserved for VM.
    fn deallocate_for_vm(&mut self, key: VmKey) -> Result<u64, CloudError>;

    fn capacity(&self) -> u64;

    fn available(&self) -> u64;

    fn allocated_for_vm(&self, key: VmKey) -> Option<u64>;
}

/// Reservation table shared by the simple provisioners.
#[derive(Default)]
struct ReservationTable {
    capacity: u64,
    available: u64,
    reserved: HashMap<VmKey, u64>,
}

impl ReservationTable {
    fn init(&mut self, capacity: u64) {
        self.capacity = capacity;
        self.available = capacity;
        self.reserved.clear();
    }

    fn reserve(&mut self, key: VmKey, amount: u64) -> bool {
        if self.reserved.contains_key(&key) || self.available < amount {
            return false;
        }
        self.available -= amount;
        self.reserved.insert(key, amount);
        true
    }

    fn release(&mut self, key: VmKey) -> Result<u64, CloudError> {
        let amount = self.reserved.remove(&key).ok_or(CloudError::UnknownVm(key))?;
        self.available += amount;
        Ok(amount)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Provisions host network bandwidth using the VM's requested bandwidth.
#[derive(Default)]
pub struct SimpleBwProvisioner {
    table: ReservationTable,
}

impl SimpleBwProvisioner {
    pub fn new(capacity: u64) -> Self {
        let mut provisioner = Self::default();
        provisioner.init(capacity);
        provisioner
    }
}

impl ResourceProvisioner for SimpleBwProvisioner {
    fn init(&mut self, capacity: u64) {
        self.table.init(capacity);
    }

    fn allocate_for_vm(&mut self, vm: &VmCharacteristics) -> bool {
        let allocated = self.table.reserve(vm.key(), vm.bandwidth);
        if !allocated {
            log::debug!(
                "not enough bandwidth for vm {}: requested {}, available {}",
                vm.key(),
                vm.bandwidth,
                self.table.available
            );
        }
        allocated
    }

    fn deallocate_for_vm(&mut self, key: VmKey) -> Result<u64, CloudError> {
        self.table.release(key)
    }

    fn capacity(&self) -> u64 {
        self.table.capacity
    }

    fn available(&self) -> u64 {
        self.table.available
    }

    fn allocated_for_vm(&self, key: VmKey) -> Option<u64> {
        self.table.reserved.get(&key).copied()
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Provisions host memory using the VM's requested memory.
#[derive(Default)]
pub struct SimpleMemoryProvisioner {
    table: ReservationTable,
}

impl SimpleMemoryProvisioner {
    pub fn new(capacity: u64) -> Self {
        let mut provisioner = Self::default();
        provisioner.init(capacity);
        provisioner
    }
}

impl ResourceProvisioner for SimpleMemoryProvisioner {
    fn init(&mut self, capacity: u64) {
        self.table.init(capacity);
    }

    fn allocate_for_vm(&mut self, vm: &VmCharacteristics) -> bool {
        let allocated = self.table.reserve(vm.key(), vm.memory);
        if !allocated {
            log::debug!(
                "not enough memory for vm {}: requested {}, available {}",
                vm.key(),
                vm.memory,
                self.table.available
            );
        }
        allocated
    }

    fn deallocate_for_vm(&mut self, key: VmKey) -> Result<u64, CloudError> {
        self.table.release(key)
    }

    fn capacity(&self) -> u64 {
        self.table.capacity
    }

    fn available(&self) -> u64 {
        self.table.available
    }

    fn allocated_for_vm(&self, key: VmKey) -> Option<u64> {
        self.table.reserved.get(&key).copied()
    }
}
