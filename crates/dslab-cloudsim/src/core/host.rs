//! Physical host.

use indexmap::IndexMap;

use crate::core::allocation_policy::ComputeAllocationPolicy;
use crate::core::common::{AllocationVerdict, VmKey};
use crate::core::provisioner::{ResourceProvisioner, SimpleBwProvisioner, SimpleMemoryProvisioner};
use crate::core::vm::{VirtualMachine, VmCharacteristics};

/// Represents a physical machine which runs VMs.
///
/// Host owns bandwidth and memory provisioners, the PE allocation policy and resident VMs. VM is admitted only if all
/// three resources are granted, otherwise everything granted so far is returned back.
pub struct Host {
    pub id: u32,
    storage: u64,
    bw_provisioner: Box<dyn ResourceProvisioner>,
    memory_provisioner: Box<dyn ResourceProvisioner>,
    allocation_policy: Box<dyn ComputeAllocationPolicy>,
    vms: IndexMap<VmKey, VirtualMachine>,
}

impl Host {
    pub fn new(
        id: u32,
        memory: u64,
        bandwidth: u64,
        storage: u64,
        allocation_policy: Box<dyn ComputeAllocationPolicy>,
    ) -> Self {
        Self::with_provisioners(
            id,
            storage,
            Box::new(SimpleBwProvisioner::new(bandwidth)),
            Box::new(SimpleMemoryProvisioner::new(memory)),
            allocation_policy,
        )
    }

    pub fn with_provisioners(
        id: u32,
        storage: u64,
        bw_provisioner: Box<dyn ResourceProvisioner>,
        memory_provisioner: Box<dyn ResourceProvisioner>,
        allocation_policy: Box<dyn ComputeAllocationPolicy>,
    ) -> Self {
        Self {
            id,
            storage,
            bw_provisioner,
            memory_provisioner,
            allocation_policy,
            vms: IndexMap::new(),
        }
    }

    /// Grants bandwidth, memory and PEs in this order, rolling back on the first failure.
    fn allocate_resources(&mut self, vm: &VmCharacteristics) -> AllocationVerdict {
        if !self.bw_provisioner.allocate_for_vm(vm) {
            return AllocationVerdict::NotEnoughBandwidth;
        }
        if !self.memory_provisioner.allocate_for_vm(vm) {
            self.release_bandwidth(vm.key());
            return AllocationVerdict::NotEnoughMemory;
        }
        if !self.allocation_policy.allocate_pes_for_vm(vm) {
            self.release_memory(vm.key());
            self.release_bandwidth(vm.key());
            return AllocationVerdict::NotEnoughPes;
        }
        AllocationVerdict::Success
    }

    fn release_bandwidth(&mut self, key: VmKey) {
        if let Err(e) = self.bw_provisioner.deallocate_for_vm(key) {
            log::error!("host #{}: {}", self.id, e);
        }
    }

    fn release_memory(&mut self, key: VmKey) {
        if let Err(e) = self.memory_provisioner.deallocate_for_vm(key) {
            log::error!("host #{}: {}", self.id, e);
        }
    }

    fn release_resources(&mut self, key: VmKey) {
        self.release_bandwidth(key);
        self.release_memory(key);
        self.allocation_policy.deallocate_pes_for_vm(key);
    }

    /// Creates VM with its scheduler if the host has enough resources.
    pub fn vm_create(&mut self, characteristics: VmCharacteristics) -> AllocationVerdict {
        if self.vms.contains_key(&characteristics.key()) {
            log::warn!("host #{}: vm {} already exists", self.id, characteristics.key());
            return AllocationVerdict::AlreadyExists;
        }
        let verdict = self.allocate_resources(&characteristics);
        if verdict.is_success() {
            let mut vm = VirtualMachine::new(characteristics);
            vm.set_host_id(Some(self.id));
            log::debug!("vm {} created on host #{}", vm.key(), self.id);
            self.vms.insert(vm.key(), vm);
        } else {
            log::debug!(
                "vm {} can't be created on host #{}: {:?}",
                characteristics.key(),
                self.id,
                verdict
            );
        }
        verdict
    }

    /// Removes VM and releases its resources.
    pub fn vm_destroy(&mut self, key: VmKey) -> Option<VirtualMachine> {
        let mut vm = self.vms.shift_remove(&key)?;
        self.release_resources(key);
        vm.set_host_id(None);
        log::debug!("vm {} removed from host #{}", key, self.id);
        Some(vm)
    }

    /// Detaches VM from the host so that it can be attached to another host.
    pub fn vm_migrate_out(&mut self, key: VmKey) -> Option<VirtualMachine> {
        self.vm_destroy(key)
    }

    /// Attaches already existing VM. On failure the VM is given back to the caller.
    pub fn vm_migrate_in(&mut self, mut vm: VirtualMachine) -> Result<(), VirtualMachine> {
        if self.vms.contains_key(&vm.key()) {
            return Err(vm);
        }
        let verdict = self.allocate_resources(vm.characteristics());
        if !verdict.is_success() {
            log::debug!("vm {} can't migrate to host #{}: {:?}", vm.key(), self.id, verdict);
            return Err(vm);
        }
        vm.set_host_id(Some(self.id));
        log::debug!("vm {} migrated to host #{}", vm.key(), self.id);
        self.vms.insert(vm.key(), vm);
        Ok(())
    }

    /// Advances cloudlet processing of all resident VMs up to `time`.
    ///
    /// Returns the earliest predicted completion time over all VMs, `None` if no VM has work in progress.
    pub fn update_vms_processing(&mut self, time: f64) -> Option<f64> {
        let mut next_event: Option<f64> = None;
        for (key, vm) in self.vms.iter_mut() {
            let mips_share = self.allocation_policy.get_mips_share(*key);
            if let Some(t) = vm.scheduler_mut().update_vm_processing(time, &mips_share) {
                next_event = Some(next_event.map_or(t, |current| current.min(t)));
            }
        }
        next_event
    }

    pub fn vm(&self, key: VmKey) -> Option<&VirtualMachine> {
        self.vms.get(&key)
    }

    pub fn vm_mut(&mut self, key: VmKey) -> Option<&mut VirtualMachine> {
        self.vms.get_mut(&key)
    }

    pub fn vms(&self) -> impl Iterator<Item = &VirtualMachine> {
        self.vms.values()
    }

    pub fn vms_mut(&mut self) -> impl Iterator<Item = &mut VirtualMachine> {
        self.vms.values_mut()
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    pub fn allocation_policy(&self) -> &dyn ComputeAllocationPolicy {
        self.allocation_policy.as_ref()
    }

    pub fn mips_share(&self, key: VmKey) -> Vec<f64> {
        self.allocation_policy.get_mips_share(key)
    }

    pub fn pe_count(&self) -> u32 {
        self.allocation_policy.pe_count()
    }

    pub fn free_pe_count(&self) -> u32 {
        self.allocation_policy.free_pe_count()
    }

    pub fn total_mips(&self) -> f64 {
        self.allocation_policy.total_mips()
    }

    pub fn available_memory(&self) -> u64 {
        self.memory_provisioner.available()
    }

    pub fn available_bandwidth(&self) -> u64 {
        self.bw_provisioner.available()
    }

    pub fn storage(&self) -> u64 {
        self.storage
    }
}
