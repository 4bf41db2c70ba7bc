//! Placement of VMs onto datacenter hosts.

use std::collections::HashMap;

use crate::core::common::VmKey;
use crate::core::host::Host;
use crate::core::vm::{VirtualMachine, VmCharacteristics};

/// Trait for implementation of VM provisioners.
///
/// Provisioner owns datacenter hosts, decides where a new VM is created and moves VMs between hosts.
pub trait VmProvisioner {
    /// Places VM on some host, returns `false` if no host accepted it or VM is already placed.
    fn allocate_host_for_vm(&mut self, vm: VmCharacteristics) -> bool;

    /// Destroys VM, returning it with its scheduler.
    fn deallocate_host_for_vm(&mut self, key: VmKey) -> Option<VirtualMachine>;

    /// Moves VM to the destination host.
    fn migrate_vm(&mut self, key: VmKey, dest_host_id: u32) -> bool;

    fn host_of(&self, key: VmKey) -> Option<u32>;

    fn hosts(&self) -> &[Host];

    fn hosts_mut(&mut self) -> &mut [Host];

    /// VMs which left their host during a failed migration.
    fn detached_vms_mut(&mut self) -> &mut HashMap<VmKey, VirtualMachine>;

    fn host(&self, host_id: u32) -> Option<&Host> {
        self.hosts().iter().find(|host| host.id == host_id)
    }

    fn host_mut(&mut self, host_id: u32) -> Option<&mut Host> {
        self.hosts_mut().iter_mut().find(|host| host.id == host_id)
    }

    fn vm(&self, key: VmKey) -> Option<&VirtualMachine> {
        self.host(self.host_of(key)?)?.vm(key)
    }

    fn vm_mut(&mut self, key: VmKey) -> Option<&mut VirtualMachine> {
        let host_id = self.host_of(key)?;
        self.host_mut(host_id)?.vm_mut(key)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Greedy provisioner which tries hosts in order of decreasing number of free PEs.
///
/// Free PEs are counted by the provisioner itself from the PEs requested by placed VMs, so time-shared hosts are
/// also filled evenly. Each host is tried at most once per request.
pub struct SimpleVmProvisioner {
    hosts: Vec<Host>,
    free_pes: Vec<i64>,
    vm_table: HashMap<VmKey, usize>,
    used_pes: HashMap<VmKey, u32>,
    detached: HashMap<VmKey, VirtualMachine>,
}

impl SimpleVmProvisioner {
    pub fn new(hosts: Vec<Host>) -> Self {
        let free_pes = hosts.iter().map(|host| host.pe_count() as i64).collect();
        Self {
            hosts,
            free_pes,
            vm_table: HashMap::new(),
            used_pes: HashMap::new(),
            detached: HashMap::new(),
        }
    }

    fn host_index(&self, host_id: u32) -> Option<usize> {
        self.hosts.iter().position(|host| host.id == host_id)
    }

    fn record(&mut self, key: VmKey, idx: usize, pes: u32) {
        self.vm_table.insert(key, idx);
        self.used_pes.insert(key, pes);
        self.free_pes[idx] -= pes as i64;
    }

    fn forget(&mut self, key: VmKey) -> Option<usize> {
        let idx = self.vm_table.remove(&key)?;
        let pes = self.used_pes.remove(&key).unwrap_or(0);
        self.free_pes[idx] += pes as i64;
        Some(idx)
    }

    /// Free PEs per host as seen by the provisioner.
    pub fn free_pes(&self) -> &[i64] {
        &self.free_pes
    }
}

impl VmProvisioner for SimpleVmProvisioner {
    fn allocate_host_for_vm(&mut self, vm: VmCharacteristics) -> bool {
        let key = vm.key();
        if self.vm_table.contains_key(&key) {
            log::warn!("vm {} is already placed on host #{}", key, self.hosts[self.vm_table[&key]].id);
            return false;
        }
        if self.detached.contains_key(&key) {
            log::warn!("vm {} is detached after failed migration, destroy it first", key);
            return false;
        }
        let mut tried = vec![false; self.hosts.len()];
        for _ in 0..self.hosts.len() {
            let mut best: Option<usize> = None;
            for idx in 0..self.hosts.len() {
                if !tried[idx] && best.map_or(true, |b| self.free_pes[idx] > self.free_pes[b]) {
                    best = Some(idx);
                }
            }
            let idx = match best {
                Some(idx) => idx,
                None => break,
            };
            tried[idx] = true;
            if self.hosts[idx].vm_create(vm.clone()).is_success() {
                self.record(key, idx, vm.pes);
                return true;
            }
        }
        log::debug!("no host can accept vm {}", key);
        false
    }

    fn deallocate_host_for_vm(&mut self, key: VmKey) -> Option<VirtualMachine> {
        match self.forget(key) {
            Some(idx) => self.hosts[idx].vm_destroy(key),
            None => self.detached.remove(&key),
        }
    }

    fn migrate_vm(&mut self, key: VmKey, dest_host_id: u32) -> bool {
        let dest = match self.host_index(dest_host_id) {
            Some(idx) => idx,
            None => {
                log::warn!("can't migrate vm {}: no host #{}", key, dest_host_id);
                return false;
            }
        };
        let source = match self.vm_table.get(&key) {
            Some(&idx) => idx,
            None => return false,
        };
        if source == dest {
            return true;
        }
        let vm = match self.hosts[source].vm_migrate_out(key) {
            Some(vm) => vm,
            None => return false,
        };
        self.forget(key);

        let pes = vm.characteristics().pes;
        if self.hosts[dest].free_pe_count() < pes {
            log::warn!("vm {} left detached: host #{} has no free pes", key, dest_host_id);
            self.detached.insert(key, vm);
            return false;
        }
        match self.hosts[dest].vm_migrate_in(vm) {
            Ok(()) => {
                self.record(key, dest, pes);
                true
            }
            Err(vm) => {
                log::warn!("vm {} left detached: host #{} rejected it", key, dest_host_id);
                self.detached.insert(key, vm);
                false
            }
        }
    }

    fn host_of(&self, key: VmKey) -> Option<u32> {
        self.vm_table.get(&key).map(|&idx| self.hosts[idx].id)
    }

    fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    fn hosts_mut(&mut self) -> &mut [Host] {
        &mut self.hosts
    }

    fn detached_vms_mut(&mut self) -> &mut HashMap<VmKey, VirtualMachine> {
        &mut self.detached
    }
}
