//! Representations of virtual machine and its characteristics.

use serde::Serialize;

use dslab_core::Id;

use crate::core::common::VmKey;
use crate::core::vm_scheduler::{VmScheduler, VmSchedulerKind};

/// Immutable description of a VM requested by a user.
#[derive(Clone, Debug, Serialize)]
pub struct VmCharacteristics {
    pub id: u32,
    pub user_id: Id,
    /// Number of PEs (virtual CPUs).
    pub pes: u32,
    pub memory: u64,
    pub bandwidth: u64,
    /// Image size.
    pub size: u64,
    /// Priority used by priority-aware allocation policies, never below 1.
    pub priority: u32,
    /// Name of virtual machine monitor, metadata only.
    pub vmm: String,
    /// Scheduler which executes cloudlets inside the VM.
    pub scheduler: VmSchedulerKind,
}

impl VmCharacteristics {
    pub fn new(id: u32, user_id: Id, pes: u32, memory: u64, bandwidth: u64, size: u64) -> Self {
        Self {
            id,
            user_id,
            pes,
            memory,
            bandwidth,
            size,
            priority: 1,
            vmm: "Xen".to_string(),
            scheduler: VmSchedulerKind::TimeShared,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority.max(1);
        self
    }

    pub fn with_scheduler(mut self, scheduler: VmSchedulerKind) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn key(&self) -> VmKey {
        VmKey::new(self.user_id, self.id)
    }
}

/// Represents a VM placed on a host.
///
/// VM is created together with its cloudlet scheduler, so there is no unscheduled VM. The host is referenced by id
/// only and is looked up through the VM provisioner when needed.
pub struct VirtualMachine {
    characteristics: VmCharacteristics,
    host_id: Option<u32>,
    scheduler: Box<dyn VmScheduler>,
}

impl VirtualMachine {
    pub fn new(characteristics: VmCharacteristics) -> Self {
        let scheduler = characteristics.scheduler.build();
        Self {
            characteristics,
            host_id: None,
            scheduler,
        }
    }

    pub fn key(&self) -> VmKey {
        self.characteristics.key()
    }

    pub fn id(&self) -> u32 {
        self.characteristics.id
    }

    pub fn user_id(&self) -> Id {
        self.characteristics.user_id
    }

    pub fn characteristics(&self) -> &VmCharacteristics {
        &self.characteristics
    }

    /// Returns ID of the host where VM resides, `None` while VM is detached.
    pub fn host_id(&self) -> Option<u32> {
        self.host_id
    }

    pub(crate) fn set_host_id(&mut self, host_id: Option<u32>) {
        self.host_id = host_id;
    }

    pub fn scheduler(&self) -> &dyn VmScheduler {
        self.scheduler.as_ref()
    }

    pub fn scheduler_mut(&mut self) -> &mut dyn VmScheduler {
        self.scheduler.as_mut()
    }
}
