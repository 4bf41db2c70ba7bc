use std::fmt::{Display, Formatter};

use serde::Serialize;

use dslab_core::Id;

/// Identifies a virtual machine inside a datacenter: VM ids are only unique per owning user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VmKey {
    pub user_id: Id,
    pub vm_id: u32,
}

impl VmKey {
    pub fn new(user_id: Id, vm_id: u32) -> Self {
        Self { user_id, vm_id }
    }
}

impl Display for VmKey {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "#{} (user #{})", self.vm_id, self.user_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationVerdict {
    AlreadyExists,
    NotEnoughBandwidth,
    NotEnoughMemory,
    NotEnoughPes,
    Success,
}

impl AllocationVerdict {
    pub fn is_success(&self) -> bool {
        *self == AllocationVerdict::Success
    }
}
