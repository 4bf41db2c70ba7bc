//! Standard simulation events.
//!
//! Request events carry `ack` flag, if it is set the datacenter replies with the corresponding `*Ack` event.

// VM EVENTS ///////////////////////////////////////////////////////////////////////////////////////////////////////

pub mod vm {
    use serde::Serialize;

    use dslab_core::Id;

    use crate::core::vm::VmCharacteristics;

    #[derive(Clone, Serialize)]
    pub struct VmCreate {
        pub vm: VmCharacteristics,
        pub ack: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct VmCreateAck {
        pub datacenter_id: Id,
        pub vm_id: u32,
        pub success: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct VmDestroy {
        pub user_id: Id,
        pub vm_id: u32,
        pub ack: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct VmDestroyAck {
        pub datacenter_id: Id,
        pub vm_id: u32,
        pub success: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct VmMigrate {
        pub user_id: Id,
        pub vm_id: u32,
        pub host_id: u32,
        pub ack: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct VmMigrateAck {
        pub datacenter_id: Id,
        pub vm_id: u32,
        pub host_id: u32,
        pub success: bool,
    }
}

// CLOUDLET EVENTS /////////////////////////////////////////////////////////////////////////////////////////////////

pub mod cloudlet {
    use serde::Serialize;

    use dslab_core::Id;

    use crate::core::cloudlet::{Cloudlet, CloudletStatus};

    #[derive(Clone, Serialize)]
    pub struct CloudletSubmit {
        pub cloudlet: Cloudlet,
        pub ack: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct CloudletSubmitAck {
        pub datacenter_id: Id,
        pub cloudlet_id: u32,
        pub success: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct CloudletCancel {
        pub user_id: Id,
        pub vm_id: u32,
        pub cloudlet_id: u32,
        pub ack: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct CloudletCancelAck {
        pub datacenter_id: Id,
        pub cloudlet_id: u32,
        pub success: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct CloudletPause {
        pub user_id: Id,
        pub vm_id: u32,
        pub cloudlet_id: u32,
        pub ack: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct CloudletPauseAck {
        pub datacenter_id: Id,
        pub cloudlet_id: u32,
        pub success: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct CloudletResume {
        pub user_id: Id,
        pub vm_id: u32,
        pub cloudlet_id: u32,
        pub ack: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct CloudletResumeAck {
        pub datacenter_id: Id,
        pub cloudlet_id: u32,
        pub success: bool,
    }

    /// Moves cloudlet to another VM of the same or another datacenter.
    #[derive(Clone, Serialize)]
    pub struct CloudletMove {
        pub user_id: Id,
        pub cloudlet_id: u32,
        pub vm_id: u32,
        pub dest_datacenter: Id,
        pub dest_vm: u32,
        pub ack: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct CloudletMoveAck {
        pub datacenter_id: Id,
        pub cloudlet_id: u32,
        pub dest_vm: u32,
        pub success: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct CloudletStatusRequest {
        pub user_id: Id,
        pub vm_id: u32,
        pub cloudlet_id: u32,
    }

    #[derive(Clone, Serialize)]
    pub struct CloudletStatusReply {
        pub datacenter_id: Id,
        pub cloudlet_id: u32,
        /// `None` if cloudlet is not found among active cloudlets of the VM.
        pub status: Option<CloudletStatus>,
    }

    /// Returns finished (or cancelled) cloudlet to its owner.
    #[derive(Clone, Serialize)]
    pub struct CloudletReturn {
        pub cloudlet: Cloudlet,
    }
}

// FILE EVENTS /////////////////////////////////////////////////////////////////////////////////////////////////////

pub mod file {
    use serde::Serialize;

    use dslab_core::Id;

    use crate::core::storage::{File, StorageError};

    #[derive(Clone, Serialize)]
    pub struct FileAdd {
        pub file: File,
        pub ack: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct FileAddAck {
        pub datacenter_id: Id,
        pub name: String,
        pub error: Option<StorageError>,
    }

    #[derive(Clone, Serialize)]
    pub struct FileDelete {
        pub name: String,
        pub ack: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct FileDeleteAck {
        pub datacenter_id: Id,
        pub name: String,
        pub error: Option<StorageError>,
    }
}

// SIMULATION CONTROL EVENTS ///////////////////////////////////////////////////////////////////////////////////////

pub mod control {
    use serde::Serialize;

    /// Triggers processing update in datacenter.
    #[derive(Clone, Serialize)]
    pub struct DatacenterAdvance {}

    /// Makes broker start requesting VMs.
    #[derive(Clone, Serialize)]
    pub struct BrokerStart {}

    /// Tells entities that no more work will be submitted.
    #[derive(Clone, Serialize)]
    pub struct EndOfSimulation {}
}

// LOAD BALANCER NOTIFICATIONS /////////////////////////////////////////////////////////////////////////////////////

pub mod balancer {
    use serde::Serialize;

    #[derive(Clone, Serialize)]
    pub struct CloudletAllocatedToVm {
        pub vm_id: u32,
    }

    #[derive(Clone, Serialize)]
    pub struct VmFinishedCloudlet {
        pub vm_id: u32,
    }
}
