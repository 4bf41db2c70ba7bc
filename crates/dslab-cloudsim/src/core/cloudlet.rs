//! Cloudlet (a job executed inside a VM) and its status.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use dslab_core::Id;

/// Status of cloudlet.
///
/// `Success`, `Failed` and `Canceled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CloudletStatus {
    Created,
    Ready,
    Queued,
    InExec,
    Paused,
    Resumed,
    Success,
    Failed,
    Canceled,
}

impl CloudletStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CloudletStatus::Success | CloudletStatus::Failed | CloudletStatus::Canceled
        )
    }

    /// Checks whether a scheduler may move a cloudlet from this status to `next`.
    pub fn can_transition_to(&self, next: CloudletStatus) -> bool {
        use CloudletStatus::*;
        if *self == next {
            return true;
        }
        match self {
            Created | Ready => matches!(next, Ready | Queued | InExec | Canceled | Failed),
            Queued => matches!(next, Ready | InExec | Paused | Success | Canceled | Failed),
            InExec => matches!(next, Ready | Queued | Success | Paused | Canceled | Failed),
            Paused => matches!(next, Ready | Resumed | InExec | Queued | Success | Canceled | Failed),
            Resumed => matches!(next, Ready | InExec | Queued | Canceled | Failed),
            Success | Failed | Canceled => false,
        }
    }
}

impl Display for CloudletStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CloudletStatus::Created => write!(f, "created"),
            CloudletStatus::Ready => write!(f, "ready"),
            CloudletStatus::Queued => write!(f, "queued"),
            CloudletStatus::InExec => write!(f, "in_exec"),
            CloudletStatus::Paused => write!(f, "paused"),
            CloudletStatus::Resumed => write!(f, "resumed"),
            CloudletStatus::Success => write!(f, "success"),
            CloudletStatus::Failed => write!(f, "failed"),
            CloudletStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Represents a job with fixed length in million instructions (MI).
///
/// Cloudlet is created by a broker, travels to a datacenter inside events and is executed by the scheduler of
/// its target VM. Cost fields are filled by the datacenter which executes the cloudlet.
#[derive(Clone, Debug, Serialize)]
pub struct Cloudlet {
    pub id: u32,
    pub user_id: Id,
    /// Length of the job on one PE in MI.
    pub length: f64,
    /// Number of PEs required by the job.
    pub pes: u32,
    /// Input size in bytes.
    pub file_size: u64,
    /// Output size in bytes.
    pub output_size: u64,
    /// Names of files which must be read from datacenter storage before execution.
    pub required_files: Vec<String>,
    /// Target VM, `None` while the cloudlet is not bound yet.
    pub vm_id: Option<u32>,
    pub datacenter_id: Option<Id>,
    pub cost_per_sec: f64,
    pub cost_per_bw: f64,
    pub accumulated_bw_cost: f64,
    pub submission_time: f64,
    pub exec_start_time: Option<f64>,
    pub finish_time: Option<f64>,
    pub actual_cpu_time: f64,
    status: CloudletStatus,
}

impl Cloudlet {
    pub fn new(id: u32, user_id: Id, length: f64, pes: u32, file_size: u64, output_size: u64) -> Self {
        Self {
            id,
            user_id,
            length,
            pes: pes.max(1),
            file_size,
            output_size,
            required_files: Vec::new(),
            vm_id: None,
            datacenter_id: None,
            cost_per_sec: 0.,
            cost_per_bw: 0.,
            accumulated_bw_cost: 0.,
            submission_time: 0.,
            exec_start_time: None,
            finish_time: None,
            actual_cpu_time: 0.,
            status: CloudletStatus::Created,
        }
    }

    pub fn status(&self) -> CloudletStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves cloudlet to the new status. Only schedulers and the owning datacenter are expected to call it.
    pub(crate) fn set_status(&mut self, status: CloudletStatus) {
        debug_assert!(
            self.status.can_transition_to(status),
            "cloudlet #{}: illegal transition {} -> {}",
            self.id,
            self.status,
            status
        );
        self.status = status;
    }

    /// Total price of executing the cloudlet: data transfer plus processing time.
    pub fn processing_cost(&self) -> f64 {
        self.accumulated_bw_cost + self.cost_per_sec * self.actual_cpu_time
    }
}
