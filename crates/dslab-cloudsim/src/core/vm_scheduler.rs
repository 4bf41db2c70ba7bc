//! Schedulers of cloudlets inside a virtual machine.
//!
//! Scheduler keeps submitted cloudlets in four disjoint queues (waiting, executing, paused, finished) and advances
//! executing cloudlets in continuous time using the MIPS share given to the VM by the host allocation policy.

use std::collections::VecDeque;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::config::options::parse_config_value;
use crate::core::error::CloudError;

/// Remaining length (in MI) treated as zero.
const LENGTH_EPSILON: f64 = 1e-6;

/// Selects the scheduler created for a VM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmSchedulerKind {
    SpaceShared,
    TimeShared,
}

impl VmSchedulerKind {
    pub fn build(&self) -> Box<dyn VmScheduler> {
        match self {
            VmSchedulerKind::SpaceShared => Box::new(SpaceSharedVmScheduler::new()),
            VmSchedulerKind::TimeShared => Box::new(TimeSharedVmScheduler::new()),
        }
    }
}

pub fn vm_scheduler_resolver(config_str: &str) -> Result<VmSchedulerKind, CloudError> {
    let (scheduler_name, _) = parse_config_value(config_str);
    match scheduler_name.as_str() {
        "SpaceShared" => Ok(VmSchedulerKind::SpaceShared),
        "TimeShared" => Ok(VmSchedulerKind::TimeShared),
        _ => Err(CloudError::Config(format!("unknown vm scheduler: {}", config_str))),
    }
}

/// Result of resuming a paused cloudlet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResumeOutcome {
    /// Cloudlet is executing again, with predicted finish time if the VM has capacity.
    Resumed { finish_time: Option<f64> },
    /// No free slot, cloudlet was put to the waiting queue.
    Queued,
    NotFound,
}

/// Trait for implementation of cloudlet schedulers.
pub trait VmScheduler {
    /// Submits cloudlet at `time`. File transfer time is converted into extra length using the current capacity.
    /// Cloudlet which can never get enough PEs is failed at once and put to the finished queue.
    ///
    /// Returns the average per-PE capacity if the cloudlet started execution, or 0 if it was queued.
    fn cloudlet_submit(&mut self, cloudlet: Cloudlet, file_transfer_time: f64, time: f64) -> f64;

    /// Advances executing cloudlets up to `time` and stores the new MIPS share.
    ///
    /// Returns the earliest predicted finish time of executing cloudlets, `None` if nothing is executing.
    fn update_vm_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64>;

    /// Cancels cloudlet and returns it. A finished cloudlet is returned unchanged.
    fn cloudlet_cancel(&mut self, cloudlet_id: u32, time: f64) -> Option<Cloudlet>;

    /// Pauses executing or waiting cloudlet.
    fn cloudlet_pause(&mut self, cloudlet_id: u32, time: f64) -> bool;

    fn cloudlet_resume(&mut self, cloudlet_id: u32, time: f64) -> ResumeOutcome;

    /// Returns status of waiting, executing or paused cloudlet.
    fn cloudlet_status(&self, cloudlet_id: u32) -> Option<CloudletStatus>;

    /// Returns the remaining length of active cloudlet summed over its PEs.
    fn remaining_length(&self, cloudlet_id: u32) -> Option<f64>;

    /// Removes one executing cloudlet, used when its VM leaves the host.
    fn migrate_cloudlet(&mut self, time: f64) -> Option<Cloudlet>;

    /// Removes active cloudlet so that it can be submitted elsewhere.
    fn withdraw_cloudlet(&mut self, cloudlet_id: u32, time: f64) -> Option<Cloudlet>;

    /// Removes every cloudlet, unfinished ones are marked as failed.
    fn evict_cloudlets(&mut self, time: f64) -> Vec<Cloudlet>;

    fn take_finished_cloudlets(&mut self) -> Vec<Cloudlet>;

    fn has_finished_cloudlets(&self) -> bool;

    fn running_cloudlets(&self) -> usize;

    fn waiting_cloudlets(&self) -> usize;

    fn paused_cloudlets(&self) -> usize;
}

/// Rule of sharing VM capacity between executing cloudlets.
pub trait SharingRule {
    /// Checks whether a cloudlet with `pes` can start when `used_pes` of `available_pes` are busy.
    fn has_room(available_pes: u32, used_pes: u32, pes: u32) -> bool;

    /// Checks whether a cloudlet with `pes` can ever start on a VM with `available_pes`.
    fn fits(available_pes: u32, pes: u32) -> bool;

    /// Capacity of one PE given to executing cloudlets.
    fn per_pe_capacity(mips_share: &[f64], used_pes: u32) -> f64;
}

fn share_stats(mips_share: &[f64]) -> (f64, u32) {
    let total = mips_share.iter().sum();
    let pes = mips_share.iter().filter(|&&mips| mips > 0.).count() as u32;
    (total, pes)
}

/// One cloudlet per PE: jobs wait until enough PEs are free.
pub struct SpaceSharing;

impl SharingRule for SpaceSharing {
    fn has_room(available_pes: u32, used_pes: u32, pes: u32) -> bool {
        available_pes.saturating_sub(used_pes) >= pes
    }

    fn fits(available_pes: u32, pes: u32) -> bool {
        pes <= available_pes
    }

    fn per_pe_capacity(mips_share: &[f64], _used_pes: u32) -> f64 {
        let (total, pes) = share_stats(mips_share);
        if pes == 0 {
            return 0.;
        }
        total / pes as f64
    }
}

/// All jobs execute at once sharing the VM capacity.
pub struct TimeSharing;

impl SharingRule for TimeSharing {
    fn has_room(_available_pes: u32, _used_pes: u32, _pes: u32) -> bool {
        true
    }

    fn fits(_available_pes: u32, _pes: u32) -> bool {
        true
    }

    fn per_pe_capacity(mips_share: &[f64], used_pes: u32) -> f64 {
        let (total, pes) = share_stats(mips_share);
        let divisor = pes.max(used_pes);
        if divisor == 0 {
            return 0.;
        }
        total / divisor as f64
    }
}

pub type SpaceSharedVmScheduler = QueueingVmScheduler<SpaceSharing>;
pub type TimeSharedVmScheduler = QueueingVmScheduler<TimeSharing>;

////////////////////////////////////////////////////////////////////////////////

/// Cloudlet with scheduler bookkeeping.
struct ScheduledCloudlet {
    cloudlet: Cloudlet,
    /// Remaining length summed over all PEs of the cloudlet.
    remaining: f64,
}

impl ScheduledCloudlet {
    fn new(cloudlet: Cloudlet, extra_length: f64) -> Self {
        let remaining = (cloudlet.length + extra_length) * cloudlet.pes as f64;
        Self { cloudlet, remaining }
    }

    fn id(&self) -> u32 {
        self.cloudlet.id
    }

    fn pes(&self) -> u32 {
        self.cloudlet.pes
    }

    fn is_done(&self) -> bool {
        self.remaining <= LENGTH_EPSILON
    }

    fn predicted_finish(&self, time: f64, capacity: f64) -> f64 {
        time + self.remaining / (capacity * self.pes() as f64)
    }
}

/// Scheduler with four cloudlet queues, parametrized by capacity sharing rule.
pub struct QueueingVmScheduler<R: SharingRule> {
    waiting: VecDeque<ScheduledCloudlet>,
    executing: Vec<ScheduledCloudlet>,
    paused: Vec<ScheduledCloudlet>,
    finished: VecDeque<Cloudlet>,
    mips_share: Vec<f64>,
    used_pes: u32,
    previous_time: f64,
    rule: PhantomData<R>,
}

impl<R: SharingRule> QueueingVmScheduler<R> {
    pub fn new() -> Self {
        Self {
            waiting: VecDeque::new(),
            executing: Vec::new(),
            paused: Vec::new(),
            finished: VecDeque::new(),
            mips_share: Vec::new(),
            used_pes: 0,
            previous_time: 0.,
            rule: PhantomData,
        }
    }

    fn available_pes(&self) -> u32 {
        share_stats(&self.mips_share).1
    }

    fn capacity(&self) -> f64 {
        R::per_pe_capacity(&self.mips_share, self.used_pes)
    }

    fn has_room(&self, pes: u32) -> bool {
        R::has_room(self.available_pes(), self.used_pes, pes)
    }

    fn start(&mut self, mut job: ScheduledCloudlet, time: f64) {
        job.cloudlet.set_status(CloudletStatus::InExec);
        if job.cloudlet.exec_start_time.is_none() {
            job.cloudlet.exec_start_time = Some(time);
        }
        self.used_pes += job.pes();
        self.executing.push(job);
    }

    fn finish(&mut self, mut job: ScheduledCloudlet, time: f64) {
        job.remaining = 0.;
        job.cloudlet.set_status(CloudletStatus::Success);
        job.cloudlet.finish_time = Some(time);
        self.finished.push_back(job.cloudlet);
    }

    fn remove_executing(&mut self, idx: usize) -> ScheduledCloudlet {
        let job = self.executing.remove(idx);
        self.used_pes -= job.pes();
        job
    }

    /// Moves the first waiting cloudlet which fits into free PEs to execution.
    fn promote_waiting(&mut self, time: f64) {
        let available = self.available_pes();
        let position = self
            .waiting
            .iter()
            .position(|job| R::has_room(available, self.used_pes, job.pes()));
        if let Some(job) = position.and_then(|idx| self.waiting.remove(idx)) {
            self.start(job, time);
        }
    }

    fn find_in(queue: &[ScheduledCloudlet], cloudlet_id: u32) -> Option<usize> {
        queue.iter().position(|job| job.id() == cloudlet_id)
    }

    fn find_active(&self, cloudlet_id: u32) -> Option<&ScheduledCloudlet> {
        self.executing
            .iter()
            .chain(self.paused.iter())
            .chain(self.waiting.iter())
            .find(|job| job.id() == cloudlet_id)
    }

    /// Removes active cloudlet from its queue, freeing its PEs if it was executing.
    fn remove_active(&mut self, cloudlet_id: u32) -> Option<ScheduledCloudlet> {
        if let Some(idx) = Self::find_in(&self.executing, cloudlet_id) {
            return Some(self.remove_executing(idx));
        }
        if let Some(idx) = Self::find_in(&self.paused, cloudlet_id) {
            return Some(self.paused.remove(idx));
        }
        let idx = self.waiting.iter().position(|job| job.id() == cloudlet_id)?;
        self.waiting.remove(idx)
    }
}

impl<R: SharingRule> Default for QueueingVmScheduler<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: SharingRule> VmScheduler for QueueingVmScheduler<R> {
    fn cloudlet_submit(&mut self, mut cloudlet: Cloudlet, file_transfer_time: f64, time: f64) -> f64 {
        if !self.mips_share.is_empty() && !R::fits(self.available_pes(), cloudlet.pes) {
            log::warn!(
                "cloudlet #{} needs {} pes but vm has only {}, cloudlet failed",
                cloudlet.id,
                cloudlet.pes,
                self.available_pes()
            );
            cloudlet.set_status(CloudletStatus::Failed);
            cloudlet.finish_time = Some(time);
            self.finished.push_back(cloudlet);
            return 0.;
        }
        let extra_length = self.capacity() * file_transfer_time;
        let mut job = ScheduledCloudlet::new(cloudlet, extra_length);
        if self.has_room(job.pes()) {
            self.start(job, time);
            self.capacity()
        } else {
            job.cloudlet.set_status(CloudletStatus::Queued);
            self.waiting.push_back(job);
            0.
        }
    }

    fn update_vm_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64> {
        self.mips_share = mips_share.to_vec();
        let elapsed = (time - self.previous_time).max(0.);
        self.previous_time = time;

        let capacity = self.capacity();
        for job in self.executing.iter_mut() {
            job.remaining = (job.remaining - capacity * elapsed * job.pes() as f64).max(0.);
            job.cloudlet.actual_cpu_time += elapsed;
        }

        let mut idx = 0;
        while idx < self.executing.len() {
            if self.executing[idx].is_done() {
                let job = self.remove_executing(idx);
                self.finish(job, time);
                self.promote_waiting(time);
                continue;
            }
            idx += 1;
        }

        let capacity = self.capacity();
        if capacity <= 0. {
            return None;
        }
        self.executing
            .iter()
            .map(|job| job.predicted_finish(time, capacity))
            .min_by(|a, b| a.total_cmp(b))
    }

    fn cloudlet_cancel(&mut self, cloudlet_id: u32, time: f64) -> Option<Cloudlet> {
        if let Some(idx) = self.finished.iter().position(|c| c.id == cloudlet_id) {
            return self.finished.remove(idx);
        }
        let was_executing = Self::find_in(&self.executing, cloudlet_id).is_some();
        let mut job = self.remove_active(cloudlet_id)?;
        if job.is_done() {
            job.cloudlet.set_status(CloudletStatus::Success);
            job.cloudlet.finish_time = Some(time);
        } else {
            job.cloudlet.set_status(CloudletStatus::Canceled);
        }
        if was_executing {
            self.promote_waiting(time);
        }
        Some(job.cloudlet)
    }

    fn cloudlet_pause(&mut self, cloudlet_id: u32, time: f64) -> bool {
        if let Some(idx) = Self::find_in(&self.executing, cloudlet_id) {
            let mut job = self.remove_executing(idx);
            if job.is_done() {
                self.finish(job, time);
            } else {
                job.cloudlet.set_status(CloudletStatus::Paused);
                self.paused.push(job);
            }
            self.promote_waiting(time);
            return true;
        }
        if let Some(idx) = self.waiting.iter().position(|job| job.id() == cloudlet_id) {
            if let Some(mut job) = self.waiting.remove(idx) {
                job.cloudlet.set_status(CloudletStatus::Paused);
                self.paused.push(job);
                return true;
            }
        }
        false
    }

    fn cloudlet_resume(&mut self, cloudlet_id: u32, time: f64) -> ResumeOutcome {
        let idx = match Self::find_in(&self.paused, cloudlet_id) {
            Some(idx) => idx,
            None => return ResumeOutcome::NotFound,
        };
        let mut job = self.paused.remove(idx);
        job.cloudlet.set_status(CloudletStatus::Resumed);
        if self.has_room(job.pes()) {
            self.start(job, time);
            let capacity = self.capacity();
            let finish_time = self
                .executing
                .last()
                .filter(|_| capacity > 0.)
                .map(|job| job.predicted_finish(time, capacity));
            ResumeOutcome::Resumed { finish_time }
        } else {
            job.cloudlet.set_status(CloudletStatus::Queued);
            self.waiting.push_back(job);
            ResumeOutcome::Queued
        }
    }

    fn cloudlet_status(&self, cloudlet_id: u32) -> Option<CloudletStatus> {
        self.find_active(cloudlet_id).map(|job| job.cloudlet.status())
    }

    fn remaining_length(&self, cloudlet_id: u32) -> Option<f64> {
        self.find_active(cloudlet_id).map(|job| job.remaining)
    }

    fn migrate_cloudlet(&mut self, time: f64) -> Option<Cloudlet> {
        if self.executing.is_empty() {
            return None;
        }
        let mut job = self.remove_executing(0);
        job.cloudlet.set_status(CloudletStatus::Ready);
        self.promote_waiting(time);
        Some(job.cloudlet)
    }

    fn withdraw_cloudlet(&mut self, cloudlet_id: u32, time: f64) -> Option<Cloudlet> {
        if let Some(idx) = self.finished.iter().position(|c| c.id == cloudlet_id) {
            return self.finished.remove(idx);
        }
        let was_executing = Self::find_in(&self.executing, cloudlet_id).is_some();
        let mut job = self.remove_active(cloudlet_id)?;
        job.cloudlet.set_status(CloudletStatus::Ready);
        if was_executing {
            self.promote_waiting(time);
        }
        Some(job.cloudlet)
    }

    fn evict_cloudlets(&mut self, time: f64) -> Vec<Cloudlet> {
        let mut result: Vec<Cloudlet> = self.finished.drain(..).collect();
        let active = self
            .executing
            .drain(..)
            .chain(self.paused.drain(..))
            .chain(self.waiting.drain(..));
        for mut job in active {
            job.cloudlet.set_status(CloudletStatus::Failed);
            job.cloudlet.finish_time = Some(time);
            result.push(job.cloudlet);
        }
        self.used_pes = 0;
        result
    }

    fn take_finished_cloudlets(&mut self) -> Vec<Cloudlet> {
        self.finished.drain(..).collect()
    }

    fn has_finished_cloudlets(&self) -> bool {
        !self.finished.is_empty()
    }

    fn running_cloudlets(&self) -> usize {
        self.executing.len()
    }

    fn waiting_cloudlets(&self) -> usize {
        self.waiting.len()
    }

    fn paused_cloudlets(&self) -> usize {
        self.paused.len()
    }
}
