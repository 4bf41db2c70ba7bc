//! Datacenter component which executes VMs and cloudlets of its users.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;

use dslab_core::cast;
use dslab_core::event::{EventData, EventId};
use dslab_core::{log_debug, log_info, log_warn, Event, EventHandler, Id, SimulationContext};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::common::VmKey;
use crate::core::config::SimulationConfig;
use crate::core::error::CloudError;
use crate::core::events::cloudlet::{
    CloudletCancel, CloudletCancelAck, CloudletMove, CloudletMoveAck, CloudletPause, CloudletPauseAck,
    CloudletResume, CloudletResumeAck, CloudletReturn, CloudletStatusReply, CloudletStatusRequest, CloudletSubmit,
    CloudletSubmitAck,
};
use crate::core::events::control::{DatacenterAdvance, EndOfSimulation};
use crate::core::events::file::{FileAdd, FileAddAck, FileDelete, FileDeleteAck};
use crate::core::events::vm::{VmCreate, VmCreateAck, VmDestroy, VmDestroyAck, VmMigrate, VmMigrateAck};
use crate::core::host::Host;
use crate::core::network::topology::{emit_over_network, NetworkTopology};
use crate::core::storage::{File, FileStorage, StorageError};
use crate::core::vm::{VirtualMachine, VmCharacteristics};
use crate::core::vm_provisioner::VmProvisioner;
use crate::core::vm_scheduler::ResumeOutcome;

/// Static description of a datacenter and its prices.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatacenterCharacteristics {
    pub architecture: String,
    pub os: String,
    pub vmm: String,
    pub time_zone: f64,
    /// Price of one second of cloudlet processing.
    pub cost_per_sec: f64,
    /// Price of one MB of VM memory.
    pub cost_per_mem: f64,
    /// Price of one MB of VM image.
    pub cost_per_storage: f64,
    /// Price of one MB of transferred data.
    pub cost_per_bw: f64,
}

impl Default for DatacenterCharacteristics {
    fn default() -> Self {
        Self {
            architecture: "x86".to_string(),
            os: "Linux".to_string(),
            vmm: "Xen".to_string(),
            time_zone: 0.,
            cost_per_sec: 3.,
            cost_per_mem: 0.05,
            cost_per_storage: 0.001,
            cost_per_bw: 0.,
        }
    }
}

/// Charges accumulated by one user.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UserCharges {
    pub memory: f64,
    pub storage: f64,
    pub data_transfer: f64,
}

impl UserCharges {
    pub fn total(&self) -> f64 {
        self.memory + self.storage + self.data_transfer
    }
}

/// Per-user debts of datacenter users. Charges are only ever added.
#[derive(Clone, Debug, Default)]
pub struct DebtLedger {
    charges: BTreeMap<Id, UserCharges>,
}

impl DebtLedger {
    fn charge_vm(&mut self, user_id: Id, memory: f64, storage: f64) {
        let charges = self.charges.entry(user_id).or_default();
        charges.memory += memory;
        charges.storage += storage;
    }

    fn charge_transfer(&mut self, user_id: Id, amount: f64) {
        self.charges.entry(user_id).or_default().data_transfer += amount;
    }

    pub fn debt(&self, user_id: Id) -> f64 {
        self.charges.get(&user_id).map_or(0., |c| c.total())
    }

    pub fn charges(&self, user_id: Id) -> Option<&UserCharges> {
        self.charges.get(&user_id)
    }

    /// Total debt of every user which was charged at least once.
    pub fn debts(&self) -> BTreeMap<Id, f64> {
        self.charges.iter().map(|(user, c)| (*user, c.total())).collect()
    }
}

pub struct Datacenter {
    pub id: Id,

    characteristics: DatacenterCharacteristics,
    provisioner: Box<dyn VmProvisioner>,
    storage: Vec<Box<dyn FileStorage>>,
    ledger: DebtLedger,

    last_process_time: f64,
    pending_advance: Option<(EventId, f64)>,
    shut_down: bool,

    topology: Rc<RefCell<NetworkTopology>>,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl Datacenter {
    /// Creates datacenter. Fails if its hosts have no processing elements at all.
    pub fn new(
        characteristics: DatacenterCharacteristics,
        provisioner: Box<dyn VmProvisioner>,
        storage: Vec<Box<dyn FileStorage>>,
        topology: Rc<RefCell<NetworkTopology>>,
        ctx: SimulationContext,
        sim_config: Rc<SimulationConfig>,
    ) -> Result<Self, CloudError> {
        let pe_count: u32 = provisioner.hosts().iter().map(|host| host.pe_count()).sum();
        if pe_count == 0 {
            return Err(CloudError::NoProcessingElements(ctx.name().to_string()));
        }
        Ok(Self {
            id: ctx.id(),
            characteristics,
            provisioner,
            storage,
            ledger: DebtLedger::default(),
            last_process_time: 0.,
            pending_advance: None,
            shut_down: false,
            topology,
            ctx,
            sim_config,
        })
    }

    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    pub fn characteristics(&self) -> &DatacenterCharacteristics {
        &self.characteristics
    }

    pub fn hosts(&self) -> &[Host] {
        self.provisioner.hosts()
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.provisioner.host(host_id)
    }

    pub fn vm(&self, user_id: Id, vm_id: u32) -> Option<&VirtualMachine> {
        self.provisioner.vm(VmKey::new(user_id, vm_id))
    }

    pub fn host_of(&self, user_id: Id, vm_id: u32) -> Option<u32> {
        self.provisioner.host_of(VmKey::new(user_id, vm_id))
    }

    pub fn ledger(&self) -> &DebtLedger {
        &self.ledger
    }

    pub fn debts(&self) -> BTreeMap<Id, f64> {
        self.ledger.debts()
    }

    pub fn pe_count(&self) -> u32 {
        self.hosts().iter().map(|host| host.pe_count()).sum()
    }

    pub fn free_pe_count(&self) -> u32 {
        self.hosts().iter().map(|host| host.free_pe_count()).sum()
    }

    /// MIPS rating of the first PE of the first host.
    pub fn mips_of_one_pe(&self) -> f64 {
        self.hosts()
            .iter()
            .find_map(|host| host.allocation_policy().pes().first().map(|pe| pe.mips))
            .unwrap_or(0.)
    }

    /// Datacenter is space-shared if all its hosts use space-shared allocation policies.
    pub fn is_space_shared(&self) -> bool {
        self.hosts().iter().all(|host| host.allocation_policy().is_space_shared())
    }

    pub fn add_storage(&mut self, storage: Box<dyn FileStorage>) {
        self.storage.push(storage);
    }

    pub fn file_size(&self, name: &str) -> Option<u64> {
        self.storage.iter().find_map(|storage| storage.get_file(name).map(|f| f.size))
    }

    pub fn last_process_time(&self) -> f64 {
        self.last_process_time
    }

    /// Set by end of simulation when nothing is running, cleared as soon as new work starts.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    fn send<T: EventData>(&mut self, data: T, dest: Id) {
        emit_over_network(&mut self.ctx, &self.topology.borrow(), data, dest, 0.);
    }

    fn return_cloudlet(&mut self, cloudlet: Cloudlet) {
        log_debug!(
            self.ctx,
            "returning cloudlet #{} ({}) to user #{}",
            cloudlet.id,
            cloudlet.status(),
            cloudlet.user_id
        );
        let user_id = cloudlet.user_id;
        self.send(CloudletReturn { cloudlet }, user_id);
    }

    fn has_active_cloudlets(&self) -> bool {
        self.hosts().iter().any(|host| {
            host.vms().any(|vm| {
                let scheduler = vm.scheduler();
                scheduler.running_cloudlets() + scheduler.waiting_cloudlets() + scheduler.paused_cloudlets() > 0
            })
        })
    }

    // PROCESSING ///////////////////////////////////////////////////////////////////////////////////////////////////

    /// Advances cloudlets on every host up to the current time and re-arms the advance event.
    fn update_cloudlet_processing(&mut self) {
        let now = self.ctx.time();
        let mut next_event: Option<f64> = None;
        for host in self.provisioner.hosts_mut() {
            if let Some(t) = host.update_vms_processing(now) {
                next_event = Some(next_event.map_or(t, |current| current.min(t)));
            }
        }
        self.last_process_time = now;
        if let Some(time) = next_event {
            self.schedule_advance(time);
        }
    }

    /// Keeps a single pending advance event at the earliest known completion time.
    ///
    /// Work arriving after shutdown (from another user or a forwarded cloudlet) brings the datacenter back up.
    fn schedule_advance(&mut self, time: f64) {
        if self.shut_down {
            log_info!(self.ctx, "new work arrived, resuming processing");
            self.shut_down = false;
        }
        let now = self.ctx.time();
        let time = time.max(now + self.sim_config.min_time_between_events);
        if let Some((event_id, pending_time)) = self.pending_advance {
            if pending_time <= time {
                return;
            }
            self.ctx.cancel_event(event_id);
        }
        let event_id = self.ctx.emit_self(DatacenterAdvance {}, time - now);
        log_debug!(self.ctx, "next processing update at {:.3}", time);
        self.pending_advance = Some((event_id, time));
    }

    /// Sends every finished cloudlet back to its owner.
    fn check_cloudlet_completion(&mut self) {
        let mut finished = Vec::new();
        for host in self.provisioner.hosts_mut() {
            for vm in host.vms_mut() {
                if vm.scheduler().has_finished_cloudlets() {
                    finished.extend(vm.scheduler_mut().take_finished_cloudlets());
                }
            }
        }
        for cloudlet in finished {
            self.return_cloudlet(cloudlet);
        }
    }

    /// Recomputes predictions after a change of VM or cloudlet set.
    fn refresh(&mut self) {
        self.update_cloudlet_processing();
        self.check_cloudlet_completion();
    }

    /// Sums transfer time of cloudlet input files which are present in storage.
    fn predict_file_transfer_time(&self, required_files: &[String]) -> f64 {
        required_files
            .iter()
            .filter_map(|name| {
                self.storage.iter().find_map(|storage| {
                    storage
                        .get_file(name)
                        .map(|file| file.size as f64 / storage.max_transfer_rate())
                })
            })
            .sum()
    }

    // VM EVENTS ////////////////////////////////////////////////////////////////////////////////////////////////////

    fn on_vm_create(&mut self, vm: VmCharacteristics, ack: bool, src: Id) {
        self.update_cloudlet_processing();
        let vm_id = vm.id;
        let user_id = vm.user_id;
        let memory_cost = self.characteristics.cost_per_mem * vm.memory as f64;
        let storage_cost = self.characteristics.cost_per_storage * vm.size as f64;

        let success = self.provisioner.allocate_host_for_vm(vm);
        if success {
            self.ledger.charge_vm(user_id, memory_cost, storage_cost);
            log_info!(
                self.ctx,
                "vm #{} of user #{} created on host #{}",
                vm_id,
                user_id,
                self.provisioner.host_of(VmKey::new(user_id, vm_id)).unwrap_or_default()
            );
            self.refresh();
        } else {
            log_debug!(self.ctx, "vm #{} of user #{} can't be created", vm_id, user_id);
        }
        if ack {
            let datacenter_id = self.id;
            self.send(
                VmCreateAck {
                    datacenter_id,
                    vm_id,
                    success,
                },
                src,
            );
        }
    }

    fn on_vm_destroy(&mut self, user_id: Id, vm_id: u32, ack: bool, src: Id) {
        self.update_cloudlet_processing();
        let key = VmKey::new(user_id, vm_id);
        let success = match self.provisioner.deallocate_host_for_vm(key) {
            Some(mut vm) => {
                let now = self.ctx.time();
                for cloudlet in vm.scheduler_mut().evict_cloudlets(now) {
                    self.return_cloudlet(cloudlet);
                }
                log_info!(self.ctx, "vm {} destroyed", key);
                true
            }
            None => {
                log_warn!(self.ctx, "can't destroy unknown vm {}", key);
                false
            }
        };
        self.refresh();
        if ack {
            let datacenter_id = self.id;
            self.send(
                VmDestroyAck {
                    datacenter_id,
                    vm_id,
                    success,
                },
                src,
            );
        }
    }

    fn on_vm_migrate(&mut self, user_id: Id, vm_id: u32, host_id: u32, ack: bool, src: Id) {
        self.update_cloudlet_processing();
        let key = VmKey::new(user_id, vm_id);
        let success = self.provisioner.migrate_vm(key, host_id);
        if success {
            log_info!(self.ctx, "vm {} migrated to host #{}", key, host_id);
        } else {
            log_warn!(self.ctx, "migration of vm {} to host #{} failed", key, host_id);
            let now = self.ctx.time();
            let evicted = match self.provisioner.detached_vms_mut().get_mut(&key) {
                Some(vm) => vm.scheduler_mut().evict_cloudlets(now),
                None => Vec::new(),
            };
            for cloudlet in evicted {
                self.return_cloudlet(cloudlet);
            }
        }
        self.refresh();
        if ack {
            let datacenter_id = self.id;
            self.send(
                VmMigrateAck {
                    datacenter_id,
                    vm_id,
                    host_id,
                    success,
                },
                src,
            );
        }
    }

    // CLOUDLET EVENTS //////////////////////////////////////////////////////////////////////////////////////////////

    /// Hands cloudlet to the scheduler of its VM. Unknown VM fails the cloudlet and returns it to the owner.
    fn submit_cloudlet(&mut self, mut cloudlet: Cloudlet) -> bool {
        let now = self.ctx.time();
        let vm_id = match cloudlet.vm_id {
            Some(vm_id) => vm_id,
            None => {
                log_warn!(self.ctx, "cloudlet #{} is not bound to any vm", cloudlet.id);
                cloudlet.set_status(CloudletStatus::Failed);
                self.return_cloudlet(cloudlet);
                return false;
            }
        };
        let key = VmKey::new(cloudlet.user_id, vm_id);
        if self.provisioner.vm(key).is_none() {
            log_warn!(self.ctx, "cloudlet #{} submitted to unknown vm {}", cloudlet.id, key);
            cloudlet.set_status(CloudletStatus::Failed);
            self.return_cloudlet(cloudlet);
            return false;
        }

        cloudlet.datacenter_id = Some(self.id);
        cloudlet.cost_per_sec = self.characteristics.cost_per_sec;
        cloudlet.cost_per_bw = self.characteristics.cost_per_bw;
        cloudlet.accumulated_bw_cost = self.characteristics.cost_per_bw * cloudlet.file_size as f64;
        cloudlet.submission_time = now;
        let file_transfer_time = self.predict_file_transfer_time(&cloudlet.required_files);
        let cloudlet_id = cloudlet.id;

        if let Some(vm) = self.provisioner.vm_mut(key) {
            let capacity = vm.scheduler_mut().cloudlet_submit(cloudlet, file_transfer_time, now);
            if capacity > 0. {
                log_debug!(self.ctx, "cloudlet #{} started on vm {}", cloudlet_id, key);
            } else {
                log_debug!(self.ctx, "cloudlet #{} queued on vm {}", cloudlet_id, key);
            }
        }
        true
    }

    fn on_cloudlet_submit(&mut self, cloudlet: Cloudlet, ack: bool, src: Id) {
        self.update_cloudlet_processing();
        let cloudlet_id = cloudlet.id;
        let success = if cloudlet.is_finished() {
            log_warn!(
                self.ctx,
                "cloudlet #{} is already finished with status {}",
                cloudlet_id,
                cloudlet.status()
            );
            self.return_cloudlet(cloudlet);
            false
        } else {
            self.submit_cloudlet(cloudlet)
        };
        self.refresh();
        if ack {
            let datacenter_id = self.id;
            self.send(
                CloudletSubmitAck {
                    datacenter_id,
                    cloudlet_id,
                    success,
                },
                src,
            );
        }
    }

    fn on_cloudlet_cancel(&mut self, user_id: Id, vm_id: u32, cloudlet_id: u32, ack: bool, src: Id) {
        self.update_cloudlet_processing();
        let now = self.ctx.time();
        let cancelled = self
            .provisioner
            .vm_mut(VmKey::new(user_id, vm_id))
            .and_then(|vm| vm.scheduler_mut().cloudlet_cancel(cloudlet_id, now));
        let success = match cancelled {
            Some(cloudlet) => {
                self.return_cloudlet(cloudlet);
                true
            }
            None => {
                log_warn!(self.ctx, "can't cancel unknown cloudlet #{}", cloudlet_id);
                false
            }
        };
        self.refresh();
        if ack {
            let datacenter_id = self.id;
            self.send(
                CloudletCancelAck {
                    datacenter_id,
                    cloudlet_id,
                    success,
                },
                src,
            );
        }
    }

    fn on_cloudlet_pause(&mut self, user_id: Id, vm_id: u32, cloudlet_id: u32, ack: bool, src: Id) {
        self.update_cloudlet_processing();
        let now = self.ctx.time();
        let success = self
            .provisioner
            .vm_mut(VmKey::new(user_id, vm_id))
            .map_or(false, |vm| vm.scheduler_mut().cloudlet_pause(cloudlet_id, now));
        if !success {
            log_warn!(self.ctx, "can't pause cloudlet #{}", cloudlet_id);
        }
        self.refresh();
        if ack {
            let datacenter_id = self.id;
            self.send(
                CloudletPauseAck {
                    datacenter_id,
                    cloudlet_id,
                    success,
                },
                src,
            );
        }
    }

    fn on_cloudlet_resume(&mut self, user_id: Id, vm_id: u32, cloudlet_id: u32, ack: bool, src: Id) {
        self.update_cloudlet_processing();
        let now = self.ctx.time();
        let outcome = self
            .provisioner
            .vm_mut(VmKey::new(user_id, vm_id))
            .map_or(ResumeOutcome::NotFound, |vm| {
                vm.scheduler_mut().cloudlet_resume(cloudlet_id, now)
            });
        match outcome {
            ResumeOutcome::Resumed {
                finish_time: Some(finish_time),
            } if finish_time > now => self.schedule_advance(finish_time),
            ResumeOutcome::NotFound => log_warn!(self.ctx, "can't resume cloudlet #{}", cloudlet_id),
            _ => {}
        }
        self.refresh();
        if ack {
            let datacenter_id = self.id;
            self.send(
                CloudletResumeAck {
                    datacenter_id,
                    cloudlet_id,
                    success: outcome != ResumeOutcome::NotFound,
                },
                src,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn on_cloudlet_move(
        &mut self,
        user_id: Id,
        cloudlet_id: u32,
        vm_id: u32,
        dest_datacenter: Id,
        dest_vm: u32,
        ack: bool,
        src: Id,
    ) {
        self.update_cloudlet_processing();
        let now = self.ctx.time();
        let withdrawn = self
            .provisioner
            .vm_mut(VmKey::new(user_id, vm_id))
            .and_then(|vm| vm.scheduler_mut().withdraw_cloudlet(cloudlet_id, now));
        let success = match withdrawn {
            None => {
                log_warn!(self.ctx, "can't move unknown cloudlet #{}", cloudlet_id);
                false
            }
            Some(cloudlet) if cloudlet.status() == CloudletStatus::Success => {
                self.return_cloudlet(cloudlet);
                false
            }
            Some(mut cloudlet) => {
                cloudlet.vm_id = Some(dest_vm);
                if dest_datacenter == self.id {
                    self.submit_cloudlet(cloudlet)
                } else {
                    log_debug!(
                        self.ctx,
                        "cloudlet #{} forwarded to datacenter #{}",
                        cloudlet_id,
                        dest_datacenter
                    );
                    self.send(CloudletSubmit { cloudlet, ack: false }, dest_datacenter);
                    true
                }
            }
        };
        self.refresh();
        if ack {
            let datacenter_id = self.id;
            self.send(
                CloudletMoveAck {
                    datacenter_id,
                    cloudlet_id,
                    dest_vm,
                    success,
                },
                src,
            );
        }
    }

    fn on_cloudlet_status_request(&mut self, user_id: Id, vm_id: u32, cloudlet_id: u32, src: Id) {
        let status = self
            .provisioner
            .vm(VmKey::new(user_id, vm_id))
            .and_then(|vm| vm.scheduler().cloudlet_status(cloudlet_id));
        let datacenter_id = self.id;
        self.send(
            CloudletStatusReply {
                datacenter_id,
                cloudlet_id,
                status,
            },
            src,
        );
    }

    // FILE EVENTS //////////////////////////////////////////////////////////////////////////////////////////////////

    /// Stores file in the first storage with enough space.
    fn store_file(&mut self, file: File) -> Result<f64, StorageError> {
        if self.storage.iter().any(|storage| storage.get_file(&file.name).is_some()) {
            return Err(StorageError::AlreadyExists(file.name));
        }
        let mut result = Err(StorageError::NotEnoughSpace {
            name: file.name.clone(),
            available: 0,
        });
        for storage in self.storage.iter_mut() {
            result = storage.add_file(file.clone());
            if result.is_ok() {
                break;
            }
        }
        result
    }

    fn on_file_add(&mut self, file: File, ack: bool, src: Id) {
        let name = file.name.clone();
        let transfer_cost = self.characteristics.cost_per_bw * file.size as f64;
        let result = self.store_file(file);
        match &result {
            Ok(time) => {
                self.ledger.charge_transfer(src, transfer_cost);
                log_debug!(self.ctx, "file {} stored in {:.3} s", name, time);
            }
            Err(e) => log_warn!(self.ctx, "can't store file: {}", e),
        }
        if ack {
            let datacenter_id = self.id;
            self.send(
                FileAddAck {
                    datacenter_id,
                    name,
                    error: result.err(),
                },
                src,
            );
        }
    }

    fn on_file_delete(&mut self, name: String, ack: bool, src: Id) {
        let mut result = Err(StorageError::NotFound(name.clone()));
        for storage in self.storage.iter_mut() {
            if storage.get_file(&name).is_some() {
                result = storage.delete_file(&name).map(|_| ());
                break;
            }
        }
        if let Err(e) = &result {
            log_warn!(self.ctx, "can't delete file: {}", e);
        }
        if ack {
            let datacenter_id = self.id;
            self.send(
                FileDeleteAck {
                    datacenter_id,
                    name,
                    error: result.err(),
                },
                src,
            );
        }
    }

    // CONTROL EVENTS ///////////////////////////////////////////////////////////////////////////////////////////////

    fn on_advance(&mut self) {
        self.pending_advance = None;
        self.refresh();
    }

    fn on_end_of_simulation(&mut self, src: Id) {
        if self.has_active_cloudlets() {
            log_debug!(
                self.ctx,
                "end of simulation from #{} ignored: cloudlets are still active",
                src
            );
            return;
        }
        if let Some((event_id, _)) = self.pending_advance.take() {
            self.ctx.cancel_event(event_id);
        }
        self.shut_down = true;
        log_info!(self.ctx, "shut down");
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        let src = event.src;
        cast!(match event.data {
            VmCreate { vm, ack } => {
                self.on_vm_create(vm, ack, src);
            }
            VmDestroy { user_id, vm_id, ack } => {
                self.on_vm_destroy(user_id, vm_id, ack, src);
            }
            VmMigrate {
                user_id,
                vm_id,
                host_id,
                ack,
            } => {
                self.on_vm_migrate(user_id, vm_id, host_id, ack, src);
            }
            CloudletSubmit { cloudlet, ack } => {
                self.on_cloudlet_submit(cloudlet, ack, src);
            }
            CloudletCancel {
                user_id,
                vm_id,
                cloudlet_id,
                ack,
            } => {
                self.on_cloudlet_cancel(user_id, vm_id, cloudlet_id, ack, src);
            }
            CloudletPause {
                user_id,
                vm_id,
                cloudlet_id,
                ack,
            } => {
                self.on_cloudlet_pause(user_id, vm_id, cloudlet_id, ack, src);
            }
            CloudletResume {
                user_id,
                vm_id,
                cloudlet_id,
                ack,
            } => {
                self.on_cloudlet_resume(user_id, vm_id, cloudlet_id, ack, src);
            }
            CloudletMove {
                user_id,
                cloudlet_id,
                vm_id,
                dest_datacenter,
                dest_vm,
                ack,
            } => {
                self.on_cloudlet_move(user_id, cloudlet_id, vm_id, dest_datacenter, dest_vm, ack, src);
            }
            CloudletStatusRequest {
                user_id,
                vm_id,
                cloudlet_id,
            } => {
                self.on_cloudlet_status_request(user_id, vm_id, cloudlet_id, src);
            }
            FileAdd { file, ack } => {
                self.on_file_add(file, ack, src);
            }
            FileDelete { name, ack } => {
                self.on_file_delete(name, ack, src);
            }
            DatacenterAdvance {} => {
                self.on_advance();
            }
            EndOfSimulation {} => {
                self.on_end_of_simulation(src);
            }
        })
    }
}
