//! Broker which acts on behalf of a cloud user: creates VMs in datacenters and runs cloudlets on them.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::rc::Rc;

use indexmap::IndexMap;

use dslab_core::cast;
use dslab_core::event::EventData;
use dslab_core::{log_debug, log_error, log_info, log_warn, Event, EventHandler, Id, SimulationContext};

use crate::core::cloudlet::Cloudlet;
use crate::core::config::SimulationConfig;
use crate::core::events::balancer::{CloudletAllocatedToVm, VmFinishedCloudlet};
use crate::core::events::cloudlet::{CloudletReturn, CloudletSubmit};
use crate::core::events::control::{BrokerStart, EndOfSimulation};
use crate::core::events::vm::{VmCreate, VmCreateAck, VmDestroy};
use crate::core::load_balancer::VmLoadBalancer;
use crate::core::network::topology::{emit_over_network, NetworkTopology};
use crate::core::vm::VmCharacteristics;

pub struct DatacenterBroker {
    pub id: Id,

    vms: Vec<VmCharacteristics>,
    datacenters: Vec<Id>,
    /// Index of datacenter receiving the current round of VM requests.
    current_datacenter: usize,
    pending_acks: HashSet<u32>,
    /// VM id -> datacenter id, in order of creation.
    created_vms: IndexMap<u32, Id>,

    waiting_cloudlets: VecDeque<Cloudlet>,
    submitted_cloudlets: usize,
    received_cloudlets: Vec<Cloudlet>,
    allocation_counts: BTreeMap<u32, u32>,
    submission_started: bool,
    finished: bool,

    balancer: Box<dyn VmLoadBalancer>,
    listeners: Vec<Id>,

    topology: Rc<RefCell<NetworkTopology>>,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl DatacenterBroker {
    pub fn new(
        balancer: Box<dyn VmLoadBalancer>,
        topology: Rc<RefCell<NetworkTopology>>,
        ctx: SimulationContext,
        sim_config: Rc<SimulationConfig>,
    ) -> Self {
        Self {
            id: ctx.id(),
            vms: Vec::new(),
            datacenters: Vec::new(),
            current_datacenter: 0,
            pending_acks: HashSet::new(),
            created_vms: IndexMap::new(),
            waiting_cloudlets: VecDeque::new(),
            submitted_cloudlets: 0,
            received_cloudlets: Vec::new(),
            allocation_counts: BTreeMap::new(),
            submission_started: false,
            finished: false,
            balancer,
            listeners: Vec::new(),
            topology,
            ctx,
            sim_config,
        }
    }

    /// Datacenters are tried in the order they are added.
    pub fn add_datacenter(&mut self, datacenter_id: Id) {
        if !self.datacenters.contains(&datacenter_id) {
            self.datacenters.push(datacenter_id);
        }
    }

    /// Adds VMs to create. VMs are owned by this broker regardless of their `user_id`.
    pub fn submit_vm_list(&mut self, vms: Vec<VmCharacteristics>) {
        for mut vm in vms {
            vm.user_id = self.id;
            self.vms.push(vm);
        }
    }

    /// Adds cloudlets to run. Cloudlets with preset `vm_id` are bound to that VM.
    pub fn submit_cloudlet_list(&mut self, cloudlets: Vec<Cloudlet>) {
        for mut cloudlet in cloudlets {
            cloudlet.user_id = self.id;
            self.waiting_cloudlets.push_back(cloudlet);
        }
    }

    pub fn bind_cloudlet_to_vm(&mut self, cloudlet_id: u32, vm_id: u32) -> bool {
        match self.waiting_cloudlets.iter_mut().find(|c| c.id == cloudlet_id) {
            Some(cloudlet) => {
                cloudlet.vm_id = Some(vm_id);
                true
            }
            None => false,
        }
    }

    /// Registers component which is notified about cloudlet allocations.
    pub fn add_listener(&mut self, listener: Id) {
        self.listeners.push(listener);
    }

    /// Schedules the start of VM creation after configured delay.
    pub fn start(&mut self) {
        self.ctx.emit_self(BrokerStart {}, self.sim_config.broker_start_delay);
    }

    pub fn created_vms(&self) -> &IndexMap<u32, Id> {
        &self.created_vms
    }

    pub fn vm_datacenter(&self, vm_id: u32) -> Option<Id> {
        self.created_vms.get(&vm_id).copied()
    }

    pub fn received_cloudlets(&self) -> &[Cloudlet] {
        &self.received_cloudlets
    }

    pub fn waiting_cloudlets(&self) -> usize {
        self.waiting_cloudlets.len()
    }

    /// Number of cloudlets sent to each VM.
    pub fn allocation_counts(&self) -> &BTreeMap<u32, u32> {
        &self.allocation_counts
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn send<T: EventData>(&mut self, data: T, dest: Id) {
        emit_over_network(&mut self.ctx, &self.topology.borrow(), data, dest, 0.);
    }

    fn notify_listeners<T: EventData + Clone>(&mut self, data: T) {
        for listener in self.listeners.clone() {
            self.send(data.clone(), listener);
        }
    }

    // VM CREATION //////////////////////////////////////////////////////////////////////////////////////////////////

    fn on_start(&mut self) {
        log_info!(self.ctx, "started with {} vms, {} cloudlets", self.vms.len(), self.waiting_cloudlets.len());
        if self.datacenters.is_empty() {
            log_error!(self.ctx, "no datacenters to create vms in");
            self.abort();
            return;
        }
        self.request_vms();
    }

    /// Requests every VM which is not created yet from the current datacenter.
    fn request_vms(&mut self) {
        let datacenter_id = self.datacenters[self.current_datacenter];
        let missing: Vec<VmCharacteristics> = self
            .vms
            .iter()
            .filter(|vm| !self.created_vms.contains_key(&vm.id))
            .cloned()
            .collect();
        if missing.is_empty() {
            self.on_vm_creation_done();
            return;
        }
        log_debug!(
            self.ctx,
            "requesting {} vms from datacenter #{}",
            missing.len(),
            datacenter_id
        );
        for vm in missing {
            self.pending_acks.insert(vm.id);
            self.send(VmCreate { vm, ack: true }, datacenter_id);
        }
    }

    fn on_vm_create_ack(&mut self, datacenter_id: Id, vm_id: u32, success: bool) {
        if !self.pending_acks.remove(&vm_id) {
            log_warn!(self.ctx, "unexpected ack for vm #{} from datacenter #{}", vm_id, datacenter_id);
            return;
        }
        if success {
            log_debug!(self.ctx, "vm #{} created in datacenter #{}", vm_id, datacenter_id);
            self.created_vms.insert(vm_id, datacenter_id);
            if self.submission_started {
                self.submit_waiting_cloudlets();
            }
        } else {
            log_debug!(self.ctx, "vm #{} was rejected by datacenter #{}", vm_id, datacenter_id);
        }
        if !self.pending_acks.is_empty() {
            return;
        }
        if self.created_vms.len() < self.vms.len() && self.current_datacenter + 1 < self.datacenters.len() {
            self.current_datacenter += 1;
            self.request_vms();
        } else {
            self.on_vm_creation_done();
        }
    }

    fn on_vm_creation_done(&mut self) {
        if self.created_vms.is_empty() {
            log_error!(self.ctx, "no vm was created in any of {} datacenters", self.datacenters.len());
            self.abort();
            return;
        }
        log_info!(self.ctx, "{} of {} vms created", self.created_vms.len(), self.vms.len());
        self.submission_started = true;
        self.submit_waiting_cloudlets();
        self.check_completion();
    }

    // CLOUDLETS ////////////////////////////////////////////////////////////////////////////////////////////////////

    fn select_vm(&mut self, cloudlet: &Cloudlet, vm_ids: &[u32]) -> Option<u32> {
        if let Some(vm_id) = cloudlet.vm_id {
            if self.created_vms.contains_key(&vm_id) {
                return Some(vm_id);
            }
            log_warn!(
                self.ctx,
                "cloudlet #{} is bound to vm #{} which was not created",
                cloudlet.id,
                vm_id
            );
        }
        self.balancer.next_available_vm(vm_ids)
    }

    /// Sends waiting cloudlets to VMs chosen by the balancer. Cloudlets without VM stay in the queue.
    fn submit_waiting_cloudlets(&mut self) {
        let vm_ids: Vec<u32> = self.created_vms.keys().copied().collect();
        let mut still_waiting = VecDeque::new();
        while let Some(mut cloudlet) = self.waiting_cloudlets.pop_front() {
            let vm_id = match self.select_vm(&cloudlet, &vm_ids) {
                Some(vm_id) => vm_id,
                None => {
                    still_waiting.push_back(cloudlet);
                    continue;
                }
            };
            let datacenter_id = self.created_vms[&vm_id];
            log_debug!(
                self.ctx,
                "sending cloudlet #{} to vm #{} in datacenter #{}",
                cloudlet.id,
                vm_id,
                datacenter_id
            );
            cloudlet.vm_id = Some(vm_id);
            self.send(CloudletSubmit { cloudlet, ack: false }, datacenter_id);
            self.submitted_cloudlets += 1;
            *self.allocation_counts.entry(vm_id).or_insert(0) += 1;
            self.balancer.on_cloudlet_allocated(vm_id);
            self.notify_listeners(CloudletAllocatedToVm { vm_id });
        }
        if !still_waiting.is_empty() {
            log_debug!(self.ctx, "{} cloudlets wait for a free vm", still_waiting.len());
        }
        self.waiting_cloudlets = still_waiting;
    }

    fn on_cloudlet_return(&mut self, cloudlet: Cloudlet) {
        log_debug!(
            self.ctx,
            "cloudlet #{} returned with status {}",
            cloudlet.id,
            cloudlet.status()
        );
        if let Some(vm_id) = cloudlet.vm_id {
            self.balancer.on_cloudlet_finished(vm_id);
            self.notify_listeners(VmFinishedCloudlet { vm_id });
        }
        self.received_cloudlets.push(cloudlet);
        if self.submission_started {
            self.submit_waiting_cloudlets();
        }
        self.check_completion();
    }

    fn check_completion(&mut self) {
        if self.finished || !self.waiting_cloudlets.is_empty() {
            return;
        }
        if self.received_cloudlets.len() < self.submitted_cloudlets {
            return;
        }
        log_info!(
            self.ctx,
            "all {} cloudlets finished, destroying vms",
            self.received_cloudlets.len()
        );
        let user_id = self.id;
        for (vm_id, datacenter_id) in self.created_vms.clone() {
            self.send(
                VmDestroy {
                    user_id,
                    vm_id,
                    ack: false,
                },
                datacenter_id,
            );
        }
        self.end_simulation();
    }

    fn abort(&mut self) {
        log_error!(self.ctx, "aborting: no vms to run cloudlets on");
        self.end_simulation();
    }

    fn end_simulation(&mut self) {
        self.finished = true;
        for datacenter_id in self.datacenters.clone() {
            self.send(EndOfSimulation {}, datacenter_id);
        }
    }
}

impl EventHandler for DatacenterBroker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            BrokerStart {} => {
                self.on_start();
            }
            VmCreateAck {
                datacenter_id,
                vm_id,
                success,
            } => {
                self.on_vm_create_ack(datacenter_id, vm_id, success);
            }
            CloudletReturn { cloudlet } => {
                self.on_cloudlet_return(cloudlet);
            }
        })
    }
}
