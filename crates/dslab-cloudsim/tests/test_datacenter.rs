use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;

use dslab_core::cast;
use dslab_core::simulation::Simulation;
use dslab_core::{Event, EventHandler, Id, SimulationContext};

use dslab_cloudsim::core::allocation_policy::{make_pes, SpaceSharedAllocationPolicy};
use dslab_cloudsim::core::cloudlet::{Cloudlet, CloudletStatus};
use dslab_cloudsim::core::config::SimulationConfig;
use dslab_cloudsim::core::datacenter::DatacenterCharacteristics;
use dslab_cloudsim::core::error::CloudError;
use dslab_cloudsim::core::events::cloudlet::{
    CloudletCancel, CloudletCancelAck, CloudletMove, CloudletMoveAck, CloudletPause, CloudletPauseAck, CloudletResume,
    CloudletResumeAck, CloudletStatusReply, CloudletStatusRequest,
};
use dslab_cloudsim::core::events::file::{FileAdd, FileAddAck, FileDelete, FileDeleteAck};
use dslab_cloudsim::core::events::vm::{VmMigrate, VmMigrateAck};
use dslab_cloudsim::core::host::Host;
use dslab_cloudsim::core::load_balancer::{RoundRobinVmLoadBalancer, ThrottledVmLoadBalancer};
use dslab_cloudsim::core::network::topology::NetworkTopology;
use dslab_cloudsim::core::storage::{File, SanStorage, StorageError};
use dslab_cloudsim::core::vm::VmCharacteristics;
use dslab_cloudsim::core::vm_scheduler::VmSchedulerKind;
use dslab_cloudsim::custom_component::CustomComponent;
use dslab_cloudsim::simulation::CloudSimulation;

fn name_wrapper(file_name: &str) -> String {
    format!("test-configs/{}", file_name)
}

fn space_shared_host(id: u32, pes: u32) -> Host {
    Host::new(
        id,
        4096,
        10000,
        1000000,
        Box::new(SpaceSharedAllocationPolicy::new(make_pes(pes, 1000.))),
    )
}

fn vm(id: u32) -> VmCharacteristics {
    VmCharacteristics::new(id, 0, 1, 512, 100, 1000)
}

fn cloudlet(id: u32, length: f64) -> Cloudlet {
    Cloudlet::new(id, 0, length, 1, 300, 300)
}

fn finish_times(cloudlets: &[Cloudlet]) -> Vec<(u32, Option<f64>)> {
    let mut result: Vec<_> = cloudlets.iter().map(|c| (c.id, c.finish_time)).collect();
    result.sort_by_key(|(id, _)| *id);
    result
}

/// Requests sent by [`Operator`] at fixed times.
#[derive(Clone)]
enum Action {
    Pause(u32),
    Resume(u32),
    Cancel(u32),
    Status(u32),
    AddFile(File),
    DeleteFile(String),
    Migrate {
        vm_id: u32,
        host_id: u32,
    },
    Move {
        cloudlet_id: u32,
        vm_id: u32,
        dest_datacenter: Id,
        dest_vm: u32,
    },
}

/// Component which manipulates cloudlets of a broker and records replies of the datacenter.
struct Operator {
    datacenter: Id,
    user: Id,
    plan: Vec<(f64, Action)>,
    replies: Vec<(f64, String)>,
    statuses: Vec<(f64, Option<CloudletStatus>)>,
    file_errors: Vec<Option<StorageError>>,
    ctx: SimulationContext,
}

impl CustomComponent for Operator {
    fn new(ctx: SimulationContext, _topology: Rc<RefCell<NetworkTopology>>) -> Self {
        Self {
            datacenter: 0,
            user: 0,
            plan: Vec::new(),
            replies: Vec::new(),
            statuses: Vec::new(),
            file_errors: Vec::new(),
            ctx,
        }
    }

    fn init(&mut self) {
        let (dc, user) = (self.datacenter, self.user);
        for (time, action) in self.plan.clone() {
            match action {
                Action::Pause(cloudlet_id) => {
                    let request = CloudletPause {
                        user_id: user,
                        vm_id: 0,
                        cloudlet_id,
                        ack: true,
                    };
                    self.ctx.emit(request, dc, time)
                }
                Action::Resume(cloudlet_id) => {
                    let request = CloudletResume {
                        user_id: user,
                        vm_id: 0,
                        cloudlet_id,
                        ack: true,
                    };
                    self.ctx.emit(request, dc, time)
                }
                Action::Cancel(cloudlet_id) => {
                    let request = CloudletCancel {
                        user_id: user,
                        vm_id: 0,
                        cloudlet_id,
                        ack: true,
                    };
                    self.ctx.emit(request, dc, time)
                }
                Action::Status(cloudlet_id) => {
                    let request = CloudletStatusRequest {
                        user_id: user,
                        vm_id: 0,
                        cloudlet_id,
                    };
                    self.ctx.emit(request, dc, time)
                }
                Action::AddFile(file) => self.ctx.emit(FileAdd { file, ack: true }, dc, time),
                Action::DeleteFile(name) => self.ctx.emit(FileDelete { name, ack: true }, dc, time),
                Action::Migrate { vm_id, host_id } => {
                    let request = VmMigrate {
                        user_id: user,
                        vm_id,
                        host_id,
                        ack: true,
                    };
                    self.ctx.emit(request, dc, time)
                }
                Action::Move {
                    cloudlet_id,
                    vm_id,
                    dest_datacenter,
                    dest_vm,
                } => {
                    let request = CloudletMove {
                        user_id: user,
                        cloudlet_id,
                        vm_id,
                        dest_datacenter,
                        dest_vm,
                        ack: true,
                    };
                    self.ctx.emit(request, dc, time)
                }
            };
        }
    }
}

impl EventHandler for Operator {
    fn on(&mut self, event: Event) {
        let time = self.ctx.time();
        cast!(match event.data {
            CloudletPauseAck { success, .. } => {
                self.replies.push((time, format!("pause {}", success)));
            }
            CloudletResumeAck { success, .. } => {
                self.replies.push((time, format!("resume {}", success)));
            }
            CloudletCancelAck { success, .. } => {
                self.replies.push((time, format!("cancel {}", success)));
            }
            CloudletStatusReply { status, .. } => {
                self.statuses.push((time, status));
            }
            FileAddAck { error, .. } => {
                self.file_errors.push(error);
            }
            FileDeleteAck { error, .. } => {
                self.file_errors.push(error);
            }
            VmMigrateAck { success, .. } => {
                self.replies.push((time, format!("migrate {}", success)));
            }
            CloudletMoveAck { success, .. } => {
                self.replies.push((time, format!("move {}", success)));
            }
        })
    }
}

#[test]
// Datacenter with one host of 2 PEs runs 2 single-PE VMs with space-shared schedulers. Round robin puts cloudlets
// 0 and 2 on the first VM, cloudlet 1 on the second one.
fn test_broker_runs_cloudlets() {
    let sim = Simulation::new(123);
    let sim_config = SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap();
    let mut cloud_sim = CloudSimulation::new(sim, sim_config);
    cloud_sim.build_from_config().unwrap();

    let dc = cloud_sim.datacenter_ids()[0];
    let broker_id = cloud_sim.broker_ids()[0];
    let broker = cloud_sim.broker(broker_id);
    broker.borrow_mut().submit_vm_list(
        (0..2)
            .map(|id| vm(id).with_scheduler(VmSchedulerKind::SpaceShared))
            .collect(),
    );
    broker
        .borrow_mut()
        .submit_cloudlet_list(vec![cloudlet(0, 1000.), cloudlet(1, 2000.), cloudlet(2, 1000.)]);
    cloud_sim.start_brokers();
    cloud_sim.step_until_no_events();

    let broker = broker.borrow();
    assert!(broker.is_finished());
    assert_eq!(broker.created_vms().len(), 2);
    assert_eq!(broker.vm_datacenter(1), Some(dc));
    assert_eq!(broker.allocation_counts().get(&0), Some(&2));
    assert_eq!(
        finish_times(broker.received_cloudlets()),
        vec![(0, Some(1.)), (1, Some(2.)), (2, Some(2.))]
    );
    for cloudlet in broker.received_cloudlets() {
        assert_eq!(cloudlet.status(), CloudletStatus::Success);
        assert_eq!(cloudlet.user_id, broker_id);
        assert_eq!(cloudlet.datacenter_id, Some(dc));
    }
    let third = broker.received_cloudlets().iter().find(|c| c.id == 2).unwrap();
    assert_eq!(third.exec_start_time, Some(1.));
    assert_relative_eq!(third.processing_cost(), 3.);

    // every VM is destroyed at the end
    let datacenter = cloud_sim.datacenter(dc);
    assert!(datacenter.borrow().is_shut_down());
    assert!(datacenter.borrow().vm(broker_id, 0).is_none());
    assert_eq!(cloud_sim.current_time(), 2.);
}

#[test]
// Memory and image of each created VM are charged once.
fn test_vm_charges() {
    let sim = Simulation::new(123);
    let sim_config = SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap();
    let mut cloud_sim = CloudSimulation::new(sim, sim_config);
    cloud_sim.build_from_config().unwrap();

    let dc = cloud_sim.datacenter_ids()[0];
    let broker_id = cloud_sim.broker_ids()[0];
    // the host has only 2 PEs, so the third VM is rejected and not charged
    cloud_sim
        .broker(broker_id)
        .borrow_mut()
        .submit_vm_list((0..3).map(vm).collect());
    cloud_sim.start_brokers();
    cloud_sim.step_until_no_events();

    assert_eq!(cloud_sim.broker(broker_id).borrow().created_vms().len(), 2);
    let datacenter = cloud_sim.datacenter(dc);
    let datacenter = datacenter.borrow();
    let charges = datacenter.ledger().charges(broker_id).unwrap();
    assert_relative_eq!(charges.memory, 2. * 512. * 0.05);
    assert_relative_eq!(charges.storage, 2. * 1000. * 0.001);
    assert_eq!(charges.data_transfer, 0.);
    assert_relative_eq!(datacenter.debts()[&broker_id], 53.2);
}

#[test]
// The only datacenter has no room for the VM, so the broker gives up and the simulation stops.
fn test_broker_aborts_without_vms() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, SimulationConfig::new());
    let dc = cloud_sim
        .add_datacenter(
            "dc",
            DatacenterCharacteristics::default(),
            vec![space_shared_host(0, 1)],
            Vec::new(),
        )
        .unwrap();
    let broker_id = cloud_sim.add_broker("broker", Box::new(RoundRobinVmLoadBalancer::new()));
    let broker = cloud_sim.broker(broker_id);
    broker
        .borrow_mut()
        .submit_vm_list(vec![VmCharacteristics::new(0, 0, 2, 512, 100, 1000)]);
    broker.borrow_mut().submit_cloudlet_list(vec![cloudlet(0, 1000.)]);
    cloud_sim.start_broker(broker_id);
    cloud_sim.step_until_no_events();

    let broker = broker.borrow();
    assert!(broker.is_finished());
    assert!(broker.created_vms().is_empty());
    assert!(broker.received_cloudlets().is_empty());
    assert_eq!(broker.waiting_cloudlets(), 1);
    assert!(cloud_sim.datacenter(dc).borrow().is_shut_down());
    assert!(cloud_sim.datacenter(dc).borrow().debts().is_empty());
}

#[test]
// VMs rejected by the first datacenter are requested from the next one.
fn test_broker_tries_next_datacenter() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, SimulationConfig::new());
    let small = cloud_sim
        .add_datacenter(
            "small",
            DatacenterCharacteristics::default(),
            vec![space_shared_host(0, 1)],
            Vec::new(),
        )
        .unwrap();
    let large = cloud_sim
        .add_datacenter(
            "large",
            DatacenterCharacteristics::default(),
            vec![space_shared_host(0, 2), space_shared_host(1, 2)],
            Vec::new(),
        )
        .unwrap();
    let broker_id = cloud_sim.add_broker("broker", Box::new(RoundRobinVmLoadBalancer::new()));
    let broker = cloud_sim.broker(broker_id);
    broker.borrow_mut().submit_vm_list((0..3).map(vm).collect());
    broker
        .borrow_mut()
        .submit_cloudlet_list((0..3).map(|id| cloudlet(id, 1000.)).collect());
    cloud_sim.start_broker(broker_id);

    cloud_sim.step_for_duration(0.5);
    // VMs of the large datacenter are spread over both hosts
    let datacenter = cloud_sim.datacenter(large);
    let vm_counts: Vec<usize> = datacenter.borrow().hosts().iter().map(|host| host.vm_count()).collect();
    assert_eq!(vm_counts, vec![1, 1]);
    cloud_sim.step_until_no_events();

    let broker = broker.borrow();
    assert_eq!(broker.vm_datacenter(0), Some(small));
    assert_eq!(broker.vm_datacenter(1), Some(large));
    assert_eq!(broker.vm_datacenter(2), Some(large));
    assert_eq!(broker.received_cloudlets().len(), 3);
    assert_eq!(
        finish_times(broker.received_cloudlets()),
        vec![(0, Some(1.)), (1, Some(1.)), (2, Some(1.))]
    );
}

#[test]
// Throttled balancer keeps one cloudlet per VM in flight, the rest wait in the broker.
fn test_throttled_broker_queues_cloudlets() {
    let sim = Simulation::new(123);
    let sim_config = SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap();
    let mut cloud_sim = CloudSimulation::new(sim, sim_config);
    let dc_config = cloud_sim.sim_config().datacenters[0].clone();
    cloud_sim.add_datacenter_from_config(&dc_config).unwrap();
    let broker_id = cloud_sim.add_broker("broker", Box::new(ThrottledVmLoadBalancer::new(1)));
    let broker = cloud_sim.broker(broker_id);
    broker.borrow_mut().submit_vm_list(vec![vm(0)]);
    broker
        .borrow_mut()
        .submit_cloudlet_list((0..3).map(|id| cloudlet(id, 1000.)).collect());
    cloud_sim.start_brokers();

    cloud_sim.step_for_duration(0.5);
    assert_eq!(broker.borrow().waiting_cloudlets(), 2);
    cloud_sim.step_until_no_events();

    let broker = broker.borrow();
    assert_eq!(
        finish_times(broker.received_cloudlets()),
        vec![(0, Some(1.)), (1, Some(2.)), (2, Some(3.))]
    );
    assert_eq!(broker.allocation_counts().get(&0), Some(&3));
    assert_eq!(broker.waiting_cloudlets(), 0);
}

#[test]
// Datacenter at node 0 and broker at node 2 are 15 s apart. VM creation and cloudlet submission each take a
// round trip before the 1 s long cloudlet starts.
fn test_network_delays() {
    let sim = Simulation::new(123);
    let sim_config = SimulationConfig::from_file(&name_wrapper("network.yaml")).unwrap();
    let mut cloud_sim = CloudSimulation::new(sim, sim_config);
    cloud_sim.build_from_config().unwrap();
    assert!(cloud_sim.topology().borrow().is_enabled());

    let broker_id = cloud_sim.broker_ids()[0];
    let broker = cloud_sim.broker(broker_id);
    broker.borrow_mut().submit_vm_list(vec![vm(0)]);
    broker.borrow_mut().submit_cloudlet_list(vec![cloudlet(0, 1000.)]);
    cloud_sim.start_brokers();
    cloud_sim.step_until_no_events();

    let broker = broker.borrow();
    let cloudlet = &broker.received_cloudlets()[0];
    assert_eq!(cloudlet.submission_time, 45.);
    assert_eq!(cloudlet.exec_start_time, Some(45.));
    assert_eq!(cloudlet.finish_time, Some(46.));
    // the result travels back, then VM destroy and end of simulation travel to the datacenter
    assert_eq!(cloud_sim.current_time(), 76.);
}

#[test]
// Paused cloudlet keeps its remaining length and finishes later by the pause duration.
fn test_pause_resume_and_status() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, SimulationConfig::new());
    let dc = cloud_sim
        .add_datacenter(
            "dc",
            DatacenterCharacteristics::default(),
            vec![space_shared_host(0, 1)],
            Vec::new(),
        )
        .unwrap();
    let broker_id = cloud_sim.add_broker("broker", Box::new(RoundRobinVmLoadBalancer::new()));
    let broker = cloud_sim.broker(broker_id);
    broker.borrow_mut().submit_vm_list(vec![vm(0)]);
    broker.borrow_mut().submit_cloudlet_list(vec![cloudlet(0, 10000.)]);

    let operator = cloud_sim.build_custom_component::<Operator>("operator");
    {
        let mut operator = operator.borrow_mut();
        operator.datacenter = dc;
        operator.user = broker_id;
        operator.plan = vec![
            (2., Action::Pause(0)),
            (3., Action::Status(0)),
            (5., Action::Resume(0)),
            (6., Action::Status(0)),
            (20., Action::Cancel(0)),
        ];
        operator.init();
    }
    cloud_sim.start_broker(broker_id);
    cloud_sim.step_until_no_events();

    let operator = operator.borrow();
    assert_eq!(
        operator.replies,
        vec![
            (2., "pause true".to_string()),
            (5., "resume true".to_string()),
            (20., "cancel false".to_string()),
        ]
    );
    assert_eq!(
        operator.statuses,
        vec![(3., Some(CloudletStatus::Paused)), (6., Some(CloudletStatus::InExec))]
    );

    let broker = broker.borrow();
    let cloudlet = &broker.received_cloudlets()[0];
    assert_eq!(cloudlet.status(), CloudletStatus::Success);
    assert_eq!(cloudlet.finish_time, Some(13.));
    assert_relative_eq!(cloudlet.actual_cpu_time, 10.);
}

#[test]
// Cancelled cloudlet is returned at once and the pending processing update is dropped at shutdown.
fn test_cancel_running_cloudlet() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, SimulationConfig::new());
    let dc = cloud_sim
        .add_datacenter(
            "dc",
            DatacenterCharacteristics::default(),
            vec![space_shared_host(0, 1)],
            Vec::new(),
        )
        .unwrap();
    let broker_id = cloud_sim.add_broker("broker", Box::new(RoundRobinVmLoadBalancer::new()));
    let broker = cloud_sim.broker(broker_id);
    broker.borrow_mut().submit_vm_list(vec![vm(0)]);
    broker.borrow_mut().submit_cloudlet_list(vec![cloudlet(0, 10000.)]);

    let operator = cloud_sim.build_custom_component::<Operator>("operator");
    {
        let mut operator = operator.borrow_mut();
        operator.datacenter = dc;
        operator.user = broker_id;
        operator.plan = vec![(2., Action::Cancel(0))];
        operator.init();
    }
    cloud_sim.start_broker(broker_id);
    cloud_sim.step_until_no_events();

    assert_eq!(operator.borrow().replies, vec![(2., "cancel true".to_string())]);
    let broker = broker.borrow();
    assert!(broker.is_finished());
    assert_eq!(broker.received_cloudlets()[0].status(), CloudletStatus::Canceled);
    assert_eq!(cloud_sim.current_time(), 2.);
}

#[test]
// The first broker ends the simulation for the datacenter, the second one starts later and still gets its
// cloudlet done.
fn test_datacenter_resumes_after_end_of_simulation() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, SimulationConfig::new());
    let dc = cloud_sim
        .add_datacenter(
            "dc",
            DatacenterCharacteristics::default(),
            vec![space_shared_host(0, 2)],
            Vec::new(),
        )
        .unwrap();
    let first_id = cloud_sim.add_broker("first", Box::new(RoundRobinVmLoadBalancer::new()));
    let second_id = cloud_sim.add_broker("second", Box::new(RoundRobinVmLoadBalancer::new()));
    for broker_id in [first_id, second_id] {
        let broker = cloud_sim.broker(broker_id);
        broker.borrow_mut().submit_vm_list(vec![vm(0)]);
        broker.borrow_mut().submit_cloudlet_list(vec![cloudlet(0, 1000.)]);
    }

    cloud_sim.start_broker(first_id);
    cloud_sim.step_until_no_events();
    assert!(cloud_sim.broker(first_id).borrow().is_finished());
    assert!(cloud_sim.datacenter(dc).borrow().is_shut_down());
    assert_eq!(cloud_sim.current_time(), 1.);

    cloud_sim.start_broker(second_id);
    cloud_sim.step_until_no_events();

    let second = cloud_sim.broker(second_id);
    let second = second.borrow();
    assert!(second.is_finished());
    let cloudlet = &second.received_cloudlets()[0];
    assert_eq!(cloudlet.status(), CloudletStatus::Success);
    assert_eq!(cloudlet.exec_start_time, Some(1.));
    assert_eq!(cloudlet.finish_time, Some(2.));
    assert!(cloud_sim.datacenter(dc).borrow().is_shut_down());
    assert!(cloud_sim.datacenter(dc).borrow().vm(second_id, 0).is_none());
    assert_eq!(cloud_sim.current_time(), 2.);
}

#[test]
// Migrated VM keeps running its cloudlet on the new host.
fn test_vm_migration() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, SimulationConfig::new());
    let dc = cloud_sim
        .add_datacenter(
            "dc",
            DatacenterCharacteristics::default(),
            vec![space_shared_host(0, 2), space_shared_host(1, 2)],
            Vec::new(),
        )
        .unwrap();
    let broker_id = cloud_sim.add_broker("broker", Box::new(RoundRobinVmLoadBalancer::new()));
    let broker = cloud_sim.broker(broker_id);
    broker
        .borrow_mut()
        .submit_vm_list(vec![vm(0).with_scheduler(VmSchedulerKind::SpaceShared)]);
    broker.borrow_mut().submit_cloudlet_list(vec![cloudlet(0, 10000.)]);

    let operator = cloud_sim.build_custom_component::<Operator>("operator");
    {
        let mut operator = operator.borrow_mut();
        operator.datacenter = dc;
        operator.user = broker_id;
        operator.plan = vec![(2., Action::Migrate { vm_id: 0, host_id: 1 })];
        operator.init();
    }
    cloud_sim.start_broker(broker_id);

    cloud_sim.step_for_duration(1.);
    assert_eq!(cloud_sim.datacenter(dc).borrow().host_of(broker_id, 0), Some(0));
    cloud_sim.step_for_duration(2.);
    {
        let datacenter = cloud_sim.datacenter(dc);
        let datacenter = datacenter.borrow();
        assert_eq!(datacenter.host_of(broker_id, 0), Some(1));
        assert_eq!(datacenter.host(0).unwrap().vm_count(), 0);
        assert_eq!(datacenter.host(1).unwrap().free_pe_count(), 1);
    }
    cloud_sim.step_until_no_events();

    assert_eq!(operator.borrow().replies, vec![(2., "migrate true".to_string())]);
    let broker = broker.borrow();
    let cloudlet = &broker.received_cloudlets()[0];
    assert_eq!(cloudlet.status(), CloudletStatus::Success);
    assert_eq!(cloudlet.exec_start_time, Some(0.));
    assert_eq!(cloudlet.finish_time, Some(10.));
}

#[test]
// Destination host is too small, so the VM is lost and its cloudlet comes back failed.
fn test_failed_vm_migration() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, SimulationConfig::new());
    let dc = cloud_sim
        .add_datacenter(
            "dc",
            DatacenterCharacteristics::default(),
            vec![space_shared_host(0, 2), space_shared_host(1, 1)],
            Vec::new(),
        )
        .unwrap();
    let broker_id = cloud_sim.add_broker("broker", Box::new(RoundRobinVmLoadBalancer::new()));
    let broker = cloud_sim.broker(broker_id);
    broker
        .borrow_mut()
        .submit_vm_list(vec![VmCharacteristics::new(0, 0, 2, 512, 100, 1000)]);
    broker.borrow_mut().submit_cloudlet_list(vec![cloudlet(0, 10000.)]);

    let operator = cloud_sim.build_custom_component::<Operator>("operator");
    {
        let mut operator = operator.borrow_mut();
        operator.datacenter = dc;
        operator.user = broker_id;
        operator.plan = vec![(2., Action::Migrate { vm_id: 0, host_id: 1 })];
        operator.init();
    }
    cloud_sim.start_broker(broker_id);
    cloud_sim.step_until_no_events();

    assert_eq!(operator.borrow().replies, vec![(2., "migrate false".to_string())]);
    let broker = broker.borrow();
    assert!(broker.is_finished());
    let cloudlet = &broker.received_cloudlets()[0];
    assert_eq!(cloudlet.status(), CloudletStatus::Failed);
    assert_eq!(cloudlet.finish_time, Some(2.));

    let datacenter = cloud_sim.datacenter(dc);
    let datacenter = datacenter.borrow();
    assert!(datacenter.vm(broker_id, 0).is_none());
    assert_eq!(datacenter.host_of(broker_id, 0), None);
    assert!(datacenter.hosts().iter().all(|host| host.vm_count() == 0));
    assert!(datacenter.is_shut_down());
    assert_eq!(cloud_sim.current_time(), 2.);
}

#[test]
// Cloudlet queued behind a long one on VM 0 is moved to VM 1, which is idle by then.
fn test_cloudlet_move_between_vms() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, SimulationConfig::new());
    let dc = cloud_sim
        .add_datacenter(
            "dc",
            DatacenterCharacteristics::default(),
            vec![space_shared_host(0, 2)],
            Vec::new(),
        )
        .unwrap();
    let broker_id = cloud_sim.add_broker("broker", Box::new(RoundRobinVmLoadBalancer::new()));
    let broker = cloud_sim.broker(broker_id);
    broker.borrow_mut().submit_vm_list(
        (0..2)
            .map(|id| vm(id).with_scheduler(VmSchedulerKind::SpaceShared))
            .collect(),
    );
    broker
        .borrow_mut()
        .submit_cloudlet_list(vec![cloudlet(0, 4000.), cloudlet(1, 1000.), cloudlet(2, 1000.)]);

    let operator = cloud_sim.build_custom_component::<Operator>("operator");
    {
        let mut operator = operator.borrow_mut();
        operator.datacenter = dc;
        operator.user = broker_id;
        operator.plan = vec![
            (
                2.,
                Action::Move {
                    cloudlet_id: 2,
                    vm_id: 0,
                    dest_datacenter: dc,
                    dest_vm: 1,
                },
            ),
            (
                2.5,
                Action::Move {
                    cloudlet_id: 7,
                    vm_id: 0,
                    dest_datacenter: dc,
                    dest_vm: 1,
                },
            ),
        ];
        operator.init();
    }
    cloud_sim.start_broker(broker_id);
    cloud_sim.step_until_no_events();

    assert_eq!(
        operator.borrow().replies,
        vec![(2., "move true".to_string()), (2.5, "move false".to_string())]
    );
    let broker = broker.borrow();
    assert!(broker.is_finished());
    assert_eq!(
        finish_times(broker.received_cloudlets()),
        vec![(0, Some(4.)), (1, Some(1.)), (2, Some(3.))]
    );
    let moved = broker.received_cloudlets().iter().find(|c| c.id == 2).unwrap();
    assert_eq!(moved.status(), CloudletStatus::Success);
    assert_eq!(moved.vm_id, Some(1));
    assert_eq!(moved.exec_start_time, Some(2.));
    assert_eq!(moved.datacenter_id, Some(dc));
}

#[test]
// Queued cloudlet is forwarded to a VM in another datacenter and finishes there.
fn test_cloudlet_move_between_datacenters() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, SimulationConfig::new());
    let small = cloud_sim
        .add_datacenter(
            "small",
            DatacenterCharacteristics::default(),
            vec![space_shared_host(0, 1)],
            Vec::new(),
        )
        .unwrap();
    let large = cloud_sim
        .add_datacenter(
            "large",
            DatacenterCharacteristics::default(),
            vec![space_shared_host(0, 2)],
            Vec::new(),
        )
        .unwrap();
    let broker_id = cloud_sim.add_broker("broker", Box::new(RoundRobinVmLoadBalancer::new()));
    let broker = cloud_sim.broker(broker_id);
    broker.borrow_mut().submit_vm_list(
        (0..2)
            .map(|id| vm(id).with_scheduler(VmSchedulerKind::SpaceShared))
            .collect(),
    );
    broker
        .borrow_mut()
        .submit_cloudlet_list(vec![cloudlet(0, 4000.), cloudlet(1, 1000.), cloudlet(2, 1000.)]);

    let operator = cloud_sim.build_custom_component::<Operator>("operator");
    {
        let mut operator = operator.borrow_mut();
        operator.datacenter = small;
        operator.user = broker_id;
        operator.plan = vec![(
            2.,
            Action::Move {
                cloudlet_id: 2,
                vm_id: 0,
                dest_datacenter: large,
                dest_vm: 1,
            },
        )];
        operator.init();
    }
    cloud_sim.start_broker(broker_id);
    cloud_sim.step_until_no_events();

    assert_eq!(operator.borrow().replies, vec![(2., "move true".to_string())]);
    let broker = broker.borrow();
    assert!(broker.is_finished());
    assert_eq!(broker.vm_datacenter(0), Some(small));
    assert_eq!(broker.vm_datacenter(1), Some(large));
    assert_eq!(
        finish_times(broker.received_cloudlets()),
        vec![(0, Some(4.)), (1, Some(1.)), (2, Some(3.))]
    );
    let moved = broker.received_cloudlets().iter().find(|c| c.id == 2).unwrap();
    assert_eq!(moved.status(), CloudletStatus::Success);
    assert_eq!(moved.datacenter_id, Some(large));
    assert_eq!(moved.submission_time, 2.);
    assert!(cloud_sim.datacenter(small).borrow().is_shut_down());
    assert!(cloud_sim.datacenter(large).borrow().is_shut_down());
}

#[test]
// Files are placed while there is space, only stored files are charged to the sender.
fn test_file_storage() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, SimulationConfig::new());
    let characteristics = DatacenterCharacteristics {
        cost_per_bw: 0.1,
        ..Default::default()
    };
    let dc = cloud_sim
        .add_datacenter(
            "dc",
            characteristics,
            vec![space_shared_host(0, 1)],
            vec![Box::new(SanStorage::new("san", 1000, 10., 0.))],
        )
        .unwrap();

    let operator = cloud_sim.build_custom_component::<Operator>("operator");
    {
        let mut operator = operator.borrow_mut();
        operator.datacenter = dc;
        operator.plan = vec![
            (1., Action::AddFile(File::new("a", 600))),
            (2., Action::AddFile(File::new("b", 600))),
            (3., Action::AddFile(File::new("a", 100))),
            (4., Action::DeleteFile("a".to_string())),
            (5., Action::DeleteFile("a".to_string())),
        ];
        operator.init();
    }
    cloud_sim.step_until_no_events();

    let operator = operator.borrow();
    assert_eq!(operator.file_errors.len(), 5);
    assert_eq!(operator.file_errors[0], None);
    assert!(matches!(
        operator.file_errors[1],
        Some(StorageError::NotEnoughSpace { .. })
    ));
    assert_eq!(
        operator.file_errors[2],
        Some(StorageError::AlreadyExists("a".to_string()))
    );
    assert_eq!(operator.file_errors[3], None);
    assert_eq!(operator.file_errors[4], Some(StorageError::NotFound("a".to_string())));

    let operator_id = operator.ctx.id();
    let datacenter = cloud_sim.datacenter(dc);
    // rejected "b" and the second "a" cost nothing
    assert_relative_eq!(datacenter.borrow().ledger().debt(operator_id), 0.1 * 600.);
    assert_relative_eq!(
        datacenter.borrow().ledger().charges(operator_id).unwrap().data_transfer,
        60.
    );
    assert_eq!(datacenter.borrow().file_size("a"), None);
}

#[test]
fn test_datacenter_without_pes() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, SimulationConfig::new());
    let result = cloud_sim.add_datacenter(
        "empty",
        DatacenterCharacteristics::default(),
        vec![space_shared_host(0, 0)],
        Vec::new(),
    );
    assert!(matches!(result, Err(CloudError::NoProcessingElements(_))));
}
