use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use sugars::{rc, refcell};

use dslab_core::context::SimulationContext;
use dslab_core::simulation::Simulation;
use dslab_core::Id;

use crate::core::allocation_policy::{allocation_policy_resolver, make_pes};
use crate::core::broker::DatacenterBroker;
use crate::core::config::sim_config::{BrokerConfig, DatacenterConfig};
use crate::core::config::SimulationConfig;
use crate::core::datacenter::{Datacenter, DatacenterCharacteristics};
use crate::core::error::CloudError;
use crate::core::host::Host;
use crate::core::load_balancer::{load_balancer_resolver, VmLoadBalancer};
use crate::core::network::topology::NetworkTopology;
use crate::core::storage::{FileStorage, SanStorage};
use crate::core::vm_provisioner::{SimpleVmProvisioner, VmProvisioner};
use crate::custom_component::CustomComponent;

pub struct CloudSimulation {
    datacenters: BTreeMap<Id, Rc<RefCell<Datacenter>>>,
    brokers: BTreeMap<Id, Rc<RefCell<DatacenterBroker>>>,
    components: BTreeMap<Id, Rc<RefCell<dyn CustomComponent>>>,
    topology: Rc<RefCell<NetworkTopology>>,
    sim: Simulation,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl CloudSimulation {
    /// Creates simulation. Network topology is loaded from `topology_file` if it is set.
    pub fn new(sim: Simulation, sim_config: SimulationConfig) -> Self {
        let topology = match &sim_config.topology_file {
            Some(path) => NetworkTopology::from_brite_file(path),
            None => NetworkTopology::disabled(),
        };
        Self::with_topology(sim, sim_config, topology)
    }

    pub fn with_topology(mut sim: Simulation, sim_config: SimulationConfig, topology: NetworkTopology) -> Self {
        let ctx = sim.create_context("simulation");
        Self {
            datacenters: BTreeMap::new(),
            brokers: BTreeMap::new(),
            components: BTreeMap::new(),
            topology: rc!(refcell!(topology)),
            sim,
            ctx,
            sim_config: rc!(sim_config),
        }
    }

    /// Adds datacenter whose VMs are placed by the greedy provisioner.
    pub fn add_datacenter(
        &mut self,
        name: &str,
        characteristics: DatacenterCharacteristics,
        hosts: Vec<Host>,
        storage: Vec<Box<dyn FileStorage>>,
    ) -> Result<Id, CloudError> {
        self.add_datacenter_with_provisioner(
            name,
            characteristics,
            Box::new(SimpleVmProvisioner::new(hosts)),
            storage,
        )
    }

    pub fn add_datacenter_with_provisioner(
        &mut self,
        name: &str,
        characteristics: DatacenterCharacteristics,
        provisioner: Box<dyn VmProvisioner>,
        storage: Vec<Box<dyn FileStorage>>,
    ) -> Result<Id, CloudError> {
        let datacenter = rc!(refcell!(Datacenter::new(
            characteristics,
            provisioner,
            storage,
            self.topology.clone(),
            self.sim.create_context(name),
            self.sim_config.clone(),
        )?));
        let id = self.sim.add_handler(name, datacenter.clone());
        self.datacenters.insert(id, datacenter);
        Ok(id)
    }

    pub fn add_datacenter_from_config(&mut self, config: &DatacenterConfig) -> Result<Id, CloudError> {
        let mut hosts = Vec::new();
        for host_config in &config.hosts {
            let policy = host_config.allocation_policy.as_deref().unwrap_or("TimeShared");
            for _ in 0..host_config.count.unwrap_or(1) {
                let pes = make_pes(host_config.pes, host_config.mips);
                hosts.push(Host::new(
                    hosts.len() as u32,
                    host_config.memory,
                    host_config.bandwidth,
                    host_config.storage,
                    allocation_policy_resolver(policy, pes)?,
                ));
            }
        }
        let storage = config
            .storage
            .iter()
            .flatten()
            .map(|storage_config| {
                let mut storage = SanStorage::new(
                    &storage_config.name,
                    storage_config.capacity,
                    storage_config.bandwidth,
                    storage_config.latency.unwrap_or(0.),
                );
                if let Some(rate) = storage_config.max_transfer_rate {
                    storage = storage.with_max_transfer_rate(rate);
                }
                Box::new(storage) as Box<dyn FileStorage>
            })
            .collect();
        let default = DatacenterCharacteristics::default();
        let characteristics = DatacenterCharacteristics {
            architecture: config.architecture.clone().unwrap_or(default.architecture),
            os: config.os.clone().unwrap_or(default.os),
            vmm: config.vmm.clone().unwrap_or(default.vmm),
            time_zone: config.time_zone.unwrap_or(default.time_zone),
            cost_per_sec: config.cost_per_sec.unwrap_or(default.cost_per_sec),
            cost_per_mem: config.cost_per_mem.unwrap_or(default.cost_per_mem),
            cost_per_storage: config.cost_per_storage.unwrap_or(default.cost_per_storage),
            cost_per_bw: config.cost_per_bw.unwrap_or(default.cost_per_bw),
        };
        let id = self.add_datacenter(&config.name, characteristics, hosts, storage)?;
        if let Some(node) = config.topology_node {
            self.map_entity(id, node);
        }
        Ok(id)
    }

    /// Adds broker which will use all datacenters added so far.
    pub fn add_broker(&mut self, name: &str, balancer: Box<dyn VmLoadBalancer>) -> Id {
        let broker = rc!(refcell!(DatacenterBroker::new(
            balancer,
            self.topology.clone(),
            self.sim.create_context(name),
            self.sim_config.clone(),
        )));
        let id = self.sim.add_handler(name, broker.clone());
        for datacenter_id in self.datacenters.keys() {
            broker.borrow_mut().add_datacenter(*datacenter_id);
        }
        self.brokers.insert(id, broker);
        id
    }

    pub fn add_broker_from_config(&mut self, config: &BrokerConfig) -> Result<Id, CloudError> {
        let balancer = load_balancer_resolver(config.load_balancer.as_deref().unwrap_or("RoundRobin"))?;
        let id = self.add_broker(&config.name, balancer);
        if let Some(node) = config.topology_node {
            self.map_entity(id, node);
        }
        Ok(id)
    }

    /// Creates all datacenters and brokers listed in the config.
    pub fn build_from_config(&mut self) -> Result<(), CloudError> {
        let config = self.sim_config.clone();
        for datacenter in &config.datacenters {
            self.add_datacenter_from_config(datacenter)?;
        }
        for broker in &config.brokers {
            self.add_broker_from_config(broker)?;
        }
        Ok(())
    }

    /// Creates and registers user-defined component. Its `init` is not called.
    pub fn build_custom_component<Component: 'static + CustomComponent>(
        &mut self,
        name: &str,
    ) -> Rc<RefCell<Component>> {
        let component = rc!(refcell!(Component::new(
            self.sim.create_context(name),
            self.topology.clone()
        )));
        let id = self.sim.add_handler(name, component.clone());
        self.components.insert(id, component.clone());
        component
    }

    pub fn component_ids(&self) -> Vec<Id> {
        self.components.keys().copied().collect()
    }

    /// Places entity on topology node, all messages to and from it get network delay.
    pub fn map_entity(&mut self, id: Id, node: u32) -> bool {
        self.topology.borrow_mut().map_node(id, node)
    }

    pub fn start_broker(&mut self, broker_id: Id) {
        self.brokers[&broker_id].borrow_mut().start();
    }

    pub fn start_brokers(&mut self) {
        for broker in self.brokers.values() {
            broker.borrow_mut().start();
        }
    }

    pub fn datacenter(&self, datacenter_id: Id) -> Rc<RefCell<Datacenter>> {
        self.datacenters[&datacenter_id].clone()
    }

    pub fn datacenter_ids(&self) -> Vec<Id> {
        self.datacenters.keys().copied().collect()
    }

    pub fn broker(&self, broker_id: Id) -> Rc<RefCell<DatacenterBroker>> {
        self.brokers[&broker_id].clone()
    }

    pub fn broker_ids(&self) -> Vec<Id> {
        self.brokers.keys().copied().collect()
    }

    pub fn topology(&self) -> Rc<RefCell<NetworkTopology>> {
        self.topology.clone()
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn sim_config(&self) -> Rc<SimulationConfig> {
        self.sim_config.clone()
    }

    pub fn step(&mut self) -> bool {
        self.sim.step()
    }

    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    pub fn step_for_duration(&mut self, time: f64) {
        self.sim.step_for_duration(time);
    }

    pub fn step_until_no_events(&mut self) {
        self.sim.step_until_no_events();
    }

    pub fn event_count(&self) -> u64 {
        self.sim.event_count()
    }

    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }
}
