//! Interface of user-defined components which talk to datacenters directly.
//!
//! Brokers cover the common submit-and-wait workflow. Components built through
//! [`CloudSimulation::build_custom_component`](crate::simulation::CloudSimulation::build_custom_component) can send any
//! datacenter request (cancel, pause, resume, move, status, files) and receive the acks.

use std::cell::RefCell;
use std::rc::Rc;

use dslab_core::context::SimulationContext;
use dslab_core::handler::EventHandler;

use crate::core::network::topology::NetworkTopology;

pub trait CustomComponent: EventHandler {
    /// Creates component. Messages should be sent with `emit_over_network` to get network delays.
    fn new(ctx: SimulationContext, topology: Rc<RefCell<NetworkTopology>>) -> Self
    where
        Self: Sized;

    /// Spawns the first events of the component.
    fn init(&mut self);
}
