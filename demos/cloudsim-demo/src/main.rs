use std::time::Instant;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dslab_core::log_info;
use dslab_core::simulation::Simulation;
use dslab_cloudsim::core::cloudlet::Cloudlet;
use dslab_cloudsim::core::config::SimulationConfig;
use dslab_cloudsim::core::vm::VmCharacteristics;
use dslab_cloudsim::core::vm_scheduler::VmSchedulerKind;
use dslab_cloudsim::simulation::CloudSimulation;

fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Simulation config with datacenters and brokers.
    #[clap(long, default_value = "config.yaml")]
    config: String,

    /// Number of VMs requested by each broker.
    #[clap(long, default_value_t = 4)]
    vms: u32,

    /// Number of cloudlets submitted by each broker.
    #[clap(long, default_value_t = 20)]
    cloudlets: u32,

    /// Average cloudlet length in MI.
    #[clap(long, default_value_t = 10000.)]
    length: f64,
}

fn simulation(args: Args, sim_config: SimulationConfig) {
    let simulation_start = Instant::now();

    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, sim_config);
    if let Err(e) = cloud_sim.build_from_config() {
        log::error!("can't build simulation: {}", e);
        return;
    }

    let mut rng = StdRng::seed_from_u64(47);
    for broker_id in cloud_sim.broker_ids() {
        let vms = (0..args.vms)
            .map(|id| {
                let scheduler = if id % 2 == 0 {
                    VmSchedulerKind::TimeShared
                } else {
                    VmSchedulerKind::SpaceShared
                };
                VmCharacteristics::new(id, broker_id, 1, 512, 100, 1000)
                    .with_priority(id % 3 + 1)
                    .with_scheduler(scheduler)
            })
            .collect();
        let cloudlets = (0..args.cloudlets)
            .map(|id| {
                let length = rng.gen_range(0.5..1.5) * args.length;
                Cloudlet::new(id, broker_id, length.round(), 1, 300, 300)
            })
            .collect();
        let broker = cloud_sim.broker(broker_id);
        broker.borrow_mut().submit_vm_list(vms);
        broker.borrow_mut().submit_cloudlet_list(cloudlets);
    }

    cloud_sim.start_brokers();
    cloud_sim.step_until_no_events();

    for broker_id in cloud_sim.broker_ids() {
        let broker = cloud_sim.broker(broker_id);
        let broker = broker.borrow();
        log_info!(
            cloud_sim.context(),
            "broker #{}: {} cloudlets returned, {} never submitted",
            broker_id,
            broker.received_cloudlets().len(),
            broker.waiting_cloudlets()
        );
        for cloudlet in broker.received_cloudlets() {
            let datacenter = cloudlet
                .datacenter_id
                .map(|id| cloud_sim.datacenter(id).borrow().name().to_string())
                .unwrap_or_default();
            log_info!(
                cloud_sim.context(),
                "cloudlet #{:<3} {:<8} vm #{:<2} {:<10} start {:>8.2} finish {:>8.2} cpu {:>7.2} cost {:>8.2}",
                cloudlet.id,
                cloudlet.status().to_string(),
                cloudlet.vm_id.unwrap_or_default(),
                datacenter,
                cloudlet.exec_start_time.unwrap_or(f64::NAN),
                cloudlet.finish_time.unwrap_or(f64::NAN),
                cloudlet.actual_cpu_time,
                cloudlet.processing_cost()
            );
        }
    }

    for datacenter_id in cloud_sim.datacenter_ids() {
        let datacenter = cloud_sim.datacenter(datacenter_id);
        let datacenter = datacenter.borrow();
        for (user_id, debt) in datacenter.debts() {
            log_info!(
                cloud_sim.context(),
                "{}: user #{} owes {:.2}",
                datacenter.name(),
                user_id,
                debt
            );
        }
    }

    log_info!(
        cloud_sim.context(),
        "Simulation process time {:.2?}",
        simulation_start.elapsed()
    );
    log_info!(
        cloud_sim.context(),
        "Total events processed {}",
        cloud_sim.event_count()
    );
}

fn main() {
    init_logger();
    let args = Args::parse();
    match SimulationConfig::from_file(&args.config) {
        Ok(config) => simulation(args, config),
        Err(e) => log::error!("{}", e),
    }
}
