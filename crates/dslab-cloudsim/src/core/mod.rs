pub mod allocation_policy;
pub mod broker;
pub mod cloudlet;
pub mod common;
pub mod config;
pub mod datacenter;
pub mod error;
pub mod events;
pub mod host;
pub mod load_balancer;
pub mod network;
pub mod provisioner;
pub mod storage;
pub mod vm;
pub mod vm_provisioner;
pub mod vm_scheduler;
