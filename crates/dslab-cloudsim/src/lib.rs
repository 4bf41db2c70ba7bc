#![doc = include_str!("../readme.md")]

pub mod core;
pub mod custom_component;
pub mod simulation;
