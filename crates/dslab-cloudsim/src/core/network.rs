//! Network topology model used to delay messages between simulation entities.

pub mod brite;
pub mod delay_matrix;
pub mod graph;
pub mod topology;
