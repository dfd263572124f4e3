pub mod order;
pub mod sumo;
