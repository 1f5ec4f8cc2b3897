pub mod feed;
pub mod simulator;
