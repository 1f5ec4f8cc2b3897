pub mod config;
pub mod decoder;
pub mod http;
pub mod lifecycle;
pub mod metrics;
pub mod pipeline;
pub mod query;
pub mod queue;
pub mod receiver;
pub mod store;
pub mod worker;

pub mod error;
