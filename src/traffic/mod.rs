pub mod interfaces;
pub mod sampler;

pub use interfaces::{find_interface, interfaces, InterfaceDescriptor};
pub use sampler::{CounterRecord, CounterSource, InterfaceTraffic, TrafficSample, TrafficSampler};
