/// Device & surface negotiation module

pub mod device_negotiator;

pub use device_negotiator::*;
