pub mod contract;
pub mod greeks;
pub mod implied_vol;
pub mod math;
pub mod parity;
pub mod pricing;

pub use contract::*;
pub use greeks::*;
pub use implied_vol::*;
pub use math::*;
pub use parity::*;
pub use pricing::*;
