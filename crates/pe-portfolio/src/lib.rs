pub mod book;
pub mod export;
pub mod position;
pub mod projection;

pub use book::*;
pub use export::*;
pub use position::*;
pub use projection::*;
