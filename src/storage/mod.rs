//! 存储边界

pub mod memory;
pub mod value;

pub use memory::{advance, utc_now, Clock, MemoryTable};
pub use value::{Row, Value};
