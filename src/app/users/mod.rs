//! 用户表的类型化访问

pub mod model;
#[cfg(feature = "database")]
pub mod postgres;
pub mod service;
pub mod store;

pub use model::{NewUser, User, UserChanges};
#[cfg(feature = "database")]
pub use postgres::PgUserStore;
pub use service::UserService;
pub use store::{MemoryUserStore, UserStore};
