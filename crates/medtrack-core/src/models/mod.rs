//! Domain models for the medtrack system.

mod activity;
mod item;
mod legacy;
mod report;
pub mod timestamp;
mod user;

pub use activity::*;
pub use item::*;
pub use legacy::*;
pub use report::*;
pub use user::*;
