pub mod catalogue;
pub mod complete;
pub mod dispatch;
pub mod erase;
pub mod findings;
pub mod models;
pub mod pref;
pub mod process;
pub mod schema;
pub mod shared;
pub mod stats;
