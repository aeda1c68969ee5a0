pub mod client;
pub mod types;

pub use client::{cancellable, BackendClient};
pub use types::{Payment, UserInfo};
