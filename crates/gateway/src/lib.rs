pub mod remote;
pub mod services;
pub mod traits;
