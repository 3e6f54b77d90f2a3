pub mod candle;
pub mod signal;
pub mod user;

pub use candle::Candle;
pub use signal::{Direction, Signal};
pub use user::{AdminAction, User};
