mod demo;
mod health;

pub use demo::{echo, greeting};
pub use health::health_check;
