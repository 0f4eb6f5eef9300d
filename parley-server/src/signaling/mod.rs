mod hub;
mod ws_handler;

pub use hub::*;
pub use ws_handler::*;
