mod candles;
mod status;

pub use candles::Candles;
pub use status::{draw_status, StatusInfo};
