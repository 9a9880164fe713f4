mod console_error;
mod decode_error;

pub use console_error::*;
pub use decode_error::*;
