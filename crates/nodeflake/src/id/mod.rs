mod base36;
mod layout;

pub use base36::*;
pub use layout::*;
