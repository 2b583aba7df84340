mod cancel;
mod flake;
mod retry;
mod settings;

pub use cancel::*;
pub use flake::*;
pub(crate) use retry::*;
pub use settings::*;
