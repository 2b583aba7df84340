#[cfg(feature = "async-tokio")]
mod tokio_ext;

#[cfg(feature = "async-tokio")]
pub use tokio_ext::*;
