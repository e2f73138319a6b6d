mod config;
mod error;
mod ghost;
mod layout;
mod resolve;
mod session;
mod stepper;
mod tree;
mod zones;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::ghost::*;
pub use crate::layout::*;
pub use crate::resolve::*;
pub use crate::session::*;
pub use crate::stepper::*;
pub use crate::tree::*;
pub use crate::zones::*;
