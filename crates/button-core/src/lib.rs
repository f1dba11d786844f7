mod annotate;
mod core;
mod normalize;
mod ops;
mod project;
mod serde_value;

pub use crate::annotate::*;
pub use crate::core::*;
pub use crate::ops::*;
pub use crate::project::*;
pub use crate::serde_value::*;
