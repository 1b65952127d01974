pub mod id;

pub use id::{Id, V4, V7};
