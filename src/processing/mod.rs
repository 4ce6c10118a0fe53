pub mod acquire;
pub mod codec;
pub mod color;
pub mod expression;
pub mod select;
pub mod shape;
pub mod split;

pub use acquire::ImageRef;
pub use color::{ColorRange, ColorSpec};
