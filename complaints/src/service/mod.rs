pub mod complaint;
pub mod lifecycle;
pub mod position;
