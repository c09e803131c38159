//! The streaming protocol carried over broker pipes: frame shapes, the Stream Producer that
//! drains a cursor onto a pipe, and the Stream Consumer that reads it back.
mod consumer;
mod frame;
mod producer;

pub use consumer::Consumer;
pub use frame::data_frame;
pub use frame::error_frame;
pub use frame::keepalive_frame;
pub use frame::parse_frame;
pub use frame::ParsedFrame;
pub use producer::spawn as spawn_producer;
