//! Serial transport abstraction for ertza drive links.
//!
//! This is the lowest layer of ertza. It opens serial devices with the
//! line settings every ertza link uses (8N1, no flow control) and hands out
//! a [`SerialStream`] implementing `Read + Write`.
//!
//! Everything above this crate works over any `Read + Write` stream, so
//! tests and simulators can substitute in-memory or socket pairs.

pub mod error;
pub mod settings;
pub mod stream;
pub mod traits;

pub use error::{Result, TransportError};
pub use settings::{SerialSettings, DEFAULT_BAUD_RATE};
pub use stream::SerialStream;
pub use traits::LinkStream;
