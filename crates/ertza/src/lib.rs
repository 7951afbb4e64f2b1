//! Master/slave drive control over serial links.
//!
//! # Crate Structure
//!
//! - [`transport`] — Serial devices and the `LinkStream` seam
//! - [`frame`] — Command frames, control commands and telemetry lines
//! - [`dispatch`] — Alias-keyed command dispatch
//! - [`machine`] — Machine modes and master/slave value forwarding
//! - [`remote`] — Serial server, drive control link and slave senders

/// Re-export transport types.
pub mod transport {
    pub use ertza_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ertza_frame::*;
}

/// Re-export dispatch types.
pub mod dispatch {
    pub use ertza_dispatch::*;
}

/// Re-export machine types.
pub mod machine {
    pub use ertza_machine::*;
}

/// Re-export remote types.
pub mod remote {
    pub use ertza_remote::*;
}
