//! Common types shared across dyncom crates
//!
//! - [`Guid`]: 128-bit interface and class identifiers
//! - [`Hresult`]: the status code returned by every COM method
//! - [`BridgeConfig`]: runtime configuration loaded from TOML

pub mod config;
pub mod guid;
pub mod hresult;

pub use config::{ApartmentModel, BridgeConfig, ConfigError, ProbeTarget};
pub use guid::{Guid, GuidError, IID_IUNKNOWN};
pub use hresult::Hresult;
