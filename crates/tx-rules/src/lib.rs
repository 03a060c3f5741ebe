//! # tx-rules
//!
//! Device capability catalog and recode decision rules.
//!
//! - [`DeviceProfile`] / [`DeviceCatalog`] -- static registry of target
//!   playback devices and their capability limits.
//! - [`refframes`] -- resolution-dependent reference-frame budgets for
//!   hardware H.264 decoders.
//! - [`recode`] -- declarative per-device predicate tables deciding which
//!   tracks must be re-encoded versus copied.

pub mod devices;
pub mod recode;
pub mod refframes;

pub use devices::{DeviceCatalog, DeviceKind, DeviceProfile};
pub use recode::{apply, RecodeContext};
