//! ClipForge Clip Model
//!
//! Defines the core data contracts for the clip rendering pipeline:
//! - **Request:** Immutable description of one clip render (source, range, framing)
//! - **Overlays / Audio:** Captions, hook title, watermark, music bed, sound effects
//! - **Encoding / License:** Encoder choice and tier-based render limits
//! - **Crop:** Per-frame subject samples and time-varying crop paths
//! - **Status:** The clip lifecycle observed by external callers
//! - **Contracts:** Interfaces to the project store, license service, settings,
//!   and media library, plus a JSON-file implementation of all four

pub mod audio;
pub mod contracts;
pub mod crop;
pub mod encoding;
pub mod license;
pub mod overlay;
pub mod request;
pub mod status;
pub mod store;

pub use audio::*;
pub use contracts::*;
pub use crop::*;
pub use encoding::*;
pub use license::*;
pub use overlay::*;
pub use request::*;
pub use status::*;
pub use store::*;
