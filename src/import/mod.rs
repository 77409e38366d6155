//! The import pipeline.
//!
//! - [`group`]: validates requested file IDs against reader file groups
//! - [`transcode`]: streams planes into OMEIS pixel buffers
//! - [`service`]: the [`Importer`] driving both

pub mod group;
pub mod service;
pub mod transcode;

pub use group::{DiscoveredGroup, FileGroup, FileGroupResolver, ResolvedFile};
pub use service::{ImportOutcome, Importer};
pub use transcode::{
    canonical_plane_order, canonical_pixel_type, needs_swap, swap_sample_bytes, PixelTranscoder,
    SeriesResult, DIMENSION_ORDER,
};
