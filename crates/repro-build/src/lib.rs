#![deny(missing_docs)]
#![doc = "Bridge to the external make-based build tool and the per-process build-artifact cache."]

pub mod bridge;
pub mod cache;

pub use bridge::{payload_line, MakeBridge};
pub use cache::{variant_name, ArtifactCache, ExecutableId};
