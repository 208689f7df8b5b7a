//! Storage components: where bytes live.
//!
//! Storage deals exclusively in byte streams — record structure is the
//! format components' concern. Network-backed storages (blob stores,
//! object storage) plug in at the same seam.

mod local;

pub use local::LocalFileStorage;
