//! Release manifests: schema, reserved names, parsing, and building.

pub mod builder;
pub mod naming;
pub mod parser;
pub mod schema;
pub mod schema_version;

pub use builder::{
    AssetDescriptor, AssetDownloader, AssetLister, BuildError, BuildOutput, BuildRequest,
    BuildWarning, ReleaseDescriptor, build_manifest,
};
pub use parser::parse_manifest;
pub use schema::{Manifest, ManifestError, ReleaseArtifact, ReleaseRecord, RepositoryRecord};
