#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod credentials;
pub mod error;
pub mod fs;
pub mod mount;
pub mod script;
pub mod supervisor;

pub use credentials::{select_record, CredentialRecord, CredentialStore};
pub use error::{ArtifactError, ValidationError};
pub use mount::{
    normalize_mount_path, program_slug, MountDefinition, MountRecord, MountRegistry,
    MANIFEST_VERSION,
};
pub use script::{
    render_script, MountScriptSynthesizer, ScriptEditResult, ScriptOutcome, MOUNT_DRIVER,
};
pub use supervisor::{
    IncludeMerge, InetHttpServer, LinkOutcome, LinkState, LoggingOptions, PrimarySettings,
    ProgramSpec, SupervisorConfigManager, MANAGED_HEADER,
};
