//! Purpose: Public client surface for the tagging service and user folders.
//! Exports: Configuration, transport, tag store, and folder engine types.
//! Role: The path callers and the CLI use; internal helpers stay private.
//! Invariants: Every error crossing this boundary is `crate::core::error::Error`.

mod config;
mod folders;
mod tagging;
mod transport;

pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use config::{Credentials, DEFAULT_BASE_DOMAIN, Environment, ServiceConfig};
pub use folders::{
    CONTENT_TAG_VALUE, FOLDER_RESOURCE_TYPE, Folder, FolderContent, FolderEntry,
    INTERNETBOOK_RESOURCE_TYPE, ROOT_SENTINEL, UserFolders,
};
pub use tagging::{
    DEFAULT_TAG_TIMEOUT, NameSelector, ResourceSelector, Tag, TagOutput, TagStore, TaggingClient,
};
pub use transport::ServiceClient;
