//! Import of the digitized Bodensee periodicals into the digitization
//! workflow: page manifests and catalogue records become METS files plus
//! the image and PDF folders the production system expects.

pub mod assembly;
pub mod assets;
pub mod batch;
pub mod config;
pub mod error;
pub mod grouping;
pub mod identifier;
pub mod issue;
pub mod mets;
pub mod record;
pub mod slug;
pub mod tree;

pub use batch::{ImportResult, ImportStatus, Importer};
pub use config::ImportConfig;
pub use error::{ImportError, Result};
pub use mets::{MetadataWriter, MetsWriter};
