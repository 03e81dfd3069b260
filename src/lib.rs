pub mod core {
    pub mod flatten;
    pub mod structure;
    pub mod mapper;
    pub mod writer;
}

pub mod utils {
    pub mod export_processor;
}

pub mod config;
pub mod error;
pub mod transport;

pub use crate::config::ExportConfig;
pub use crate::core::flatten::{FlatTable, Flattener, Lookup};
pub use crate::core::mapper::{OutputValue, Scope, StructureMapper};
pub use crate::core::structure::StructureConfig;
pub use crate::core::writer::{Writer, XmlTreeWriter};
pub use crate::error::ExportError;
pub use crate::transport::{HookResponse, Payload, WebhookSink};
pub use crate::utils::export_processor::{ExportProcessor, ExportRequest};
