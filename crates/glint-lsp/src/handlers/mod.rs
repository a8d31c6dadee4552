//! LSP request and notification handlers.

pub mod completion;
pub mod definition;
pub mod diagnostics;
pub mod formatting;
pub mod hover;
pub mod rename;
pub mod signature_help;
pub mod symbols;
pub mod utils;

pub use completion::handle_completion;
pub use definition::handle_goto_definition;
pub use diagnostics::{group_by_document, publish_params};
pub use formatting::handle_formatting;
pub use hover::handle_hover;
pub use rename::handle_rename;
pub use signature_help::handle_signature_help;
pub use symbols::handle_document_symbols;
