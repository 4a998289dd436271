//! # livekml-kml
//!
//! KML serialization for LiveKML: [`KmlRenderer`] turns batch entries into
//! `<Create>`/`<Change>`/`<Delete>` fragments and wraps a batch into the
//! `<NetworkLinkControl>` update a polling viewer applies.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod document;
mod renderer;
pub mod xml;

pub use document::{cycle_cookie, LoaderDocument, KML_CONTENT_TYPE};
pub use renderer::{KmlConfig, KmlRenderer, LinkControl, KML_NAMESPACE};
pub use xml::XmlError;
