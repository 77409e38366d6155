//! OME-XML metadata: a generic element tree, the output store, and the
//! attribute coercions used when filling it.

pub mod convert;
mod document;
mod store;

pub use document::{
    generate_identity, Element, MetadataDocument, Node, IDENTITY_ATTRIBUTE, PIXELS_ELEMENT,
};
pub use store::{apply_namespaces, MetadataStore, OME_NAMESPACE, ROOT_ELEMENT};
