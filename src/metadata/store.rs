use tracing::debug;

use super::document::{Element, MetadataDocument};
use crate::error::MetadataError;

/// Default namespace of OME 2003-FC documents.
pub const OME_NAMESPACE: &str = "http://www.openmicroscopy.org/XMLschemas/OME/FC/ome.xsd";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const STD_NAMESPACE: &str = "http://www.openmicroscopy.org/XMLschemas/STD/RC2/STD.xsd";
pub const BIN_NAMESPACE: &str =
    "http://www.openmicroscopy.org/XMLschemas/BinaryFile/RC1/BinaryFile.xsd";
pub const CA_NAMESPACE: &str = "http://www.openmicroscopy.org/XMLschemas/CA/RC1/CA.xsd";

/// Name of the root element created when no document was supplied.
pub const ROOT_ELEMENT: &str = "OME";

/// Owns the output document.
///
/// A store may start empty; the `OME` root is only created once something
/// writes to it, so an untouched store dumps as absent rather than as an
/// empty document.
#[derive(Debug, Default)]
pub struct MetadataStore {
    document: Option<MetadataDocument>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(document: MetadataDocument) -> Self {
        Self {
            document: Some(document),
        }
    }

    pub fn document(&self) -> Option<&MetadataDocument> {
        self.document.as_ref()
    }

    /// The document, created with an empty `OME` root if missing.
    pub fn document_mut(&mut self) -> &mut MetadataDocument {
        self.document.get_or_insert_with(|| {
            debug!("Creating empty {} root", ROOT_ELEMENT);
            MetadataDocument::new(Element::new(ROOT_ELEMENT))
        })
    }

    pub fn root_mut(&mut self) -> &mut Element {
        self.document_mut().root_mut()
    }

    pub fn identity(&self) -> Option<&str> {
        self.document.as_ref()?.identity()
    }

    pub fn set_identity(&mut self, identity: impl Into<String>) {
        self.document_mut().set_identity(identity);
    }

    /// Serialize the document, or `None` if there is none.
    ///
    /// The OME 2003-FC namespace and schema location attributes are set on
    /// the root first, overwriting whatever the reader put there.
    pub fn dump_xml(&mut self) -> Result<Option<String>, MetadataError> {
        match self.document.as_mut() {
            Some(document) => {
                apply_namespaces(document.root_mut());
                document.to_xml().map(Some)
            }
            None => Ok(None),
        }
    }
}

/// Stamp the fixed OME 2003-FC namespace declarations on `root`.
pub fn apply_namespaces(root: &mut Element) {
    root.set_attribute("xmlns", OME_NAMESPACE);
    root.set_attribute("xmlns:xsi", XSI_NAMESPACE);
    root.set_attribute("xmlns:STD", STD_NAMESPACE);
    root.set_attribute("xmlns:Bin", BIN_NAMESPACE);
    root.set_attribute("xmlns:CA", CA_NAMESPACE);
    root.set_attribute(
        "xsi:schemaLocation",
        format!(
            "{OME_NAMESPACE} {OME_NAMESPACE} {STD_NAMESPACE} {STD_NAMESPACE}"
        ),
    );
}
