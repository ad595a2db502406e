//! Pure descriptor records: catalog data for a feature's commands, events,
//! and properties, independent of how they are dispatched or stored.

use hdc_proto::dtype::DataType;

use crate::exception::ExceptionDescriptor;

/// Catalog entry for a command: its argument/return dtypes and the
/// exceptions it may raise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// CommandID, unique within the owning feature.
    pub id: u8,
    /// Identifier-style name.
    pub name: String,
    /// Declared argument data types, in wire order.
    pub args: Vec<DataType>,
    /// Declared return-value data types, in wire order.
    pub returns: Vec<DataType>,
    /// Exceptions the command may raise (sanity-checked, not enforced).
    pub raises: Vec<ExceptionDescriptor>,
    /// Optional human-readable documentation.
    pub doc: Option<String>,
}

impl CommandDescriptor {
    /// Build a descriptor with no declared exceptions or documentation.
    #[must_use]
    pub fn new(id: u8, name: impl Into<String>, args: Vec<DataType>, returns: Vec<DataType>) -> Self {
        Self { id, name: name.into(), args, returns, raises: Vec::new(), doc: None }
    }

    /// Attach the catalog of exceptions this command may raise.
    #[must_use]
    pub fn with_raises(mut self, raises: Vec<ExceptionDescriptor>) -> Self {
        self.raises = raises;
        self
    }

    /// Attach documentation.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// Catalog entry for an asynchronous device-to-host notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDescriptor {
    /// EventID, unique within the owning feature.
    pub id: u8,
    /// Identifier-style name.
    pub name: String,
    /// Declared argument data types, in wire order.
    pub args: Vec<DataType>,
    /// Optional human-readable documentation.
    pub doc: Option<String>,
}

impl EventDescriptor {
    /// Build a descriptor with no documentation.
    #[must_use]
    pub fn new(id: u8, name: impl Into<String>, args: Vec<DataType>) -> Self {
        Self { id, name: name.into(), args, doc: None }
    }

    /// Attach documentation.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// Whether a property accepts `SetPropertyValue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyAccess {
    /// Readable only; `SetPropertyValue` fails with `ReadOnlyProperty`.
    ReadOnly,
    /// Readable and writable.
    ReadWrite,
}

/// Catalog entry for typed, named feature state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// PropertyID, unique within the owning feature.
    pub id: u8,
    /// Identifier-style name.
    pub name: String,
    /// The property's single data type (properties are always scalar).
    pub dtype: DataType,
    /// Read-only vs. read-write.
    pub access: PropertyAccess,
    /// Optional human-readable documentation.
    pub doc: Option<String>,
}

impl PropertyDescriptor {
    /// Build a descriptor with no documentation.
    #[must_use]
    pub fn new(id: u8, name: impl Into<String>, dtype: DataType, access: PropertyAccess) -> Self {
        Self { id, name: name.into(), dtype, access, doc: None }
    }

    /// Attach documentation.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// `true` if `SetPropertyValue` should be rejected for this property.
    #[must_use]
    pub fn is_readonly(&self) -> bool {
        matches!(self.access, PropertyAccess::ReadOnly)
    }
}
