//! Structural perception: what is on the page right now.
//!
//! [`StructuralPerceiver::capture`] walks the live document through the element locator and
//! returns an immutable [`PageSnapshot`] of visible inputs, text areas, buttons, dropdowns,
//! labels, open overlays, and validation errors. Each element carries a synthesized selector
//! for later re-resolution.

pub mod errors;
pub mod model;
pub mod selector;
pub mod structural;

pub use errors::PerceiverError;
pub use model::{
    Button, Dropdown, DropdownKind, InputField, Label, Modal, ModalKind, PageSnapshot,
    SnapshotLimits, TextArea,
};
pub use structural::StructuralPerceiver;
