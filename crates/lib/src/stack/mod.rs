//! Stack and component model.
//!
//! A [`Stack`] is the validated, in-memory description of one deployable
//! application. Components are keyed by id in a [`BTreeMap`] so iteration order
//! (and therefore every report) is stable.

mod load;
mod types;
mod validate;

pub use load::{LoadError, load_stack, parse_stack};
pub use types::{BuildDescriptor, Component, ComponentKind, Stack};
pub use validate::{ValidationError, ValidationErrors};
pub(crate) use validate::valid_id;
