//! Declarative option schema and the registry built from it.

pub mod call;
pub mod descriptor;
pub mod naming;
pub mod registry;

pub use call::{ArgValue, OptionCall};
pub use descriptor::{
    ArgContract, ArgSpec, ArgType, Deprecation, OptionDescriptor, OptionFlags, Schema, Setter,
};
pub use registry::OptionRegistry;
