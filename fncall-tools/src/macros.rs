//! Attribute macros for declaring functions.

pub use fncall_tools_macros::tool;
