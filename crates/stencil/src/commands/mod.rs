//! CLI command implementations.

pub(crate) mod fields;
pub(crate) mod render;

pub(crate) use fields::FieldsArgs;
pub(crate) use render::RenderArgs;
