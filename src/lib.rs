//! gridview: a schema-driven table engine with a terminal viewer on top

pub mod table;
