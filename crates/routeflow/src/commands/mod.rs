pub mod apply;
pub mod destroy;
pub mod import;
pub mod plan;
pub mod routes;
pub mod settings;
pub mod targets;
