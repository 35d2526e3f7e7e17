// Domain layer: core models and ports (interfaces) shared by adapters, pipelines and the HTTP server.

pub mod model;
pub mod ports;
