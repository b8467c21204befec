// Adapters layer: concrete implementations of the host collaborator ports.

pub mod http;
pub mod template;

pub use http::ReqwestTransport;
pub use template::StaticTemplateSrv;
