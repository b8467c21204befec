pub mod datasource;

pub use crate::domain::model::{
    AdhocFilter, AnnotationQueryRequest, QueryRequest, QueryTarget, TemplateVariable,
    TextValuePair,
};
pub use crate::domain::ports::{AdhocFilterSource, HttpTransport, TemplateSrv};
pub use crate::utils::error::Result;
pub use datasource::DataSource;
