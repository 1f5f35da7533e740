pub mod derive;
pub mod etl;
pub mod export;
pub mod ingest;
pub mod mapping;
pub mod pipeline;
pub mod session;
pub mod transport;

pub use crate::domain::model::{
    ApplyReport, ColumnMapping, DerivedColumnSpec, DispatchReceipt, OperationForm, Operator,
    Record, SkipReason, SourceTables, Table, TransformResult,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage, Transport};
pub use crate::utils::error::Result;
