use crate::domain::model::{
    ColumnMapping, DispatchReceipt, OperationForm, Record, SourceTables, TransformResult,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn primary_file(&self) -> &str;
    fn reference_file(&self) -> &str;
    fn output_path(&self) -> Option<&str>;
    fn auto_map(&self) -> bool;
    fn apply_mapping(&self) -> bool;
    fn mapping_overrides(&self) -> ColumnMapping;
    fn derived_columns(&self) -> Vec<OperationForm>;
    fn timeout_seconds(&self) -> Option<u64>;

    fn request_headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// 把 JSON 陣列送到外部端點的傳輸層
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, records: &[Record]) -> Result<DispatchReceipt>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<SourceTables>;
    async fn transform(&self, tables: SourceTables) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<DispatchReceipt>;
}
