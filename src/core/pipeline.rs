use crate::core::session::Session;
use crate::core::transport::HttpTransport;
use crate::core::{
    ingest, ConfigProvider, DispatchReceipt, Pipeline, SourceTables, Storage, Transport,
    TransformResult,
};
use crate::utils::error::{MapperError, Result};
use std::path::Path;

/// 讀取兩份 CSV、套用欄位對應與衍生欄位，再把結果送到後端
pub struct MappingPipeline<S: Storage, C: ConfigProvider, T: Transport> {
    storage: S,
    config: C,
    transport: T,
}

impl<S: Storage, C: ConfigProvider> MappingPipeline<S, C, HttpTransport> {
    pub fn with_http(storage: S, config: C) -> Self {
        let transport = HttpTransport::from_config(&config);
        Self::new(storage, config, transport)
    }
}

impl<S: Storage, C: ConfigProvider, T: Transport> MappingPipeline<S, C, T> {
    pub fn new(storage: S, config: C, transport: T) -> Self {
        Self {
            storage,
            config,
            transport,
        }
    }

    async fn read_table(&self, path: &str) -> Result<crate::core::Table> {
        tracing::debug!("Reading CSV from storage: {}", path);
        let data = self.storage.read_file(path).await?;
        let file_name = Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(path);
        ingest::parse_csv_named(file_name, &data)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, T: Transport> Pipeline for MappingPipeline<S, C, T> {
    async fn extract(&self) -> Result<SourceTables> {
        let primary = self.read_table(self.config.primary_file()).await?;
        let reference = self.read_table(self.config.reference_file()).await?;

        Ok(SourceTables { primary, reference })
    }

    async fn transform(&self, tables: SourceTables) -> Result<TransformResult> {
        let mut session = Session::new();
        session.load_reference(tables.reference);
        session.load_primary(tables.primary);

        if !self.config.auto_map() {
            tracing::info!("🔧 Auto-mapping disabled, starting from an empty mapping");
            session.clear_mappings();
        }

        for (index, field) in self.config.mapping_overrides() {
            session
                .update_field_mapping(index, &field)
                .map_err(|e| MapperError::ConfigError {
                    message: format!("Invalid mapping override {}={}: {}", index, field, e),
                })?;
        }

        let mapping = session.mapping().clone();
        for (index, field) in &mapping {
            tracing::info!(
                "🔄 {} → {}",
                session.primary().headers.get(*index).map(String::as_str).unwrap_or("?"),
                field
            );
        }

        if self.config.apply_mapping() {
            session.apply_mapping();
        }

        for form in self.config.derived_columns() {
            session.add_operation(form)?;
        }
        let report = session.apply_operations();
        if !report.skipped.is_empty() {
            tracing::warn!("⚠️ {} derived columns were skipped", report.skipped.len());
        }

        let records = session.records();
        Ok(TransformResult {
            table: session.primary().clone(),
            mapping,
            report,
            records,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<DispatchReceipt> {
        if result.records.is_empty() {
            return Err(MapperError::NoDataError);
        }

        if let Some(output_path) = self.config.output_path() {
            let json = serde_json::to_string_pretty(&result.records)?;
            self.storage.write_file(output_path, json.as_bytes()).await?;
            tracing::info!("💾 Records written to {}", output_path);
        }

        self.transport.send(&result.records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnMapping, OperationForm, Operator};
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put(&self, path: &str, data: &str) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.as_bytes().to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                MapperError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        api_endpoint: String,
        output_path: Option<String>,
        auto_map: bool,
        apply_mapping: bool,
        overrides: ColumnMapping,
        derived: Vec<OperationForm>,
    }

    impl MockConfig {
        fn new(api_endpoint: String) -> Self {
            Self {
                api_endpoint,
                output_path: None,
                auto_map: true,
                apply_mapping: true,
                overrides: ColumnMapping::new(),
                derived: vec![],
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn api_endpoint(&self) -> &str {
            &self.api_endpoint
        }

        fn primary_file(&self) -> &str {
            "primary.csv"
        }

        fn reference_file(&self) -> &str {
            "reference.csv"
        }

        fn output_path(&self) -> Option<&str> {
            self.output_path.as_deref()
        }

        fn auto_map(&self) -> bool {
            self.auto_map
        }

        fn apply_mapping(&self) -> bool {
            self.apply_mapping
        }

        fn mapping_overrides(&self) -> ColumnMapping {
            self.overrides.clone()
        }

        fn derived_columns(&self) -> Vec<OperationForm> {
            self.derived.clone()
        }

        fn timeout_seconds(&self) -> Option<u64> {
            None
        }
    }

    async fn storage_with_files() -> MockStorage {
        let storage = MockStorage::new();
        storage
            .put("primary.csv", "Name,Qty\nWidget,10\nGadget,4\n")
            .await;
        storage.put("reference.csv", "name,quantity,sku\n").await;
        storage
    }

    #[tokio::test]
    async fn test_extract_reads_both_tables() {
        let storage = storage_with_files().await;
        let pipeline = MappingPipeline::with_http(storage, MockConfig::new("http://test.com".into()));

        let tables = pipeline.extract().await.unwrap();
        assert_eq!(tables.primary.file_name, "primary.csv");
        assert_eq!(tables.primary.rows.len(), 2);
        assert_eq!(tables.reference.headers, vec!["name", "quantity", "sku"]);
    }

    #[tokio::test]
    async fn test_extract_missing_file() {
        let storage = MockStorage::new();
        let pipeline = MappingPipeline::with_http(storage, MockConfig::new("http://test.com".into()));

        assert!(matches!(
            pipeline.extract().await,
            Err(MapperError::IoError(_))
        ));
    }

    #[tokio::test]
    async fn test_transform_applies_mapping_overrides_and_derived_columns() {
        let storage = storage_with_files().await;
        let mut config = MockConfig::new("http://test.com".into());
        config.overrides.insert(1, "quantity".to_string());
        config.derived = vec![OperationForm::new("quantity", Operator::Multiply, "3", "Total")];
        let pipeline = MappingPipeline::with_http(storage, config);

        let tables = pipeline.extract().await.unwrap();
        let result = pipeline.transform(tables).await.unwrap();

        assert_eq!(result.mapping[&0], "name");
        assert_eq!(result.mapping[&1], "quantity");
        assert_eq!(result.table.headers, vec!["name", "quantity", "Total"]);
        assert_eq!(result.records[0].get("Total"), Some("30.00"));
        assert_eq!(result.records[1].get("Total"), Some("12.00"));
        assert_eq!(result.report.applied.len(), 1);
    }

    #[tokio::test]
    async fn test_transform_without_auto_map_or_apply() {
        let storage = storage_with_files().await;
        let mut config = MockConfig::new("http://test.com".into());
        config.auto_map = false;
        config.apply_mapping = false;
        let pipeline = MappingPipeline::with_http(storage, config);

        let tables = pipeline.extract().await.unwrap();
        let result = pipeline.transform(tables).await.unwrap();

        assert!(result.mapping.is_empty());
        assert_eq!(result.table.headers, vec!["Name", "Qty"]);
    }

    #[tokio::test]
    async fn test_transform_rejects_unknown_override() {
        let storage = storage_with_files().await;
        let mut config = MockConfig::new("http://test.com".into());
        config.overrides.insert(0, "price".to_string());
        let pipeline = MappingPipeline::with_http(storage, config);

        let tables = pipeline.extract().await.unwrap();
        assert!(matches!(
            pipeline.transform(tables).await,
            Err(MapperError::ConfigError { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_writes_output_and_posts() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/process-data")
                .json_body(serde_json::json!([
                    {"name": "Widget", "Qty": "10"},
                    {"name": "Gadget", "Qty": "4"}
                ]));
            then.status(200)
                .json_body(serde_json::json!({"success": true}));
        });

        let storage = storage_with_files().await;
        let mut config = MockConfig::new(server.url("/api/process-data"));
        config.output_path = Some("out/records.json".to_string());
        let pipeline = MappingPipeline::with_http(storage.clone(), config);

        let tables = pipeline.extract().await.unwrap();
        let result = pipeline.transform(tables).await.unwrap();
        let receipt = pipeline.load(result).await.unwrap();

        api_mock.assert();
        assert_eq!(receipt.record_count, 2);

        let written = storage.get_file("out/records.json").await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(parsed[1]["name"], "Gadget");
    }

    #[tokio::test]
    async fn test_load_with_no_rows() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/api/process-data");
            then.status(200).json_body(serde_json::json!({}));
        });

        let storage = MockStorage::new();
        storage.put("primary.csv", "Name,Qty\n").await;
        storage.put("reference.csv", "name\n").await;
        let pipeline =
            MappingPipeline::with_http(storage, MockConfig::new(server.url("/api/process-data")));

        let tables = pipeline.extract().await.unwrap();
        let result = pipeline.transform(tables).await.unwrap();

        assert!(matches!(
            pipeline.load(result).await,
            Err(MapperError::NoDataError)
        ));
        assert_eq!(api_mock.hits(), 0);
    }
}
