use crate::core::{DispatchReceipt, Pipeline, Record, TransformResult};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        let monitor = SystemMonitor::new(monitor_enabled);
        if monitor.is_enabled() {
            tracing::debug!("System monitor attached to engine");
        }
        Self { pipeline, monitor }
    }

    async fn extract_and_transform(&self) -> Result<TransformResult> {
        tracing::info!("📥 Loading CSV files...");
        let tables = self.pipeline.extract().await?;
        tracing::info!(
            "Loaded primary ({} rows, {} columns) and reference ({} fields)",
            tables.primary.rows.len(),
            tables.primary.headers.len(),
            tables.reference.headers.len()
        );
        self.monitor.log_stats("Extract", tables.primary.rows.len());

        tracing::info!("🔄 Mapping and transforming...");
        let result = self.pipeline.transform(tables).await?;
        tracing::info!(
            "Transformed {} records with {} columns",
            result.records.len(),
            result.table.headers.len()
        );
        self.monitor.log_stats("Transform", result.records.len());

        Ok(result)
    }

    pub async fn run(&self) -> Result<DispatchReceipt> {
        tracing::info!("🚀 Starting CSV mapping process...");

        let result = self.extract_and_transform().await?;
        self.dispatch(result).await
    }

    /// 送出已轉換好的結果，預覽過的資料不必重新讀取與轉換
    pub async fn dispatch(&self, result: TransformResult) -> Result<DispatchReceipt> {
        let record_count = result.records.len();

        tracing::info!("📤 Sending data to backend...");
        let receipt = self.pipeline.load(result).await;
        self.monitor.log_stats("Load", record_count);
        self.monitor.log_final_stats();

        let receipt = receipt?;
        tracing::info!(
            "✅ Backend responded with status {} for {} records",
            receipt.status,
            receipt.record_count
        );
        Ok(receipt)
    }

    /// 只執行讀取與轉換，回傳前幾筆預覽資料
    pub async fn dry_run(&self) -> Result<(TransformResult, Vec<Record>)> {
        tracing::info!("🔍 Preparing preview, nothing is sent at this step");
        let result = self.extract_and_transform().await?;
        let preview = crate::core::export::preview_records(&result.table);
        self.monitor.log_final_stats();
        Ok((result, preview))
    }
}
