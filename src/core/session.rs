use crate::core::{
    derive, export, ingest, mapping, ApplyReport, ColumnMapping, DerivedColumnSpec,
    DispatchReceipt, OperationForm, Record, Table, Transport,
};
use crate::utils::error::{MapperError, Result};

/// 單一使用者的工作階段：兩份表格、欄位對應、待套用的衍生欄位與傳送狀態
#[derive(Debug, Default)]
pub struct Session {
    primary: Table,
    reference: Table,
    mapping: ColumnMapping,
    form: OperationForm,
    pending: Vec<DerivedColumnSpec>,
    next_operation_id: u64,
    loading: bool,
    last_receipt: Option<DispatchReceipt>,
    last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary(&self) -> &Table {
        &self.primary
    }

    pub fn reference(&self) -> &Table {
        &self.reference
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn pending_operations(&self) -> &[DerivedColumnSpec] {
        &self.pending
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_receipt(&self) -> Option<&DispatchReceipt> {
        self.last_receipt.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replaces the primary table and recomputes the mapping when a
    /// reference table is already loaded.
    pub fn load_primary(&mut self, table: Table) {
        tracing::info!(
            "📄 Primary CSV '{}' loaded ({} records)",
            table.file_name,
            table.rows.len()
        );
        self.primary = table;
        self.refresh_auto_mapping();
    }

    pub fn load_reference(&mut self, table: Table) {
        tracing::info!(
            "📄 Reference CSV '{}' loaded ({} fields)",
            table.file_name,
            table.headers.len()
        );
        self.reference = table;
        self.refresh_auto_mapping();
    }

    pub fn load_primary_csv(&mut self, file_name: &str, data: &[u8]) -> Result<()> {
        let table = ingest::parse_csv_named(file_name, data)?;
        self.load_primary(table);
        Ok(())
    }

    pub fn load_reference_csv(&mut self, file_name: &str, data: &[u8]) -> Result<()> {
        let table = ingest::parse_csv_named(file_name, data)?;
        self.load_reference(table);
        Ok(())
    }

    fn refresh_auto_mapping(&mut self) {
        if !self.primary.headers.is_empty() && !self.reference.headers.is_empty() {
            self.mapping = mapping::auto_map(&self.primary.headers, &self.reference.headers);
        }
    }

    /// Sets one mapping entry. An empty name means "no change" and removes
    /// the entry.
    pub fn update_field_mapping(&mut self, column_index: usize, field_name: &str) -> Result<()> {
        if column_index >= self.primary.headers.len() {
            return Err(MapperError::ValidationError {
                message: format!(
                    "Column index {} is out of range ({} primary columns)",
                    column_index,
                    self.primary.headers.len()
                ),
            });
        }

        if field_name.is_empty() {
            self.mapping.remove(&column_index);
            return Ok(());
        }

        if !self.reference.headers.iter().any(|h| h == field_name) {
            return Err(MapperError::ValidationError {
                message: format!("'{}' is not a reference field", field_name),
            });
        }

        self.mapping.insert(column_index, field_name.to_string());
        Ok(())
    }

    pub fn clear_mappings(&mut self) {
        self.mapping.clear();
    }

    pub fn apply_mapping(&mut self) {
        mapping::apply_mapping(&mut self.primary, &self.mapping);
        tracing::info!("✅ Applied {} field mappings", self.mapping.len());
    }

    pub fn update_cell(&mut self, row: usize, col: usize, value: impl Into<String>) -> Result<()> {
        let cell = self
            .primary
            .rows
            .get_mut(row)
            .and_then(|cells| cells.get_mut(col))
            .ok_or_else(|| MapperError::ValidationError {
                message: format!("No cell at row {}, column {}", row, col),
            })?;
        *cell = value.into();
        Ok(())
    }

    pub fn numeric_fields(&self) -> Vec<String> {
        derive::numeric_fields(&self.primary)
    }

    pub fn form_mut(&mut self) -> &mut OperationForm {
        &mut self.form
    }

    /// Queues the draft form and resets it on success.
    pub fn submit_form(&mut self) -> Result<u64> {
        let id = self.add_operation(self.form.clone())?;
        self.form = OperationForm::default();
        Ok(id)
    }

    pub fn add_operation(&mut self, form: OperationForm) -> Result<u64> {
        let spec = derive::validate_form(&form, self.next_operation_id + 1)?;
        self.next_operation_id = spec.id;
        tracing::debug!("Queued derived column {:?}", spec);
        self.pending.push(spec);
        Ok(self.next_operation_id)
    }

    pub fn remove_operation(&mut self, id: u64) {
        self.pending.retain(|spec| spec.id != id);
    }

    /// Runs the whole pending batch against the primary table, then empties
    /// the pending list.
    pub fn apply_operations(&mut self) -> ApplyReport {
        let specs = std::mem::take(&mut self.pending);
        derive::apply_operations(&mut self.primary, &specs)
    }

    pub fn records(&self) -> Vec<Record> {
        export::to_records(&self.primary)
    }

    pub fn preview(&self) -> Vec<Record> {
        export::preview_records(&self.primary)
    }

    /// `&mut self` keeps a single dispatch in flight per session; `loading`
    /// is set for the duration of the request and cleared on every path.
    pub async fn send<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<DispatchReceipt> {
        if self.primary.is_empty() {
            self.last_error = Some(MapperError::NoDataError.user_friendly_message());
            return Err(MapperError::NoDataError);
        }

        self.loading = true;
        self.last_error = None;
        self.last_receipt = None;

        let records = self.records();
        let outcome = transport.send(&records).await;
        self.loading = false;

        match outcome {
            Ok(receipt) => {
                self.last_receipt = Some(receipt.clone());
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!("❌ API Error: {}", e);
                self.last_error = Some(e.user_friendly_message());
                Err(e)
            }
        }
    }
}
