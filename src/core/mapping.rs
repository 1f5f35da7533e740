use crate::core::{ColumnMapping, Table};

/// 自動欄位對應：每個主表頭取參考表頭中第一個（不分大小寫）互為子字串或相等者
pub fn auto_map(primary_headers: &[String], reference_headers: &[String]) -> ColumnMapping {
    let lowered_reference: Vec<String> = reference_headers
        .iter()
        .map(|h| h.to_lowercase())
        .collect();

    let mut mapping = ColumnMapping::new();
    for (index, primary_header) in primary_headers.iter().enumerate() {
        let primary_lower = primary_header.to_lowercase();
        let found = lowered_reference.iter().position(|ref_lower| {
            ref_lower.contains(&primary_lower)
                || primary_lower.contains(ref_lower.as_str())
                || *ref_lower == primary_lower
        });

        if let Some(ref_index) = found {
            mapping.insert(index, reference_headers[ref_index].clone());
        }
    }

    tracing::debug!(
        "Auto-mapped {} of {} primary columns",
        mapping.len(),
        primary_headers.len()
    );
    mapping
}

/// Rewrites `table.headers` in place. Empty names and indices past the last
/// header are ignored; rows are untouched.
pub fn apply_mapping(table: &mut Table, mapping: &ColumnMapping) {
    for (index, header) in table.headers.iter_mut().enumerate() {
        if let Some(name) = mapping.get(&index).filter(|name| !name.is_empty()) {
            if header != name {
                tracing::debug!("Renaming column {} '{}' -> '{}'", index, header, name);
                *header = name.clone();
            }
        }
    }
}
