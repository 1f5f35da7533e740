use crate::core::{Record, Table};

pub const PREVIEW_RECORDS: usize = 3;

/// 將表格轉成 JSON 物件陣列，缺少或空的儲存格輸出為空字串
pub fn to_records(table: &Table) -> Vec<Record> {
    table
        .rows
        .iter()
        .map(|row| {
            let mut record = Record::new();
            for (index, header) in table.headers.iter().enumerate() {
                let value = row.get(index).map(String::as_str).unwrap_or("");
                record.insert(header.as_str(), value);
            }
            record
        })
        .collect()
}

pub fn preview_records(table: &Table) -> Vec<Record> {
    let head = Table {
        rows: table.rows.iter().take(PREVIEW_RECORDS).cloned().collect(),
        ..table.clone()
    };
    to_records(&head)
}
