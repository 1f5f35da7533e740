use crate::core::Table;
use crate::utils::error::Result;
use csv::ReaderBuilder;

/// 解析 CSV：第一列為表頭，其餘為資料列，所有儲存格都當字串處理
pub fn parse_csv(data: &[u8]) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        // csv 會略過完全空白的行，但單一空欄位的行仍需排除
        if record.len() == 1 && record.get(0).map_or(true, str::is_empty) {
            continue;
        }
        records.push(record.iter().map(str::to_string).collect::<Vec<String>>());
    }

    let mut rows = records.into_iter();
    let headers = rows.next().unwrap_or_default();
    let rows: Vec<Vec<String>> = rows.collect();

    tracing::debug!(
        "Parsed CSV with {} columns and {} rows",
        headers.len(),
        rows.len()
    );

    Ok(Table::new(headers, rows))
}

pub fn parse_csv_named(file_name: &str, data: &[u8]) -> Result<Table> {
    Ok(parse_csv(data)?.with_file_name(file_name))
}
