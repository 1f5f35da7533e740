use crate::core::{ApplyReport, DerivedColumnSpec, OperationForm, SkipReason, Table};
use crate::utils::error::{MapperError, Result};

/// Rows sampled per column when guessing numeric fields.
pub const NUMERIC_SAMPLE_ROWS: usize = 5;

/// Lenient prefix parse: leading whitespace is skipped and the longest
/// numeric prefix is used, so `"12abc"` is 12 and `"abc"` is `None`.
pub fn parse_leading_float(value: &str) -> Option<f64> {
    let s = value.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    // 指數部分只有在後面接數字時才算
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

fn numeric_or_zero(value: Option<&str>) -> f64 {
    value
        .and_then(parse_leading_float)
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Two decimals, without a negative zero.
pub fn format_cell(value: f64) -> String {
    let value = if value == 0.0 || !value.is_finite() {
        0.0
    } else {
        value
    };
    let formatted = format!("{:.2}", value);
    if formatted == "-0.00" {
        "0.00".to_string()
    } else {
        formatted
    }
}

/// 前 5 列中至少有一個值可解析為有限浮點數的欄位
pub fn numeric_fields(table: &Table) -> Vec<String> {
    table
        .headers
        .iter()
        .enumerate()
        .filter(|(index, _)| {
            table
                .rows
                .iter()
                .take(NUMERIC_SAMPLE_ROWS)
                .filter_map(|row| row.get(*index))
                .any(|cell| parse_leading_float(cell).is_some_and(f64::is_finite))
        })
        .map(|(_, header)| header.clone())
        .collect()
}

/// Checks that every field of the form is filled in and turns it into a spec.
pub fn validate_form(form: &OperationForm, id: u64) -> Result<DerivedColumnSpec> {
    let mut missing = Vec::new();
    if form.source_field.is_empty() {
        missing.push("source field");
    }
    if form.operator.is_none() {
        missing.push("operator");
    }
    if form.operand.is_empty() {
        missing.push("value");
    }
    if form.new_field_name.is_empty() {
        missing.push("new field name");
    }

    match form.operator {
        Some(operator) if missing.is_empty() => Ok(DerivedColumnSpec {
            id,
            source_field: form.source_field.clone(),
            operator,
            operand: form.operand.clone(),
            new_field_name: form.new_field_name.clone(),
        }),
        _ => Err(MapperError::ValidationError {
            message: format!("Please fill in all fields (missing: {})", missing.join(", ")),
        }),
    }
}

/// Appends one column per spec, in order. Source fields resolve against the
/// headers as they were when the batch started; a spec whose source is
/// unknown or whose target already exists is skipped. Never fails.
pub fn apply_operations(table: &mut Table, specs: &[DerivedColumnSpec]) -> ApplyReport {
    let snapshot = table.headers.clone();
    let mut report = ApplyReport::default();

    for spec in specs {
        let Some(source_index) = snapshot.iter().position(|h| *h == spec.source_field) else {
            tracing::warn!(
                "⚠️ Skipping derived column '{}': source field '{}' not found",
                spec.new_field_name,
                spec.source_field
            );
            report.skipped.push((spec.id, SkipReason::UnknownSourceField));
            continue;
        };

        if table.headers.contains(&spec.new_field_name) {
            tracing::warn!(
                "⚠️ Skipping derived column '{}': field already exists",
                spec.new_field_name
            );
            report.skipped.push((spec.id, SkipReason::TargetExists));
            continue;
        }

        let operand = numeric_or_zero(Some(spec.operand.as_str()));
        table.headers.push(spec.new_field_name.clone());

        // 短列不補齊，新值直接接在該列最後一格之後
        for row in &mut table.rows {
            let source = numeric_or_zero(row.get(source_index).map(String::as_str));
            row.push(format_cell(spec.operator.apply(source, operand)));
        }

        tracing::info!(
            "➕ Added column '{}' = {} {} {}",
            spec.new_field_name,
            spec.source_field,
            spec.operator,
            spec.operand
        );
        report.applied.push(spec.id);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Operator;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn spec(id: u64, source: &str, operator: Operator, operand: &str, new: &str) -> DerivedColumnSpec {
        DerivedColumnSpec {
            id,
            source_field: source.to_string(),
            operator,
            operand: operand.to_string(),
            new_field_name: new.to_string(),
        }
    }

    #[test]
    fn test_parse_leading_float() {
        assert_eq!(parse_leading_float("10"), Some(10.0));
        assert_eq!(parse_leading_float("  -2.5"), Some(-2.5));
        assert_eq!(parse_leading_float("12abc"), Some(12.0));
        assert_eq!(parse_leading_float(".5"), Some(0.5));
        assert_eq!(parse_leading_float("5."), Some(5.0));
        assert_eq!(parse_leading_float("1e3x"), Some(1000.0));
        assert_eq!(parse_leading_float("1e"), Some(1.0));
        assert_eq!(parse_leading_float(""), None);
        assert_eq!(parse_leading_float("   "), None);
        assert_eq!(parse_leading_float("abc"), None);
        assert_eq!(parse_leading_float("-"), None);
        assert_eq!(parse_leading_float("."), None);
    }

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(30.0), "30.00");
        assert_eq!(format_cell(1.0 / 3.0), "0.33");
        assert_eq!(format_cell(-0.0), "0.00");
        assert_eq!(format_cell(-1.5), "-1.50");
    }

    #[test]
    fn test_numeric_fields_samples_first_five_rows() {
        let mut rows = vec![row(&["a", "1", "", "x"]); 5];
        rows.push(row(&["a", "1", "", "7"]));
        rows[2][0] = "12abc".to_string();
        let table = Table::new(row(&["Name", "Qty", "Empty", "Late"]), rows);

        assert_eq!(numeric_fields(&table), vec!["Name", "Qty"]);
    }

    #[test]
    fn test_validate_form_rejects_incomplete() {
        let mut form = OperationForm::new("Qty", Operator::Add, "1", "Next");
        assert!(validate_form(&form, 1).is_ok());

        form.operator = None;
        let err = validate_form(&form, 1).unwrap_err();
        assert!(err.to_string().contains("operator"));

        let empty = OperationForm::default();
        let err = validate_form(&empty, 1).unwrap_err();
        assert!(err.to_string().contains("source field"));
        assert!(err.to_string().contains("new field name"));
    }

    #[test]
    fn test_multiply_column() {
        let mut table = Table::new(row(&["Name", "Qty"]), vec![row(&["Widget", "10"])]);
        let report = apply_operations(
            &mut table,
            &[spec(1, "Qty", Operator::Multiply, "3", "Total")],
        );

        assert_eq!(report.applied, vec![1]);
        assert_eq!(table.headers, vec!["Name", "Qty", "Total"]);
        assert_eq!(table.rows[0], vec!["Widget", "10", "30.00"]);
    }

    #[test]
    fn test_every_operator() {
        let mut table = Table::new(row(&["v"]), vec![row(&["50"])]);
        let specs = vec![
            spec(1, "v", Operator::Add, "4", "add"),
            spec(2, "v", Operator::Subtract, "4", "sub"),
            spec(3, "v", Operator::Divide, "4", "div"),
            spec(4, "v", Operator::Divide, "0", "div0"),
            spec(5, "v", Operator::Percentage, "10", "pct"),
        ];
        apply_operations(&mut table, &specs);

        assert_eq!(
            table.rows[0],
            vec!["50", "54.00", "46.00", "12.50", "0.00", "5.00"]
        );
    }

    #[test]
    fn test_malformed_numbers_become_zero() {
        let mut table = Table::new(
            row(&["Qty"]),
            vec![row(&["abc"]), row(&[""]), row(&[]), row(&["7"])],
        );
        let report = apply_operations(
            &mut table,
            &[
                spec(1, "Qty", Operator::Add, "oops", "PlusNothing"),
                spec(2, "Qty", Operator::Add, "1", "PlusOne"),
            ],
        );

        assert_eq!(report.applied, vec![1, 2]);
        let plus_nothing: Vec<&str> = table.rows.iter().map(|r| r[1].as_str()).collect();
        let plus_one: Vec<&str> = table.rows.iter().map(|r| r[2].as_str()).collect();
        assert_eq!(plus_nothing, vec!["0.00", "0.00", "0.00", "7.00"]);
        assert_eq!(plus_one, vec!["1.00", "1.00", "1.00", "8.00"]);
    }

    #[test]
    fn test_short_rows_are_not_padded() {
        let mut table = Table::new(row(&["A", "B"]), vec![row(&["1"]), row(&["3", "x"])]);
        apply_operations(&mut table, &[spec(1, "A", Operator::Multiply, "2", "C")]);

        assert_eq!(table.headers, vec!["A", "B", "C"]);
        assert_eq!(table.rows[0], vec!["1", "2.00"]);
        assert_eq!(table.rows[1], vec!["3", "x", "6.00"]);
    }

    #[test]
    fn test_unknown_source_and_existing_target_are_skipped() {
        let mut table = Table::new(row(&["Qty"]), vec![row(&["2"])]);
        let report = apply_operations(
            &mut table,
            &[
                spec(1, "Missing", Operator::Add, "1", "X"),
                spec(2, "Qty", Operator::Add, "1", "Qty"),
                spec(3, "Qty", Operator::Add, "1", "Y"),
                spec(4, "Qty", Operator::Add, "2", "Y"),
            ],
        );

        assert_eq!(report.applied, vec![3]);
        assert_eq!(
            report.skipped,
            vec![
                (1, SkipReason::UnknownSourceField),
                (2, SkipReason::TargetExists),
                (4, SkipReason::TargetExists),
            ]
        );
        assert_eq!(table.headers, vec!["Qty", "Y"]);
    }

    #[test]
    fn test_no_chaining_within_a_batch() {
        let mut table = Table::new(row(&["Qty"]), vec![row(&["2"])]);
        let report = apply_operations(
            &mut table,
            &[
                spec(1, "Qty", Operator::Multiply, "2", "Double"),
                spec(2, "Double", Operator::Multiply, "2", "Quad"),
            ],
        );

        assert_eq!(report.applied, vec![1]);
        assert_eq!(report.skipped, vec![(2, SkipReason::UnknownSourceField)]);
        assert_eq!(table.headers, vec!["Qty", "Double"]);

        // 下一批次就看得到新欄位
        let report = apply_operations(
            &mut table,
            &[spec(2, "Double", Operator::Multiply, "2", "Quad")],
        );
        assert_eq!(report.applied, vec![2]);
        assert_eq!(table.rows[0], vec!["2", "4.00", "8.00"]);
    }

    #[test]
    fn test_rerun_is_noop() {
        let mut table = Table::new(row(&["Qty"]), vec![row(&["2"])]);
        let specs = vec![spec(1, "Qty", Operator::Add, "1", "Next")];
        apply_operations(&mut table, &specs);
        let after_first = table.clone();

        let report = apply_operations(&mut table, &specs);
        assert!(report.applied.is_empty());
        assert_eq!(table, after_first);
    }
}
