//! PostgreSQL DDL 生成

use super::column::{Column, ColumnDefault, ColumnType, Identity};
use super::table::Table;

/// 用双引号包裹标识符，内部的双引号加倍
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn type_sql(column_type: &ColumnType) -> String {
    match column_type {
        ColumnType::Integer => "integer".to_string(),
        ColumnType::Varchar { length } => format!("varchar({})", length),
        ColumnType::Timestamp => "timestamp".to_string(),
    }
}

pub fn column_sql(column: &Column) -> String {
    let mut parts = vec![quote_identifier(&column.name), type_sql(&column.column_type)];

    if column.primary_key {
        parts.push("PRIMARY KEY".to_string());
    }
    if let Some(Identity::Always) = column.identity {
        parts.push("GENERATED ALWAYS AS IDENTITY".to_string());
    }
    // PRIMARY KEY 已隐含 NOT NULL
    if column.not_null && !column.primary_key {
        parts.push("NOT NULL".to_string());
    }
    if column.unique {
        parts.push("UNIQUE".to_string());
    }
    if let Some(ColumnDefault::Now) = column.default {
        parts.push("DEFAULT now()".to_string());
    }

    parts.join(" ")
}

pub fn create_table_sql(table: &Table) -> String {
    let columns: Vec<String> = table
        .columns()
        .iter()
        .map(|c| format!("    {}", column_sql(c)))
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        quote_identifier(table.name()),
        columns.join(",\n")
    )
}

pub fn drop_table_sql(table: &Table) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_identifier(table.name()))
}

/// 表声明的 JSON 快照
pub fn to_json(table: &Table) -> serde_json::Result<String> {
    serde_json::to_string_pretty(table)
}
