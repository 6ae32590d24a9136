// ==========================================
// 生产线平衡引擎 - 工序字段映射器
// ==========================================
// 职责: 源列名（中/英别名）→ 工序字段 + 类型转换
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use std::collections::HashMap;

/// 标准字段: 工序编号
pub const FIELD_OPERATION_ID: &str = "工序编号";
/// 标准字段: 工序名称
pub const FIELD_NAME: &str = "工序名称";
/// 标准字段: 工艺类别
pub const FIELD_PROCESS_ID: &str = "工艺类别";
/// 标准字段: 标准工时（分钟/件）
pub const FIELD_SAM: &str = "标准工时";

/// 映射后的工序行（尚未做质量校验）
#[derive(Debug, Clone, PartialEq)]
pub struct MappedOperationRow {
    pub row_number: usize,
    pub operation_id: Option<String>,
    pub name: Option<String>,
    pub process_id: Option<String>,
    pub standard_time_minutes: f64,
}

pub struct FieldMapper;

impl FieldMapper {
    /// 标准字段的可接受列名
    fn aliases(key: &str) -> &'static [&'static str] {
        match key {
            FIELD_OPERATION_ID => &["工序编号", "工序号", "operation_id", "id"],
            FIELD_NAME => &["工序名称", "name", "operation_name"],
            FIELD_PROCESS_ID => &["工艺类别", "工艺", "process_id", "process"],
            FIELD_SAM => &["标准工时", "SAM", "sam", "standard_time"],
            _ => &[],
        }
    }

    /// 检查表头是否包含某标准字段（任一别名）
    pub fn has_column(headers: &[&String], key: &str) -> bool {
        Self::aliases(key)
            .iter()
            .any(|alias| headers.iter().any(|h| h.as_str() == *alias))
    }

    /// 映射单行
    pub fn map_row(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<MappedOperationRow> {
        Ok(MappedOperationRow {
            row_number,
            operation_id: self.get_string(row, FIELD_OPERATION_ID),
            name: self.get_string(row, FIELD_NAME),
            process_id: self.get_string(row, FIELD_PROCESS_ID),
            standard_time_minutes: self.parse_f64(row, FIELD_SAM, row_number)?,
        })
    }

    fn get_string(&self, row: &HashMap<String, String>, key: &str) -> Option<String> {
        for alias in Self::aliases(key) {
            if let Some(v) = row.get(*alias) {
                let trimmed = v.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
        None
    }

    fn parse_f64(
        &self,
        row: &HashMap<String, String>,
        key: &str,
        row_number: usize,
    ) -> ImportResult<f64> {
        let raw = self
            .get_string(row, key)
            .ok_or_else(|| ImportError::TypeConversionError {
                row: row_number,
                field: key.to_string(),
                message: "值为空".to_string(),
            })?;

        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ImportError::TypeConversionError {
                row: row_number,
                field: key.to_string(),
                message: format!("无法解析为数值: {}", raw),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_map_row_with_english_headers() {
        let mapped = FieldMapper
            .map_row(
                &row(&[("operation_id", "O1"), ("name", "合缝"), ("sam", " 1.25 ")]),
                2,
            )
            .unwrap();

        assert_eq!(mapped.operation_id.as_deref(), Some("O1"));
        assert_eq!(mapped.name.as_deref(), Some("合缝"));
        assert_eq!(mapped.process_id, None);
        assert!((mapped.standard_time_minutes - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_map_row_rejects_bad_sam() {
        let err = FieldMapper
            .map_row(&row(&[("工序编号", "O1"), ("标准工时", "abc")]), 5)
            .unwrap_err();

        match err {
            ImportError::TypeConversionError { row, field, .. } => {
                assert_eq!(row, 5);
                assert_eq!(field, FIELD_SAM);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
