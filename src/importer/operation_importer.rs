// ==========================================
// 生产线平衡引擎 - 工序清单导入器
// ==========================================
// 职责: 整合导入流程,从文件到工序清单表
// 流程: 解析 → 表头检查 → 映射 → 校验 → 整体替换落库
// 红线: 任一行出错则整批拒绝,不落库
// ==========================================

use crate::domain::operation::Operation;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{FieldMapper, FIELD_OPERATION_ID, FIELD_SAM};
use crate::importer::file_parser::{RawRow, UniversalFileParser};
use crate::repository::OperationCatalogRepository;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 导入告警（不阻断导入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportWarning {
    pub row_number: usize,
    pub operation_id: String,
    pub message: String,
}

/// 导入结果摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub batch_id: String,
    pub product_id: String,
    pub imported: usize,
    pub warnings: Vec<ImportWarning>,
    pub elapsed_ms: u64,
}

// ==========================================
// OperationCatalogImporter - 工序清单导入器
// ==========================================
pub struct OperationCatalogImporter {
    repo: Arc<OperationCatalogRepository>,
    parser: UniversalFileParser,
    mapper: FieldMapper,
}

impl OperationCatalogImporter {
    pub fn new(repo: Arc<OperationCatalogRepository>) -> Self {
        Self {
            repo,
            parser: UniversalFileParser,
            mapper: FieldMapper,
        }
    }

    /// 从文件导入产品工序清单（CSV / Excel）
    ///
    /// # 参数
    /// - `file_path`: 文件路径
    /// - `product_id`: 目标产品
    /// - `product_name`: 产品名称（None 时保留原名称）
    #[instrument(skip(self, file_path), fields(batch_id))]
    pub fn import_file<P: AsRef<Path>>(
        &self,
        file_path: P,
        product_id: &str,
        product_name: Option<&str>,
    ) -> ImportResult<ImportSummary> {
        let start = Instant::now();
        info!(file_path = %file_path.as_ref().display(), "开始导入工序清单");

        let rows = self.parser.parse(file_path.as_ref())?;
        debug!(total_rows = rows.len(), "文件解析完成");

        let mut summary = self.import_rows(rows, product_id, product_name)?;
        summary.elapsed_ms = start.elapsed().as_millis() as u64;
        Ok(summary)
    }

    /// 导入已解析的原始行
    pub fn import_rows(
        &self,
        rows: Vec<RawRow>,
        product_id: &str,
        product_name: Option<&str>,
    ) -> ImportResult<ImportSummary> {
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        let (operations, warnings) = self.build_operations(&rows)?;

        let imported = self
            .repo
            .replace_operations(product_id, product_name, &operations)?;

        info!(
            batch_id = %batch_id,
            product_id,
            imported,
            warnings = warnings.len(),
            "工序清单导入完成"
        );

        Ok(ImportSummary {
            batch_id,
            product_id: product_id.to_string(),
            imported,
            warnings,
            elapsed_ms: 0,
        })
    }

    /// 映射 + 校验,产出有序工序清单
    fn build_operations(
        &self,
        rows: &[RawRow],
    ) -> ImportResult<(Vec<Operation>, Vec<ImportWarning>)> {
        let Some((_, first)) = rows.first() else {
            return Err(ImportError::EmptyFile);
        };

        let headers: Vec<&String> = first.keys().collect();
        for required in [FIELD_OPERATION_ID, FIELD_SAM] {
            if !FieldMapper::has_column(&headers, required) {
                return Err(ImportError::MissingColumn(required.to_string()));
            }
        }

        let mut seen = HashSet::new();
        let mut operations = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();

        for (row_number, row) in rows {
            let mapped = self.mapper.map_row(row, *row_number)?;

            let operation_id = mapped
                .operation_id
                .ok_or(ImportError::PrimaryKeyMissing(*row_number))?;

            if !seen.insert(operation_id.clone()) {
                return Err(ImportError::DuplicateOperation {
                    row: *row_number,
                    operation_id,
                });
            }

            let operation = Operation::new(
                operation_id.clone(),
                mapped.name.unwrap_or_else(|| operation_id.clone()),
                mapped.process_id.unwrap_or_default(),
                mapped.standard_time_minutes,
            );

            if !operation.is_producible() {
                warn!(
                    row_number = *row_number,
                    operation_id = %operation_id,
                    sam = operation.standard_time_minutes,
                    "标准工时无法折算为小时产能,工序将不可分配"
                );
                warnings.push(ImportWarning {
                    row_number: *row_number,
                    operation_id,
                    message: format!(
                        "标准工时无法折算为小时产能: {}",
                        operation.standard_time_minutes
                    ),
                });
            }

            operations.push(operation);
        }

        Ok((operations, warnings))
    }
}
