// ==========================================
// 生产线平衡引擎 - 导入层
// ==========================================
// 职责: 外部工序清单导入,生成产品工序数据
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod operation_importer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use field_mapper::{FieldMapper, MappedOperationRow};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRow, UniversalFileParser};
pub use operation_importer::{ImportSummary, ImportWarning, OperationCatalogImporter};
