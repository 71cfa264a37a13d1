//! 报表导出
//! 每个可导出的数据集实现 [`Report`]，由 CSV / PDF 渲染器输出字节

pub mod csv;
pub mod documents;
pub mod format;
pub mod pdf;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use documents::{
    AuditLogReport, DepartmentReport, EmployeeDetailReport, EmployeeListReport, JobTitleReport,
};

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Pdf,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "text/csv",
            ReportFormat::Pdf => "application/pdf",
        }
    }

    /// 审计文本中使用的格式名
    pub fn label(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "CSV",
            ReportFormat::Pdf => "PDF",
        }
    }
}

/// 报表错误类型
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(String),
}

/// 表格列：表头与相对宽度
#[derive(Debug, Clone)]
pub struct Column {
    pub header: &'static str,
    pub weight: f32,
}

impl Column {
    pub const fn new(header: &'static str, weight: f32) -> Self {
        Self { header, weight }
    }
}

/// 标签/值分组（详情报表）
#[derive(Debug, Clone)]
pub struct Section {
    pub heading: &'static str,
    pub fields: Vec<(&'static str, String)>,
}

/// 可导出的数据集
pub trait Report {
    /// 标题，例如 "Employee Report"
    fn title(&self) -> String;

    /// 标题下方的信息行，例如 "Total Employees: 12"
    fn info(&self) -> Option<String> {
        None
    }

    /// 汇总统计块
    fn summary(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// PDF 表格列
    fn columns(&self) -> Vec<Column> {
        Vec::new()
    }

    /// PDF 表格行，与 `columns` 一一对应
    fn rows(&self) -> Vec<Vec<String>> {
        Vec::new()
    }

    /// 详情分组；列表类报表为空
    fn sections(&self) -> Vec<Section> {
        Vec::new()
    }

    /// CSV 表头，默认与 PDF 列一致
    fn csv_headers(&self) -> Vec<&'static str> {
        self.columns().iter().map(|c| c.header).collect()
    }

    /// CSV 数据行，默认与 PDF 行一致
    fn csv_rows(&self) -> Vec<Vec<String>> {
        self.rows()
    }
}

/// 导出结果：文件名、内容类型与内容
#[derive(Debug, Clone)]
pub struct ReportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// 按格式渲染报表
pub fn render(
    report: &dyn Report,
    format: ReportFormat,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, ReportError> {
    match format {
        ReportFormat::Csv => csv::render(report),
        ReportFormat::Pdf => pdf::render(report, generated_at),
    }
}

/// 渲染并生成 `{prefix}_{yyyyMMdd_HHmmss}.{ext}` 文件
pub fn export(
    report: &dyn Report,
    format: ReportFormat,
    prefix: &str,
    generated_at: DateTime<Utc>,
) -> Result<ReportFile, ReportError> {
    let bytes = render(report, format, generated_at)?;
    Ok(ReportFile {
        filename: timestamped_filename(prefix, generated_at, format),
        content_type: format.content_type(),
        bytes,
    })
}

pub fn timestamped_filename(prefix: &str, at: DateTime<Utc>, format: ReportFormat) -> String {
    format!("{}_{}.{}", prefix, format::file_stamp(at), format.extension())
}
