//! CSV 渲染：每个字段都加双引号，行尾为 `\n`

use ::csv::{QuoteStyle, Terminator, WriterBuilder};

use super::{Report, ReportError};

pub fn render(report: &dyn Report) -> Result<Vec<u8>, ReportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(report.csv_headers())?;
    for row in report.csv_rows() {
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| ReportError::Io(e.into_error()))
}
