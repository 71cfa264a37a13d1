//! PDF 渲染：A4 纵向，内置 Helvetica 字体
//! 标题、信息行、汇总块、表格（跨页时重复表头）、详情分组、末页页脚

use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use super::{format, Column, Report, ReportError, Section};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const BOTTOM: f32 = 20.0;
const ROW_HEIGHT: f32 = 6.0;
const TABLE_FONT_SIZE: f32 = 8.0;
const SUBTITLE: &str = "Employee Management System";

/// pt -> mm
const PT_TO_MM: f32 = 0.3528;
/// Helvetica 平均字宽约为字号的一半
const AVG_CHAR_EM: f32 = 0.5;

fn pdf_err(e: printpdf::Error) -> ReportError {
    ReportError::Pdf(e.to_string())
}

/// 页面游标：当前图层与纵向位置
struct Cursor {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl Cursor {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_err)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    /// 剩余空间不足时换页，返回是否换页
    fn ensure(&mut self, height: f32) -> bool {
        if self.y - height < BOTTOM {
            self.new_page();
            true
        } else {
            false
        }
    }

    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        self.ensure(size * PT_TO_MM * 1.6);
        self.y -= size * PT_TO_MM * 1.2;
        self.text(text, size, MARGIN, bold);
        self.y -= size * PT_TO_MM * 0.6;
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn finish(self) -> Result<Vec<u8>, ReportError> {
        self.doc.save_to_bytes().map_err(pdf_err)
    }
}

/// 按列宽截断文本
fn fit(text: &str, width_mm: f32, size: f32) -> String {
    let max_chars = (width_mm / (size * AVG_CHAR_EM * PT_TO_MM)).floor() as usize;
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut out: String = text.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

/// 各列左边界与宽度
fn layout(columns: &[Column]) -> Vec<(f32, f32)> {
    let usable = PAGE_WIDTH - 2.0 * MARGIN;
    let total: f32 = columns.iter().map(|c| c.weight).sum::<f32>().max(f32::EPSILON);
    let mut x = MARGIN;
    columns
        .iter()
        .map(|c| {
            let width = usable * c.weight / total;
            let slot = (x, width);
            x += width;
            slot
        })
        .collect()
}

fn table_row(cursor: &mut Cursor, slots: &[(f32, f32)], cells: &[String], bold: bool) {
    cursor.y -= ROW_HEIGHT;
    for ((x, width), cell) in slots.iter().zip(cells) {
        cursor.text(&fit(cell, width - 1.5, TABLE_FONT_SIZE), TABLE_FONT_SIZE, *x, bold);
    }
}

fn table(cursor: &mut Cursor, columns: &[Column], rows: &[Vec<String>]) {
    let slots = layout(columns);
    let headers: Vec<String> = columns.iter().map(|c| c.header.to_string()).collect();

    cursor.ensure(ROW_HEIGHT * 2.0);
    table_row(cursor, &slots, &headers, true);
    cursor.gap(1.0);

    for row in rows {
        if cursor.ensure(ROW_HEIGHT) {
            table_row(cursor, &slots, &headers, true);
            cursor.gap(1.0);
        }
        table_row(cursor, &slots, row, false);
    }
}

fn summary(cursor: &mut Cursor, items: &[(&'static str, String)]) {
    if items.is_empty() {
        return;
    }
    cursor.line("Summary", 11.0, true);
    let slot = (PAGE_WIDTH - 2.0 * MARGIN) / items.len() as f32;
    cursor.ensure(ROW_HEIGHT * 2.0);
    cursor.y -= ROW_HEIGHT;
    for (i, (label, _)) in items.iter().enumerate() {
        cursor.text(label, 9.0, MARGIN + slot * i as f32, false);
    }
    cursor.y -= ROW_HEIGHT;
    for (i, (_, value)) in items.iter().enumerate() {
        cursor.text(value, 12.0, MARGIN + slot * i as f32, true);
    }
    cursor.gap(ROW_HEIGHT);
}

fn section(cursor: &mut Cursor, section: &Section) {
    cursor.gap(2.0);
    cursor.line(section.heading, 12.0, true);
    for (label, value) in &section.fields {
        cursor.ensure(ROW_HEIGHT);
        cursor.y -= ROW_HEIGHT;
        cursor.text(&format!("{}:", label), 10.0, MARGIN, true);
        cursor.text(&fit(value, 120.0, 10.0), 10.0, MARGIN + 45.0, false);
    }
}

pub fn render(report: &dyn Report, generated_at: DateTime<Utc>) -> Result<Vec<u8>, ReportError> {
    let title = report.title();
    let mut cursor = Cursor::new(&title)?;

    cursor.line(&title, 18.0, true);
    cursor.line(SUBTITLE, 11.0, false);
    if let Some(info) = report.info() {
        cursor.line(&info, 9.0, false);
    }
    cursor.line(
        &format!("Generated on: {}", format::long_date_time(generated_at)),
        9.0,
        false,
    );
    cursor.gap(4.0);

    summary(&mut cursor, &report.summary());

    let columns = report.columns();
    if !columns.is_empty() {
        table(&mut cursor, &columns, &report.rows());
    }

    for s in report.sections() {
        section(&mut cursor, &s);
    }

    // 页脚只出现在最后一页
    let footer = format!("Page generated on {}", format::iso_timestamp(generated_at));
    cursor.y = BOTTOM - 8.0;
    cursor.text(&footer, 8.0, MARGIN, false);

    tracing::debug!(title = %title, pages = cursor.pages, "PDF rendered");
    cursor.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_truncates_long_text() {
        assert_eq!(fit("short", 50.0, 8.0), "short");
        let long = "x".repeat(200);
        let fitted = fit(&long, 20.0, 8.0);
        assert!(fitted.ends_with("..."));
        assert!(fitted.chars().count() < 200);
    }

    #[test]
    fn test_layout_spans_usable_width() {
        let columns = [Column::new("A", 1.0), Column::new("B", 3.0)];
        let slots = layout(&columns);
        assert_eq!(slots[0].0, MARGIN);
        let end = slots[1].0 + slots[1].1;
        assert!((end - (PAGE_WIDTH - MARGIN)).abs() < 0.01);
        assert!((slots[1].1 - 3.0 * slots[0].1).abs() < 0.01);
    }
}
