//! HTTP 处理器模块

pub mod account;
pub mod audit;
pub mod auth;
pub mod department;
pub mod employee;
pub mod health;
pub mod job_title;
pub mod profile;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

use crate::report::ReportFile;

/// 以附件形式返回导出文件
pub fn attachment(file: ReportFile) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    (
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_headers() {
        let response = attachment(ReportFile {
            filename: "Employees_20240101_000000.csv".to_string(),
            content_type: "text/csv",
            bytes: b"\"a\"\n".to_vec(),
        });
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Employees_20240101_000000.csv\""
        );
    }
}
