//! 报表中的金额与日期格式

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// `$75,000.00`；负数为 `-$75.00`
pub fn currency(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", if negative { "-" } else { "" }, grouped, frac_part)
}

/// `January 15, 2023`
pub fn long_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

/// `January 15, 2023 02:05 PM`
pub fn long_date_time(at: DateTime<Utc>) -> String {
    at.format("%B %d, %Y %I:%M %p").to_string()
}

/// 审计 PDF 中的时间：`01/15/2023 14:05`
pub fn short_timestamp(at: DateTime<Utc>) -> String {
    at.format("%m/%d/%Y %H:%M").to_string()
}

/// CSV 与页脚中的时间：`2023-01-15 14:05:00`
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 文件名中的时间戳：`20230115_140500`
pub fn file_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}
