//! 列表查询公共部分：排序解析、分页计算、模糊匹配与日期边界
//!
//! 各仓储层按实体定义过滤条件，这里只提供与实体无关的拼装工具。
//! 过滤条件之间一律是 AND 关系，统计信息由单独的无过滤查询给出。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{Postgres, QueryBuilder};

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// 只有 "desc"（不区分大小写）表示降序，其余一律升序
    pub fn from_param(order: Option<&str>) -> Self {
        match order {
            Some(o) if o.trim().eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// 某个实体列表允许的排序字段
pub trait SortKey: Copy + fmt::Debug {
    const DEFAULT: Self;
    const DEFAULT_DIRECTION: SortDirection;
    /// 追加在排序末尾的唯一列，保证分页稳定
    const TIE_BREAKER: &'static str;

    /// 解析小写的排序参数，未知值返回 None
    fn parse(key: &str) -> Option<Self>;

    /// 对应的 SQL 排序表达式
    fn column(&self) -> &'static str;
}

/// 解析后的排序规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<K> {
    pub key: K,
    pub direction: SortDirection,
}

impl<K: SortKey> Sort<K> {
    pub fn order_by(&self) -> String {
        format!(
            " ORDER BY {} {}, {} ASC",
            self.key.column(),
            self.direction.as_sql(),
            K::TIE_BREAKER
        )
    }
}

/// 未提供或无法识别的排序字段回落到实体的默认排序（字段与方向都取默认值）
pub fn resolve_sort<K: SortKey>(sort_by: Option<&str>, order: Option<&str>) -> Sort<K> {
    match sort_by
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .and_then(|s| K::parse(&s))
    {
        Some(key) => Sort {
            key,
            direction: SortDirection::from_param(order),
        },
        None => Sort {
            key: K::DEFAULT,
            direction: K::DEFAULT_DIRECTION,
        },
    }
}

/// 分页请求，页码从 1 开始
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// 小于 1 的页码按第 1 页处理
    pub fn new(page: Option<i64>, page_size: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

/// ceil(total / page_size)，总数为 0 时为 0 页
pub fn total_pages(total: i64, page_size: i64) -> i64 {
    if total <= 0 || page_size <= 0 {
        return 0;
    }
    (total + page_size - 1) / page_size
}

/// 一页结果
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total_records: i64,
    pub total_pages: i64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_records: i64) -> Self {
        let pages = total_pages(total_records, request.page_size);
        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            total_records,
            total_pages: pages,
            has_previous_page: request.page > 1,
            has_next_page: request.page < pages,
        }
    }
}

/// 构造 ILIKE 子串匹配模式；空白输入视为未提供
pub fn like_pattern(term: &str) -> Option<String> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    Some(escaped)
}

/// 某天 00:00 UTC
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// 次日 00:00 UTC，用作 "截至当天结束" 的开区间上界
pub fn next_day_start(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.succ_opt().map(start_of_day)
}

/// 本周起点：最近一个周日 00:00 UTC（当天是周日则为当天）
pub fn start_of_week(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let days_since_sunday = today.weekday().num_days_from_sunday() as i64;
    start_of_day(today - Duration::days(days_since_sunday))
}

/// WHERE / AND 拼接器，同一组过滤条件可分别用于计数查询与分页查询
pub struct Conditions<'args> {
    qb: QueryBuilder<'args, Postgres>,
    has_where: bool,
}

impl<'args> Conditions<'args> {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            qb: QueryBuilder::new(base.into()),
            has_where: false,
        }
    }

    /// 开始一个新条件，返回底层构造器供继续 push / push_bind
    pub fn and(&mut self) -> &mut QueryBuilder<'args, Postgres> {
        if self.has_where {
            self.qb.push(" AND ");
        } else {
            self.qb.push(" WHERE ");
            self.has_where = true;
        }
        &mut self.qb
    }

    /// 对多个列做 ILIKE 匹配，列之间为 OR，整体作为一个条件
    pub fn search(&mut self, columns: &[&str], pattern: String) {
        let qb = self.and();
        qb.push("(");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column)
                .push(" ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
        qb.push(")");
    }

    pub fn finish(self) -> QueryBuilder<'args, Postgres> {
        self.qb
    }
}

/// 在已有构造器后追加排序与分页
pub fn push_page<K: SortKey>(
    qb: &mut QueryBuilder<'_, Postgres>,
    sort: &Sort<K>,
    request: &PageRequest,
) {
    qb.push(sort.order_by());
    qb.push(" LIMIT ").push_bind(request.limit());
    qb.push(" OFFSET ").push_bind(request.offset());
}

/// 查询字符串中的空值（`?x=`）视为未提供
pub fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestKey {
        Name,
        Created,
    }

    impl SortKey for TestKey {
        const DEFAULT: Self = TestKey::Name;
        const DEFAULT_DIRECTION: SortDirection = SortDirection::Asc;
        const TIE_BREAKER: &'static str = "t.id";

        fn parse(key: &str) -> Option<Self> {
            match key {
                "name" => Some(TestKey::Name),
                "created" => Some(TestKey::Created),
                _ => None,
            }
        }

        fn column(&self) -> &'static str {
            match self {
                TestKey::Name => "t.name",
                TestKey::Created => "t.created_at",
            }
        }
    }

    #[test]
    fn test_resolve_sort_defaults() {
        let sort: Sort<TestKey> = resolve_sort(None, Some("desc"));
        assert_eq!(sort.key, TestKey::Name);
        assert_eq!(sort.direction, SortDirection::Asc);

        let sort: Sort<TestKey> = resolve_sort(Some("bogus"), Some("desc"));
        assert_eq!(sort.key, TestKey::Name);
        assert_eq!(sort.direction, SortDirection::Asc);
    }

    #[test]
    fn test_resolve_sort_explicit_key() {
        let sort: Sort<TestKey> = resolve_sort(Some("Created"), Some("DESC"));
        assert_eq!(sort.key, TestKey::Created);
        assert_eq!(sort.direction, SortDirection::Desc);

        let sort: Sort<TestKey> = resolve_sort(Some("created"), Some("sideways"));
        assert_eq!(sort.direction, SortDirection::Asc);
        assert_eq!(sort.order_by(), " ORDER BY t.created_at ASC, t.id ASC");
    }

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(Some(0), 10).page, 1);
        assert_eq!(PageRequest::new(Some(-7), 10).page, 1);
        assert_eq!(PageRequest::new(None, 10).offset(), 0);
        assert_eq!(PageRequest::new(Some(3), 25).offset(), 50);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[test]
    fn test_page_flags() {
        let page = Page::new(Vec::<u8>::new(), PageRequest::new(Some(2), 10), 25);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_previous_page);
        assert!(page.has_next_page);

        let last = Page::new(Vec::<u8>::new(), PageRequest::new(Some(3), 10), 25);
        assert!(!last.has_next_page);
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern("  "), None);
        assert_eq!(like_pattern("ann").as_deref(), Some("%ann%"));
        assert_eq!(like_pattern("50%_off").as_deref(), Some("%50\\%\\_off%"));
        assert_eq!(like_pattern("a\\b").as_deref(), Some("%a\\\\b%"));
    }

    #[test]
    fn test_day_bounds() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(start_of_day(day).to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert_eq!(
            next_day_start(day).unwrap().to_rfc3339(),
            "2026-01-02T00:00:00+00:00"
        );
    }

    #[test]
    fn test_start_of_week_is_sunday() {
        // 2026-01-07 是周三
        let wed = start_of_day(NaiveDate::from_ymd_opt(2026, 1, 7).unwrap());
        assert_eq!(
            start_of_week(wed).date_naive(),
            NaiveDate::from_ymd_opt(2026, 1, 4).unwrap()
        );
        let sunday = start_of_day(NaiveDate::from_ymd_opt(2026, 1, 4).unwrap());
        assert_eq!(start_of_week(sunday), sunday);
    }

    #[test]
    fn test_conditions_join_with_and() {
        let mut c = Conditions::new("SELECT * FROM t");
        c.and().push("a = ").push_bind(1_i32);
        c.search(&["t.x", "t.y"], "%q%".to_string());
        let qb = c.finish();
        let sql = qb.sql();
        assert_eq!(
            sql,
            "SELECT * FROM t WHERE a = $1 AND (t.x ILIKE $2 ESCAPE '\\' OR t.y ILIKE $3 ESCAPE '\\')"
        );
    }
}
