//! 分页与排序解析的性质测试

use hr_admin::models::audit::AuditLogSort;
use hr_admin::models::employee::EmployeeSort;
use hr_admin::query::{
    like_pattern, resolve_sort, total_pages, Page, PageRequest, SortDirection, SortKey,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_pages_cover_all_records(total in 0i64..10_000, page_size in 1i64..200) {
        let pages = total_pages(total, page_size);
        // 各页条数之和等于总数
        let mut sum = 0;
        for page in 1..=pages {
            let request = PageRequest::new(Some(page), page_size);
            sum += (total - request.offset()).clamp(0, request.limit());
        }
        prop_assert_eq!(sum, total);
        prop_assert!(pages * page_size >= total);
        prop_assert!(pages == 0 || (pages - 1) * page_size < total);
    }

    #[test]
    fn prop_page_flags(total in 0i64..500, page in -5i64..60, page_size in 1i64..30) {
        let request = PageRequest::new(Some(page), page_size);
        prop_assert!(request.page >= 1);

        let result: Page<()> = Page::new(Vec::new(), request, total);
        prop_assert_eq!(result.has_previous_page, request.page > 1);
        prop_assert_eq!(result.has_next_page, request.page < result.total_pages);
    }

    #[test]
    fn prop_unknown_sort_key_uses_default(key in "[a-z]{12,20}", desc in any::<bool>()) {
        let order = if desc { "desc" } else { "asc" };
        let sort = resolve_sort::<EmployeeSort>(Some(&key), Some(order));
        prop_assert_eq!(sort.key, EmployeeSort::DEFAULT);
        prop_assert_eq!(sort.direction, EmployeeSort::DEFAULT_DIRECTION);
    }

    #[test]
    fn prop_like_pattern_escapes_wildcards(term in "[a-z%_\\\\]{1,20}") {
        let pattern = like_pattern(&term).unwrap();
        let inner = &pattern[1..pattern.len() - 1];
        // 去掉转义后应还原为原始输入
        let mut unescaped = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                unescaped.push(chars.next().unwrap());
            } else {
                prop_assert!(c != '%' && c != '_');
                unescaped.push(c);
            }
        }
        prop_assert_eq!(unescaped, term);
    }
}

#[test]
fn test_empty_result_has_zero_pages() {
    let page: Page<u8> = Page::new(Vec::new(), PageRequest::new(None, 10), 0);
    assert_eq!(page.total_pages, 0);
    assert!(!page.has_previous_page);
    assert!(!page.has_next_page);
}

#[test]
fn test_audit_log_default_sort_is_newest_first() {
    let sort = resolve_sort::<AuditLogSort>(None, None);
    assert_eq!(sort.direction, SortDirection::Desc);
    assert!(sort.order_by().starts_with(" ORDER BY "));
}

#[test]
fn test_employee_sort_keys_are_case_insensitive() {
    let sort = resolve_sort::<EmployeeSort>(Some("HireDate"), Some("DESC"));
    assert_eq!(sort.key, EmployeeSort::HireDate);
    assert_eq!(sort.direction, SortDirection::Desc);
}

#[test]
fn test_blank_search_is_ignored() {
    assert_eq!(like_pattern("   "), None);
    assert_eq!(like_pattern(" eng "), Some("%eng%".to_string()));
}
