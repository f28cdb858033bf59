pub mod attendance;
pub mod correction;
pub mod report;
pub mod work_rule;

/// Offset for a LIMIT/OFFSET page. Widened to u64 before multiplying so a
/// hostile `page` value from the query string cannot overflow u32.
pub(crate) fn page_offset(page: u32, per_page: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_steps_by_page_size() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(2, 20), 20);
        assert_eq!(page_offset(5, 100), 400);
    }

    #[test]
    fn extreme_page_numbers_do_not_overflow() {
        assert_eq!(
            page_offset(u32::MAX, 100),
            (u64::from(u32::MAX) - 1) * 100
        );
        // Page zero is treated as the first page.
        assert_eq!(page_offset(0, 20), 0);
    }
}
