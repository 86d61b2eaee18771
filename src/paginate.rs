use std::fmt;

use crate::error::DocError;

/// One slice of a larger document, cut on line boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub total_pages: usize,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub total_lines: usize,
    pub content: String,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Page {} of {} (showing lines {}-{} of {})\n\n{}",
            self.number,
            self.total_pages,
            self.start_line,
            self.end_line,
            self.total_lines,
            self.content
        )
    }
}

/// Selects page `page` (1-based; anything lower counts as 1) of `page_size`
/// lines from `content`.
pub fn paginate(content: &str, page: i64, page_size: usize) -> Result<Page, DocError> {
    let page_size = page_size.max(1);
    // Past usize::MAX is out of range, never page 1.
    let number = if page < 1 {
        1
    } else {
        usize::try_from(page).unwrap_or(usize::MAX)
    };

    let lines: Vec<&str> = content.split('\n').collect();
    let total_lines = lines.len();
    let total_pages = total_lines.div_ceil(page_size).max(1);

    if number > total_pages {
        return Err(DocError::PageOutOfRange {
            page: number,
            total: total_pages,
        });
    }

    let start = (number - 1) * page_size;
    let end = (start + page_size).min(total_lines);

    Ok(Page {
        number,
        total_pages,
        start_line: start + 1,
        end_line: end,
        total_lines,
        content: lines[start..end].join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_lines(n: usize) -> String {
        (1..=n)
            .map(|i| format!("line {i:03} {}", "x".repeat(30)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_first_and_last_page() {
        let content = make_lines(250);

        let first = paginate(&content, 1, 100).unwrap();
        assert!(first.to_string().starts_with("Page 1 of 3 (showing lines 1-100 of 250)\n\n"));

        let last = paginate(&content, 3, 100).unwrap();
        assert_eq!((last.start_line, last.end_line), (201, 250));
        assert!(last.to_string().starts_with("Page 3 of 3 (showing lines 201-250 of 250)"));
        assert!(last.content.ends_with(&format!("line 250 {}", "x".repeat(30))));
    }

    #[test]
    fn test_page_exceeds_total() {
        let content = make_lines(250);
        let err = paginate(&content, 10, 100).unwrap_err();
        assert!(matches!(err, DocError::PageOutOfRange { page: 10, total: 3 }));
        assert_eq!(err.to_string(), "page 10 exceeds total pages 3");
    }

    #[test]
    fn test_low_page_numbers_clamp_to_first() {
        let content = make_lines(250);
        let first = paginate(&content, 1, 100).unwrap();
        assert_eq!(paginate(&content, 0, 100).unwrap(), first);
        assert_eq!(paginate(&content, -7, 100).unwrap(), first);
        assert_eq!(paginate(&content, i64::MIN, 100).unwrap(), first);
    }

    #[test]
    fn test_huge_page_number_is_out_of_range() {
        let content = make_lines(250);
        let err = paginate(&content, i64::MAX, 100).unwrap_err();
        match err {
            DocError::PageOutOfRange { page, total } => {
                assert!(page > 3, "{page}");
                assert_eq!(total, 3);
            }
            other => panic!("expected PageOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn test_single_and_empty() {
        let single = paginate("short content", 1, 1000).unwrap();
        assert_eq!(single.to_string(), "Page 1 of 1 (showing lines 1-1 of 1)\n\nshort content");

        let empty = paginate("", 1, 1000).unwrap();
        assert!(empty.to_string().starts_with("Page 1 of 1"));
        assert_eq!(empty.content, "");
    }

    #[test]
    fn test_pages_cover_content_exactly() {
        for (lines, page_size) in [(1, 1), (10, 3), (250, 100), (300, 100), (7, 50)] {
            let mut content = make_lines(lines);
            content.push('\n');

            let first = paginate(&content, 1, page_size).unwrap();
            let total_lines = content.split('\n').count();
            assert_eq!(first.total_pages, total_lines.div_ceil(page_size));

            let mut next_start = 1;
            let mut pieces = Vec::new();
            for n in 1..=first.total_pages {
                let page = paginate(&content, n as i64, page_size).unwrap();
                assert_eq!(page.start_line, next_start);
                assert!(page.end_line - page.start_line < page_size);
                next_start = page.end_line + 1;
                pieces.push(page.content);
            }
            assert_eq!(next_start, total_lines + 1);
            assert_eq!(pieces.join("\n"), content);
        }
    }
}
