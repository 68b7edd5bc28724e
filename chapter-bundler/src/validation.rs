//! Structural checks run before any chapter is derived.

use book_model::BookJob;

use crate::error::BundleError;

/// Page numbers must be non-empty, strictly ascending and within `[min_page, max_page]`.
pub fn validate_page_numbers(pages: &[u32], min_page: u32, max_page: Option<u32>) -> Result<(), BundleError> {
    if pages.is_empty() {
        return Err(BundleError::invalid("no page numbers given"));
    }
    for &p in pages {
        if p < min_page {
            return Err(BundleError::invalid(format!("page {p} is below the first allowed page {min_page}")));
        }
        if let Some(max) = max_page {
            if p > max {
                return Err(BundleError::invalid(format!("page {p} is beyond the last page {max}")));
            }
        }
    }
    if let Some(w) = pages.windows(2).find(|w| w[1] <= w[0]) {
        return Err(BundleError::invalid(format!("page numbers must be strictly ascending ({} then {})", w[0], w[1])));
    }
    Ok(())
}

/// Parse `"1, 10,25"` into page numbers.
pub fn parse_page_list(input: &str) -> Result<Vec<u32>, BundleError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u32>().map_err(|_| BundleError::invalid(format!("not a page number: {s:?}"))))
        .collect()
}

/// Reject jobs the chapter deriver must never see.
pub fn validate_job(job: &BookJob) -> Result<(), BundleError> {
    if job.total_pages == 0 {
        return Err(BundleError::invalid("total page count must be at least 1"));
    }
    if job.page_offset >= job.total_pages {
        return Err(BundleError::invalid(format!(
            "page offset {} leaves no numbered pages in a {}-page document",
            job.page_offset, job.total_pages
        )));
    }
    let starts = job.physical_starts();
    validate_page_numbers(&starts, 1, Some(job.total_pages))?;
    if job.chapter_titles.len() > starts.len() {
        return Err(BundleError::invalid(format!(
            "{} titles given for {} chapters",
            job.chapter_titles.len(),
            starts.len()
        )));
    }
    if let (Some(end), Some(&last)) = (job.physical_last_end(), starts.last()) {
        if end < last || end > job.total_pages {
            return Err(BundleError::invalid(format!(
                "last chapter end {end} must lie between the last start {last} and page {}",
                job.total_pages
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascending_pages_in_range_pass() {
        assert!(validate_page_numbers(&[1, 10, 25], 1, Some(30)).is_ok());
        assert!(validate_page_numbers(&[3], 1, None).is_ok());
    }

    #[test]
    fn bad_page_lists_are_rejected() {
        assert!(validate_page_numbers(&[], 1, None).is_err());
        assert!(validate_page_numbers(&[0, 5], 1, None).is_err());
        assert!(validate_page_numbers(&[5, 40], 1, Some(30)).is_err());
        assert!(validate_page_numbers(&[5, 5], 1, None).is_err());
        assert!(validate_page_numbers(&[9, 4], 1, None).is_err());
    }

    #[test]
    fn page_list_parsing() {
        assert_eq!(parse_page_list("1, 10,25").unwrap(), vec![1, 10, 25]);
        assert_eq!(parse_page_list("7,").unwrap(), vec![7]);
        assert!(matches!(parse_page_list("1,x"), Err(BundleError::InvalidInput(_))));
    }

    fn job() -> BookJob {
        BookJob { total_pages: 30, chapter_starts: vec![1, 10, 25], ..Default::default() }
    }

    #[test]
    fn job_checks() {
        assert!(validate_job(&job()).is_ok());
        assert!(validate_job(&BookJob { total_pages: 0, ..job() }).is_err());
        assert!(validate_job(&BookJob { page_offset: 30, ..job() }).is_err());
        assert!(validate_job(&BookJob { chapter_starts: vec![], ..job() }).is_err());
        assert!(validate_job(&BookJob { chapter_titles: vec!["a".into(); 4], ..job() }).is_err());
        assert!(validate_job(&BookJob { last_chapter_end: Some(20), ..job() }).is_err());
        assert!(validate_job(&BookJob { last_chapter_end: Some(28), ..job() }).is_ok());
    }

    #[test]
    fn printed_starts_are_checked_after_shifting() {
        let j = BookJob { page_offset: 10, starts_are_printed: true, chapter_starts: vec![1, 15, 21], ..job() };
        assert!(validate_job(&j).is_err());
        let j = BookJob { chapter_starts: vec![1, 15, 20], ..j };
        assert!(validate_job(&j).is_ok());
    }
}
