//! Optimal split of an ordered weight list into at most K contiguous groups,
//! minimizing the heaviest group.

use std::num::NonZeroUsize;
use std::ops::Range;

use book_model::{Chapter, ChapterGroup};
use tracing::debug;

/// Partition `weights` into `min(K, n)` contiguous, non-empty ranges whose
/// largest sum is as small as possible. `n <= K` gives singletons.
pub fn partition_weights(weights: &[u64], max_groups: NonZeroUsize) -> Vec<Range<usize>> {
    let n = weights.len();
    let m = max_groups.get().min(n);
    if n == 0 {
        return Vec::new();
    }
    if n <= max_groups.get() {
        return (0..n).map(|i| i..i + 1).collect();
    }

    let mut prefix = vec![0u64; n + 1];
    for (i, w) in weights.iter().enumerate() {
        prefix[i + 1] = prefix[i] + w;
    }

    // dp[i][j]: best max-group weight for the first i items in j groups.
    // cut[i][j]: start of the last group in that optimum.
    let mut dp = vec![vec![u64::MAX; m + 1]; n + 1];
    let mut cut = vec![vec![0usize; m + 1]; n + 1];
    for i in 1..=n {
        dp[i][1] = prefix[i];
    }
    for j in 2..=m {
        for i in j..=n {
            for p in (j - 1)..i {
                let candidate = dp[p][j - 1].max(prefix[i] - prefix[p]);
                if candidate < dp[i][j] {
                    dp[i][j] = candidate;
                    cut[i][j] = p;
                }
            }
        }
    }

    let mut groups = Vec::with_capacity(m);
    let mut end = n;
    for j in (1..=m).rev() {
        let start = if j == 1 { 0 } else { cut[end][j] };
        groups.push(start..end);
        end = start;
    }
    groups.reverse();
    debug!(items = n, groups = m, max_weight = dp[n][m], "partitioned weights");
    groups
}

/// Heaviest group of a partition.
pub fn max_group_weight(weights: &[u64], groups: &[Range<usize>]) -> u64 {
    groups.iter().map(|r| weights[r.clone()].iter().sum::<u64>()).max().unwrap_or(0)
}

/// `Chapter 3` or `Chapters 3–7`.
pub fn describe_chapter_range(first: u32, last: u32) -> String {
    if first == last { format!("Chapter {first}") } else { format!("Chapters {first}–{last}") }
}

/// Group chapters by their `char_count`, preserving reading order.
pub fn group_chapters(chapters: &[Chapter], max_groups: NonZeroUsize) -> Vec<ChapterGroup> {
    let weights: Vec<u64> = chapters.iter().map(|c| c.char_count as u64).collect();
    partition_weights(&weights, max_groups)
        .into_iter()
        .enumerate()
        .map(|(i, range)| {
            let members = &chapters[range];
            let first = members.first().map_or(0, |c| c.number);
            let last = members.last().map_or(first, |c| c.number);
            ChapterGroup {
                label: format!("{:02}", i + 1),
                chapters: members.iter().map(|c| c.number).collect(),
                description: describe_chapter_range(first, last),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use book_model::{ChapterKind, PageOffset};

    fn k(n: usize) -> NonZeroUsize { NonZeroUsize::new(n).unwrap() }

    fn assert_contiguous(groups: &[Range<usize>], n: usize) {
        let mut next = 0;
        for g in groups {
            assert_eq!(g.start, next);
            assert!(g.end > g.start, "empty group {g:?}");
            next = g.end;
        }
        assert_eq!(next, n);
    }

    /// Best max-weight over every split of `w` into exactly `m` contiguous groups.
    fn brute_force(w: &[u64], m: usize) -> u64 {
        fn go(w: &[u64], m: usize) -> u64 {
            if m == 1 {
                return w.iter().sum();
            }
            (1..=w.len() - (m - 1))
                .map(|first| w[..first].iter().sum::<u64>().max(go(&w[first..], m - 1)))
                .min()
                .unwrap()
        }
        go(w, m)
    }

    #[test]
    fn nine_equal_chapters_into_three() {
        let w = [100u64; 9];
        let groups = partition_weights(&w, k(3));
        assert_eq!(groups, vec![0..3, 3..6, 6..9]);
        assert_eq!(max_group_weight(&w, &groups), 300);
    }

    #[test]
    fn few_items_become_singletons() {
        let w = [5u64, 1, 9];
        assert_eq!(partition_weights(&w, k(3)), vec![0..1, 1..2, 2..3]);
        assert_eq!(partition_weights(&w, k(9)), vec![0..1, 1..2, 2..3]);
        assert!(partition_weights(&[], k(4)).is_empty());
    }

    #[test]
    fn single_group_takes_everything() {
        let w = [3u64, 4, 5];
        assert_eq!(partition_weights(&w, k(1)), vec![0..3]);
    }

    #[test]
    fn matches_exhaustive_search() {
        let mut seed = 0x2545_f491_u64;
        for n in 2..=8usize {
            for m in 1..n {
                for _ in 0..12 {
                    let w: Vec<u64> = (0..n)
                        .map(|_| {
                            seed ^= seed << 13;
                            seed ^= seed >> 7;
                            seed ^= seed << 17;
                            seed % 50
                        })
                        .collect();
                    let groups = partition_weights(&w, k(m));
                    assert_eq!(groups.len(), m);
                    assert_contiguous(&groups, n);
                    assert_eq!(max_group_weight(&w, &groups), brute_force(&w, m), "weights {w:?} into {m}");
                }
            }
        }
    }

    #[test]
    fn six_into_three_known_optimum() {
        let w = [10u64, 20, 30, 40, 50, 60];
        let groups = partition_weights(&w, k(3));
        assert_contiguous(&groups, 6);
        assert_eq!(max_group_weight(&w, &groups), 90);
    }

    #[test]
    fn repeated_runs_agree() {
        let w = [7u64, 2, 9, 4, 4, 8, 1, 6, 3];
        let a = partition_weights(&w, k(4));
        let b = partition_weights(&w, k(4));
        assert_eq!(a, b);
        assert_eq!(max_group_weight(&w, &a), max_group_weight(&w, &b));
    }

    #[test]
    fn zero_weights_still_form_non_empty_groups() {
        let w = [0u64; 7];
        let groups = partition_weights(&w, k(3));
        assert_eq!(groups.len(), 3);
        assert_contiguous(&groups, 7);
    }

    fn chapter(number: u32, chars: usize) -> Chapter {
        Chapter {
            number,
            title: Chapter::default_title(number),
            kind: ChapterKind::Body,
            physical_start: number,
            physical_end: number,
            printed_start: i64::from(number),
            printed_end: i64::from(number),
            page_offset: PageOffset::NONE,
            description: None,
            char_count: chars,
            content_path: None,
        }
    }

    #[test]
    fn chapter_groups_are_labelled_and_described() {
        let chs: Vec<Chapter> = (0..6).map(|n| chapter(n, 100)).collect();
        let groups = group_chapters(&chs, k(2));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "01");
        assert_eq!(groups[0].chapters, vec![0, 1, 2]);
        assert_eq!(groups[0].description, "Chapters 0–2");
        assert_eq!(groups[1].label, "02");
        assert_eq!(groups[1].description, "Chapters 3–5");

        let single = group_chapters(&chs[..2], k(9));
        assert_eq!(single[1].description, "Chapter 1");
    }
}
