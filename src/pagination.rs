//! Contents-page numbering.
//!
//! The contents page lists where each section starts in the merged book, but
//! its own length shifts every one of those numbers. The page count is found
//! by re-rendering until the count used for numbering matches the count the
//! render produced.

use crate::error::Result;
use crate::results::{ContentsPage, RenderedSection, SectionLayout};
use std::future::Future;

/// Renders at most this many contents pages before settling for the last one
pub const MAX_ATTEMPTS: usize = 3;

/// Anything that can render a contents page for a set of layouts
pub trait ContentsRenderer {
    fn render_contents(
        &self,
        layouts: &[SectionLayout],
    ) -> impl Future<Output = Result<ContentsPage>> + Send;
}

/// Outcome of [`resolve`]
#[derive(Debug, Clone)]
pub struct Pagination {
    /// Layouts printed on `contents`
    pub layouts: Vec<SectionLayout>,

    /// Final contents render; its page count is the one the merge uses
    pub contents: ContentsPage,

    /// Whether the printed numbers account for the final contents length
    pub converged: bool,

    pub attempts: usize,
}

impl Pagination {
    pub fn contents_pages(&self) -> usize {
        self.contents.artifact.page_count
    }
}

/// Starting pages counting the cover but not the contents
pub fn base_layouts(cover_pages: usize, sections: &[RenderedSection]) -> Vec<SectionLayout> {
    let mut next_page = cover_pages + 1;
    sections
        .iter()
        .map(|section| {
            let layout = SectionLayout {
                sequence: section.sequence,
                title: section.title.clone(),
                base_page: next_page,
                start_page: next_page,
            };
            next_page += section.page_count();
            layout
        })
        .collect()
}

/// Displayed numbers for a given contents length
pub fn with_contents_pages(base: &[SectionLayout], contents_pages: usize) -> Vec<SectionLayout> {
    base.iter()
        .map(|layout| SectionLayout {
            start_page: layout.base_page + contents_pages,
            ..layout.clone()
        })
        .collect()
}

/// Renders the contents page until its length stops changing.
///
/// Starts from a one-page guess. When [`MAX_ATTEMPTS`] renders pass without a
/// fixed point the last render is kept.
pub async fn resolve<R: ContentsRenderer>(
    renderer: &R,
    cover_pages: usize,
    sections: &[RenderedSection],
) -> Result<Pagination> {
    let base = base_layouts(cover_pages, sections);
    let mut guess = 1;
    let mut attempts = 0;

    loop {
        attempts += 1;
        let layouts = with_contents_pages(&base, guess);
        let contents = renderer.render_contents(&layouts).await?;
        let measured = contents.artifact.page_count;
        ::log::debug!(
            "Contents attempt {}: guessed {} pages, rendered {}",
            attempts,
            guess,
            measured
        );

        if measured == guess {
            ::log::info!("Contents page numbering settled at {} pages", measured);
            return Ok(Pagination {
                layouts,
                contents,
                converged: true,
                attempts,
            });
        }

        if attempts >= MAX_ATTEMPTS {
            ::log::warn!(
                "Contents page count did not settle after {} attempts (numbered for {}, rendered {}); using last render",
                attempts,
                guess,
                measured
            );
            return Ok(Pagination {
                layouts,
                contents,
                converged: false,
                attempts,
            });
        }

        guess = measured;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{Artifact, ContentFingerprint};
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn sections(page_counts: &[usize]) -> Vec<RenderedSection> {
        page_counts
            .iter()
            .enumerate()
            .map(|(i, &pages)| RenderedSection {
                sequence: i + 1,
                url: format!("https://example.com/docs/{}", i),
                title: format!("Section {}", i + 1),
                fingerprint: ContentFingerprint::from_hex(format!("{:064x}", i)),
                artifact: Artifact {
                    path: PathBuf::from(format!("{}.pdf", i)),
                    page_count: pages,
                },
            })
            .collect()
    }

    fn contents_of(pages: usize) -> ContentsPage {
        ContentsPage {
            artifact: Artifact {
                path: PathBuf::from("_index.pdf"),
                page_count: pages,
            },
            link_rects: Vec::new(),
        }
    }

    fn digit_sum(n: usize) -> usize {
        n.to_string()
            .chars()
            .filter_map(|c| c.to_digit(10))
            .map(|d| d as usize)
            .sum()
    }

    /// Length grows with the digits it has to print
    struct DigitSumRenderer {
        k: usize,
        seen: Mutex<Vec<Vec<usize>>>,
    }

    impl DigitSumRenderer {
        fn new(k: usize) -> Self {
            Self {
                k,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl ContentsRenderer for DigitSumRenderer {
        async fn render_contents(&self, layouts: &[SectionLayout]) -> Result<ContentsPage> {
            let numbers: Vec<usize> = layouts.iter().map(|l| l.start_page).collect();
            let total: usize = numbers.iter().map(|&n| digit_sum(n)).sum();
            self.seen.lock().unwrap().push(numbers);
            Ok(contents_of(total.div_ceil(self.k).max(1)))
        }
    }

    /// Never agrees with the guess it was given
    struct Oscillating;

    impl ContentsRenderer for Oscillating {
        async fn render_contents(&self, layouts: &[SectionLayout]) -> Result<ContentsPage> {
            let guess = layouts[0].start_page - layouts[0].base_page;
            Ok(contents_of(if guess == 1 { 2 } else { 1 }))
        }
    }

    #[test]
    fn test_base_layouts() {
        let layouts = base_layouts(1, &sections(&[2, 1, 3]));
        let bases: Vec<usize> = layouts.iter().map(|l| l.base_page).collect();
        assert_eq!(bases, vec![2, 4, 5]);

        let displayed: Vec<usize> = with_contents_pages(&layouts, 1)
            .iter()
            .map(|l| l.start_page)
            .collect();
        assert_eq!(displayed, vec![3, 5, 6]);
    }

    #[tokio::test]
    async fn test_converges_within_bound() {
        let renderer = DigitSumRenderer::new(5);
        let pagination = resolve(&renderer, 1, &sections(&[3, 5, 2])).await.unwrap();

        assert!(pagination.converged);
        assert_eq!(pagination.attempts, 3);
        assert_eq!(pagination.contents_pages(), 4);
        let displayed: Vec<usize> = pagination.layouts.iter().map(|l| l.start_page).collect();
        assert_eq!(displayed, vec![6, 9, 14]);

        // guesses 1, 3, 4
        let seen = renderer.seen.lock().unwrap();
        assert_eq!(seen[0], vec![3, 6, 11]);
        assert_eq!(seen[1], vec![5, 8, 13]);
        assert_eq!(seen[2], vec![6, 9, 14]);
    }

    #[tokio::test]
    async fn test_converges_early() {
        let renderer = DigitSumRenderer::new(10);
        let pagination = resolve(&renderer, 1, &sections(&[3, 5, 2])).await.unwrap();

        assert!(pagination.converged);
        assert_eq!(pagination.attempts, 2);
        assert_eq!(pagination.contents_pages(), 2);
    }

    #[tokio::test]
    async fn test_converges_for_coarse_renderers() {
        for k in 5..=40 {
            let renderer = DigitSumRenderer::new(k);
            let pagination = resolve(&renderer, 1, &sections(&[3, 5, 2])).await.unwrap();
            assert!(pagination.converged, "k = {}", k);
            assert!(pagination.attempts <= MAX_ATTEMPTS);
        }
    }

    #[tokio::test]
    async fn test_non_convergence_keeps_last_render() {
        let pagination = resolve(&Oscillating, 1, &sections(&[3, 5, 2])).await.unwrap();

        assert!(!pagination.converged);
        assert_eq!(pagination.attempts, MAX_ATTEMPTS);
        // guesses 1, 2, 1: the third render was numbered for 1 and came out as 2
        assert_eq!(pagination.layouts[0].start_page, 3);
        assert_eq!(pagination.contents_pages(), 2);
    }
}
