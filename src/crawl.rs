//! Committee enumeration and meeting-list crawling.
//!
//! A council run has three phases:
//!
//! 1. **Committees**: read the committee list ([`get_committees`])
//! 2. **Meeting pages**: walk each committee's meeting list back through the
//!    "Earlier meetings" chain ([`scrape_meeting_links`])
//! 3. **Minutes**: hand every meeting page to [`crate::download`]
//!
//! Everything runs sequentially. Failures are logged and turned into empty or
//! partial results; nothing here aborts a run.

use crate::config::CrawlConfig;
use crate::download::download_minutes;
use crate::fetch::PageFetcher;
use crate::models::{Committee, CommitteeMeetingData};
use crate::scrapers::PageShape;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Options for [`get_minutes_for_council`].
#[derive(Debug, Clone)]
pub struct CouncilRun<'a> {
    pub crawl: &'a CrawlConfig,
    /// Follow "Earlier meetings" links past the first list page.
    pub paginate: bool,
    /// Stop after the first committee on the list.
    pub first_committee_only: bool,
    /// Root directory for downloaded minutes.
    pub minutes_root: &'a Path,
}

/// Fetch and parse the committee list of a council.
///
/// A failed fetch or a page without the committee container yields an empty
/// list.
#[instrument(level = "info", skip_all, fields(%base, shape = shape.name()))]
pub async fn get_committees<F, S>(fetcher: &F, shape: &S, base: &Url) -> Vec<Committee>
where
    F: PageFetcher,
    S: PageShape,
{
    let page_url = match shape.committees_url(base) {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, "Could not build committee list URL");
            return Vec::new();
        }
    };

    let html = match fetcher.fetch_text(&page_url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(url = %page_url, error = %e, "Failed to fetch committee list");
            return Vec::new();
        }
    };

    match shape.parse_committees(&html, &page_url) {
        Some(committees) => {
            info!(count = committees.len(), "Found committees");
            committees
        }
        None => {
            warn!(url = %page_url, "Committee container not found on the committees page");
            Vec::new()
        }
    }
}

/// Collect meeting-page URLs from a meeting list and its earlier pages.
///
/// Starting at `start`, each page's meeting links are resolved against
/// `resolve_base` and added to the result. With `paginate` the crawl follows
/// the "Earlier meetings" link until one of:
///
/// - no such link exists,
/// - the link points at a page already visited in this crawl,
/// - a fetch fails (the URLs collected so far are returned),
/// - `config.page_cap` pages have been fetched.
///
/// Without `paginate` only `start` is fetched. `config.polite_delay` is
/// awaited after every page that was fetched, the last one included.
#[instrument(level = "info", skip_all, fields(%start, paginate))]
pub async fn scrape_meeting_links<F, S>(
    fetcher: &F,
    shape: &S,
    config: &CrawlConfig,
    start: Url,
    resolve_base: &Url,
    paginate: bool,
) -> BTreeSet<Url>
where
    F: PageFetcher,
    S: PageShape,
{
    let mut meeting_urls = BTreeSet::new();
    let mut visited: HashSet<Url> = HashSet::new();
    let mut current = Some(start);
    let mut pages = 0usize;

    info!("Starting to scrape meeting list pages");

    while let Some(url) = current.take() {
        if pages >= config.page_cap {
            warn!(cap = config.page_cap, next = %url, "Page cap reached; stopping");
            break;
        }
        pages += 1;
        visited.insert(url.clone());

        let html = match fetcher.fetch_text(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(%url, error = %e, collected = meeting_urls.len(), "Failed to fetch meeting list page");
                break;
            }
        };

        let before = meeting_urls.len();
        meeting_urls.extend(shape.meeting_links(&html, resolve_base));
        debug!(%url, page = pages, new = meeting_urls.len() - before, "Parsed meeting list page");

        sleep(config.polite_delay).await;

        if !paginate {
            break;
        }

        match shape.earlier_meetings_link(&html, resolve_base) {
            Some(next) if visited.contains(&next) => {
                warn!(%next, "Earlier meetings link loops back to a visited page; stopping");
            }
            Some(next) => {
                info!(%next, "Found \"Earlier meetings\" link");
                current = Some(next);
            }
            None => {
                debug!("No \"Earlier meetings\" link on this page");
            }
        }
    }

    info!(pages, count = meeting_urls.len(), "Finished scraping meeting list");
    meeting_urls
}

/// Crawl every committee of a council and download their minutes.
///
/// Returns committee name → committee URL and meeting pages. Committees whose
/// URL carries no identifier are kept with an empty page list.
#[instrument(level = "info", skip_all, fields(%base, paginate = run.paginate))]
pub async fn get_minutes_for_council<F, S>(
    fetcher: &F,
    shape: &S,
    base: &Url,
    run: &CouncilRun<'_>,
) -> BTreeMap<String, CommitteeMeetingData>
where
    F: PageFetcher,
    S: PageShape,
{
    let mut all = BTreeMap::new();

    let committees = get_committees(fetcher, shape, base).await;
    if committees.is_empty() {
        warn!("Could not retrieve the list of committees");
        return all;
    }

    let take = if run.first_committee_only { 1 } else { committees.len() };
    let mut downloaded = 0usize;

    for committee in committees.into_iter().take(take) {
        info!(committee = %committee.name, "Processing committee");

        let committee_id = Url::parse(&committee.url)
            .ok()
            .and_then(|url| shape.committee_id(&url));
        let Some(committee_id) = committee_id else {
            warn!(url = %committee.url, "Could not extract committee ID");
            all.insert(
                committee.name,
                CommitteeMeetingData {
                    committee_url: committee.url,
                    meeting_page_urls: Vec::new(),
                },
            );
            continue;
        };

        let meeting_urls = match shape.meetings_url(base, &committee_id) {
            Ok(start) => {
                scrape_meeting_links(fetcher, shape, run.crawl, start, base, run.paginate).await
            }
            Err(e) => {
                warn!(%committee_id, error = %e, "Could not build meeting list URL");
                BTreeSet::new()
            }
        };
        info!(committee = %committee.name, count = meeting_urls.len(), "Found meeting pages");

        for meeting_url in &meeting_urls {
            let files = download_minutes(fetcher, shape, meeting_url, &committee.name, run.minutes_root).await;
            downloaded += files.len();
        }

        all.insert(
            committee.name,
            CommitteeMeetingData {
                committee_url: committee.url,
                meeting_page_urls: meeting_urls.iter().map(Url::to_string).collect(),
            },
        );
    }

    info!(committees = all.len(), downloaded, "Council run complete");
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticSite;
    use crate::scrapers::ModernGov;
    use std::time::{Duration, Instant};

    const BASE: &str = "https://democracy.example.gov.uk/";

    fn base() -> Url {
        Url::parse(BASE).unwrap()
    }

    fn fast(cap: usize) -> CrawlConfig {
        CrawlConfig {
            page_cap: cap,
            polite_delay: Duration::ZERO,
        }
    }

    fn list_page(meetings: &[u32], earlier: Option<&str>) -> String {
        let mut html = String::from("<html><body><ul>");
        for (i, id) in meetings.iter().enumerate() {
            let class = if i % 2 == 0 { "mgTableOddRow" } else { "mgTableEvenRow" };
            html.push_str(&format!(
                r#"<li class="{class}"><a href="ieListDocuments.aspx?CId=1&amp;MId={id}">Meeting {id}</a></li>"#
            ));
        }
        html.push_str("</ul>");
        if let Some(href) = earlier {
            html.push_str(&format!(r#"<a href="{href}">Earlier meetings</a>"#));
        }
        html.push_str("</body></html>");
        html
    }

    fn page_url(n: usize) -> String {
        if n == 0 {
            format!("{BASE}ieListMeetings.aspx?CommitteeId=1")
        } else {
            format!("{BASE}ieListMeetings.aspx?CommitteeId=1&PN={n}")
        }
    }

    fn page_href(n: usize) -> String {
        page_url(n).trim_start_matches(BASE).to_string()
    }

    #[tokio::test]
    async fn test_follows_earlier_meetings_chain() {
        let site = StaticSite::new()
            .page(&page_url(0), list_page(&[1, 2], Some(&page_href(1))))
            .page(&page_url(1), list_page(&[3, 2], Some(&page_href(2))))
            .page(&page_url(2), list_page(&[4], None));

        let start = Url::parse(&page_url(0)).unwrap();
        let urls = scrape_meeting_links(&site, &ModernGov, &fast(50), start, &base(), true).await;

        assert_eq!(urls.len(), 4);
        assert!(urls.iter().all(|u| u.as_str().starts_with(BASE)));
        assert_eq!(site.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_no_pagination_visits_one_page() {
        let site = StaticSite::new()
            .page(&page_url(0), list_page(&[1, 2], Some(&page_href(1))))
            .page(&page_url(1), list_page(&[3], None));

        let start = Url::parse(&page_url(0)).unwrap();
        let urls = scrape_meeting_links(&site, &ModernGov, &fast(50), start, &base(), false).await;

        assert_eq!(urls.len(), 2);
        assert_eq!(site.requests(), vec![page_url(0)]);
    }

    #[tokio::test]
    async fn test_polite_delay_after_every_page() {
        let delay = Duration::from_millis(100);
        let config = CrawlConfig {
            page_cap: 50,
            polite_delay: delay,
        };

        let single = StaticSite::new().page(&page_url(0), list_page(&[1], Some(&page_href(1))));
        let t0 = Instant::now();
        let start = Url::parse(&page_url(0)).unwrap();
        scrape_meeting_links(&single, &ModernGov, &config, start, &base(), false).await;
        let elapsed = t0.elapsed();
        assert!(elapsed >= delay, "one page, no wait: {elapsed:?}");
        assert!(elapsed < delay * 2, "one page, waited twice: {elapsed:?}");

        let chain = StaticSite::new()
            .page(&page_url(0), list_page(&[1], Some(&page_href(1))))
            .page(&page_url(1), list_page(&[2], None));
        let t0 = Instant::now();
        let start = Url::parse(&page_url(0)).unwrap();
        scrape_meeting_links(&chain, &ModernGov, &config, start, &base(), true).await;
        let elapsed = t0.elapsed();
        assert!(elapsed >= delay * 2, "two pages, fewer than two waits: {elapsed:?}");
        assert!(elapsed < delay * 3, "two pages, more than two waits: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_no_delay_after_failed_fetch() {
        let config = CrawlConfig {
            page_cap: 50,
            polite_delay: Duration::from_millis(200),
        };
        let t0 = Instant::now();
        let start = Url::parse(&page_url(0)).unwrap();
        let urls = scrape_meeting_links(&StaticSite::new(), &ModernGov, &config, start, &base(), true).await;
        assert!(urls.is_empty());
        assert!(t0.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_cyclic_chain_terminates() {
        // page 0 -> page 1 -> page 0 -> ...
        let site = StaticSite::new()
            .page(&page_url(0), list_page(&[1], Some(&page_href(1))))
            .page(&page_url(1), list_page(&[2], Some(&page_href(0))));

        let start = Url::parse(&page_url(0)).unwrap();
        let urls = scrape_meeting_links(&site, &ModernGov, &fast(50), start, &base(), true).await;

        assert_eq!(urls.len(), 2);
        assert!(site.requests().len() <= 50);
        assert_eq!(site.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_page_cap_bounds_long_chain() {
        let mut site = StaticSite::new();
        for n in 0..80 {
            site = site.page(&page_url(n), list_page(&[n as u32], Some(&page_href(n + 1))));
        }

        let start = Url::parse(&page_url(0)).unwrap();
        let urls = scrape_meeting_links(&site, &ModernGov, &fast(50), start, &base(), true).await;

        assert_eq!(site.requests().len(), 50);
        assert_eq!(urls.len(), 50);
    }

    #[tokio::test]
    async fn test_failed_fetch_returns_partial_set() {
        // page 2 is missing, so its fetch fails
        let site = StaticSite::new()
            .page(&page_url(0), list_page(&[1, 2], Some(&page_href(1))))
            .page(&page_url(1), list_page(&[3], Some(&page_href(2))));

        let start = Url::parse(&page_url(0)).unwrap();
        let urls = scrape_meeting_links(&site, &ModernGov, &fast(50), start, &base(), true).await;

        assert_eq!(urls.len(), 3);
        assert_eq!(site.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_first_page_failure_is_empty() {
        let site = StaticSite::new();
        let start = Url::parse(&page_url(0)).unwrap();
        let urls = scrape_meeting_links(&site, &ModernGov, &fast(50), start, &base(), true).await;
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn test_get_committees_failure_is_empty() {
        let site = StaticSite::new();
        assert!(get_committees(&site, &ModernGov, &base()).await.is_empty());

        let site = StaticSite::new().page(
            &format!("{BASE}mgListCommittees.aspx?bcr=1"),
            "<html><body>maintenance</body></html>",
        );
        assert!(get_committees(&site, &ModernGov, &base()).await.is_empty());
    }

    #[tokio::test]
    async fn test_council_run_end_to_end() {
        let committees = r#"<div id="modgov"><ul class="mgBulletList">
            <li><a href="mgCommitteeDetails.aspx?ID=1">County Council</a></li>
            <li><a href="mgCommitteeDetails.aspx">Broken Committee</a></li>
        </ul></div>"#;
        let meeting = r#"<a href="documents/g1/Printed%20minutes.pdf">Printed minutes</a>"#;

        let site = StaticSite::new()
            .page(&format!("{BASE}mgListCommittees.aspx?bcr=1"), committees)
            .page(&page_url(0), list_page(&[7], Some(&page_href(1))))
            .page(&format!("{BASE}ieListDocuments.aspx?CId=1&MId=7"), meeting)
            .page(&format!("{BASE}documents/g1/Printed%20minutes.pdf"), b"%PDF-1.4".to_vec());

        let tmp = tempfile::tempdir().unwrap();
        let crawl = fast(50);
        let run = CouncilRun {
            crawl: &crawl,
            paginate: false,
            first_committee_only: false,
            minutes_root: tmp.path(),
        };
        let data = get_minutes_for_council(&site, &ModernGov, &base(), &run).await;

        assert_eq!(data.len(), 2);
        let council = &data["County Council"];
        assert_eq!(council.meeting_page_urls, vec![format!("{BASE}ieListDocuments.aspx?CId=1&MId=7")]);
        assert!(data["Broken Committee"].meeting_page_urls.is_empty());

        let pdf = tmp.path().join("County_Council").join("Printed minutes.pdf");
        assert_eq!(std::fs::read(pdf).unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_council_run_first_committee_only() {
        let committees = r#"<div id="modgov"><ul class="mgBulletList">
            <li><a href="mgCommitteeDetails.aspx?ID=1">County Council</a></li>
            <li><a href="mgCommitteeDetails.aspx?ID=2">Cabinet</a></li>
        </ul></div>"#;
        let site = StaticSite::new()
            .page(&format!("{BASE}mgListCommittees.aspx?bcr=1"), committees)
            .page(&page_url(0), list_page(&[], None));

        let tmp = tempfile::tempdir().unwrap();
        let crawl = fast(50);
        let run = CouncilRun {
            crawl: &crawl,
            paginate: true,
            first_committee_only: true,
            minutes_root: tmp.path(),
        };
        let data = get_minutes_for_council(&site, &ModernGov, &base(), &run).await;
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["County Council"]);
    }
}
