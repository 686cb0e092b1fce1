//! ModernGov page shape.
//!
//! ModernGov sites expose the same page names on every council:
//!
//! | Page | Used for |
//! |------|----------|
//! | `mgListCommittees.aspx?bcr=1` | committee list inside `#modgov` / `ul.mgBulletList` |
//! | `ieListMeetings.aspx?CommitteeId=N` | meeting list rows `li.mgTableOddRow` / `li.mgTableEvenRow` |
//! | `mgMemberIndex.aspx?VW=TABLE&PIC=1&FN=` | member table with party column |
//! | `mgUserInfo.aspx?UID=N` | councillor profile |
//! | `mgAttendanceSummary.aspx?UID=N` | `table.mgStatsTable` attendance figures |
//!
//! Meeting-list pages link to older pages with an "Earlier meetings" anchor.

use super::{AttendanceStats, PageShape};
use crate::models::{Committee, CouncillorRef};
use crate::utils::query_param;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::{ParseError, Url};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static MODGOV: Lazy<Selector> = Lazy::new(|| selector("#modgov"));
static BULLET_LINKS: Lazy<Selector> = Lazy::new(|| selector("ul.mgBulletList li a"));
static MEETING_LINKS: Lazy<Selector> = Lazy::new(|| {
    selector("li.mgTableOddRow > a:nth-child(1), li.mgTableEvenRow > a:nth-child(1)")
});
static ANCHORS: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static MG_CONTENT: Lazy<Selector> = Lazy::new(|| selector(".mgContent"));
static TABLE: Lazy<Selector> = Lazy::new(|| selector("table"));
static PROFILE_LINKS: Lazy<Selector> =
    Lazy::new(|| selector(r#"#mgTable1 tr a[href*="mgUserInfo.aspx"]"#));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("h1.mgMainTitleTxt"));
static COMMITTEE_LINKS: Lazy<Selector> =
    Lazy::new(|| selector(r#"a[href*="mgCommitteeDetails"]"#));
static STATS_ROWS: Lazy<Selector> = Lazy::new(|| selector("table.mgStatsTable tr"));
static CELLS: Lazy<Selector> = Lazy::new(|| selector("th, td"));
static LEADING_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)").expect("static regex"));

const EARLIER_MEETINGS: &str = "Earlier meetings";

/// The ModernGov adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModernGov;

/// Element text with whitespace runs collapsed.
fn clean_text(el: &ElementRef) -> String {
    el.text().flat_map(str::split_whitespace).join(" ")
}

/// Resolve `href` and keep it only if it is an http(s) URL.
fn resolve(base: &Url, href: &str) -> Option<Url> {
    let url = base.join(href.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Direct element children with the given tag name.
fn children_named<'a>(el: ElementRef<'a>, tag: &'a str) -> impl Iterator<Item = ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(move |c| c.value().name() == tag)
}

#[derive(Debug, PartialEq, Eq)]
enum StatLabel {
    Expected,
    Present,
}

fn classify_label(label: &str) -> Option<StatLabel> {
    let l = label.trim().trim_end_matches(':').to_lowercase();
    if l.contains("as expected") {
        None
    } else if l.starts_with("present") {
        Some(StatLabel::Present)
    } else if l.contains("expected") {
        Some(StatLabel::Expected)
    } else {
        None
    }
}

fn parse_count(cell: &str) -> Option<u32> {
    LEADING_COUNT.captures(cell)?.get(1)?.as_str().parse().ok()
}

/// Read expected/present from table rows.
///
/// Handles both layouts seen on ModernGov sites: one label cell followed by
/// its count on each row, or a header row of labels over a row of counts.
fn stats_from_rows(rows: &[Vec<String>]) -> Option<AttendanceStats> {
    let mut expected = None;
    let mut present = None;

    for row in rows {
        let Some((label, rest)) = row.split_first() else {
            continue;
        };
        let Some(value) = rest.iter().find_map(|c| parse_count(c)) else {
            continue;
        };
        match classify_label(label) {
            Some(StatLabel::Expected) if expected.is_none() => expected = Some(value),
            Some(StatLabel::Present) if present.is_none() => present = Some(value),
            _ => {}
        }
    }

    if expected.is_none() || present.is_none() {
        for pair in rows.windows(2) {
            let (header, values) = (&pair[0], &pair[1]);
            for (i, label) in header.iter().enumerate() {
                let value = values.get(i).and_then(|c| parse_count(c));
                match (classify_label(label), value) {
                    (Some(StatLabel::Expected), Some(v)) if expected.is_none() => expected = Some(v),
                    (Some(StatLabel::Present), Some(v)) if present.is_none() => present = Some(v),
                    _ => {}
                }
            }
            if expected.is_some() && present.is_some() {
                break;
            }
        }
    }

    Some(AttendanceStats {
        expected: expected?,
        present: present?,
    })
}

impl PageShape for ModernGov {
    fn name(&self) -> &'static str {
        "moderngov"
    }

    fn committees_url(&self, base: &Url) -> Result<Url, ParseError> {
        base.join("mgListCommittees.aspx?bcr=1")
    }

    fn parse_committees(&self, html: &str, page_url: &Url) -> Option<Vec<Committee>> {
        let document = Html::parse_document(html);
        let container = document.select(&MODGOV).next()?;
        let committees = container
            .select(&BULLET_LINKS)
            .filter_map(|a| {
                let name = clean_text(&a);
                let href = a.value().attr("href")?;
                if name.is_empty() || href.trim().is_empty() {
                    return None;
                }
                let url = resolve(page_url, href)?;
                Some(Committee {
                    name,
                    url: url.to_string(),
                })
            })
            .collect();
        Some(committees)
    }

    fn committee_id(&self, committee_url: &Url) -> Option<String> {
        query_param(committee_url, "ID")
    }

    fn meetings_url(&self, base: &Url, committee_id: &str) -> Result<Url, ParseError> {
        base.join(&format!(
            "ieListMeetings.aspx?CommitteeId={}",
            urlencoding::encode(committee_id)
        ))
    }

    fn meeting_links(&self, html: &str, resolve_base: &Url) -> Vec<Url> {
        let document = Html::parse_document(html);
        document
            .select(&MEETING_LINKS)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| resolve(resolve_base, href))
            .collect()
    }

    fn earlier_meetings_link(&self, html: &str, resolve_base: &Url) -> Option<Url> {
        let document = Html::parse_document(html);
        document
            .select(&ANCHORS)
            .find(|a| clean_text(a) == EARLIER_MEETINGS)
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve(resolve_base, href))
    }

    fn minutes_links(&self, html: &str, page_url: &Url) -> Vec<Url> {
        let document = Html::parse_document(html);
        document
            .select(&ANCHORS)
            .filter(|a| {
                let text = clean_text(a).to_lowercase();
                text.contains("printed minutes") || text == "minutes"
            })
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| resolve(page_url, href))
            .unique()
            .collect()
    }

    fn member_index_url(&self, base: &Url) -> Result<Url, ParseError> {
        base.join("mgMemberIndex.aspx?VW=TABLE&PIC=1&FN=")
    }

    fn party_members(&self, html: &str, base: &Url, party: &str) -> Vec<CouncillorRef> {
        let document = Html::parse_document(html);
        let Some(table) = document
            .select(&MG_CONTENT)
            .next()
            .and_then(|content| content.select(&TABLE).next())
        else {
            debug!("No member table inside .mgContent");
            return Vec::new();
        };

        children_named(table, "tbody")
            .flat_map(|tbody| children_named(tbody, "tr"))
            .filter_map(|row| {
                let cells: Vec<ElementRef> = children_named(row, "td").collect();
                let party_cell = clean_text(cells.get(2)?);
                if !party_cell.starts_with(party) {
                    return None;
                }
                let link = cells.get(1)?.select(&ANCHORS).next()?;
                let profile = resolve(base, link.value().attr("href")?)?;
                let uid = query_param(&profile, "UID")?;
                Some(CouncillorRef {
                    uid,
                    name: clean_text(&link),
                    profile_url: profile.to_string(),
                })
            })
            .unique_by(|c| c.uid.clone())
            .collect()
    }

    fn profile_links(&self, html: &str, base: &Url) -> Vec<Url> {
        let document = Html::parse_document(html);
        document
            .select(&PROFILE_LINKS)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| resolve(base, href))
            .unique()
            .collect()
    }

    fn councillor_name(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        document
            .select(&TITLE)
            .next()
            .map(|h1| clean_text(&h1))
            .filter(|name| !name.is_empty())
    }

    fn committee_memberships(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        document
            .select(&COMMITTEE_LINKS)
            .map(|a| clean_text(&a))
            .filter(|name| !name.is_empty())
            .collect()
    }

    fn attendance_url(&self, base: &Url, uid: &str) -> Result<Url, ParseError> {
        base.join(&format!(
            "mgAttendanceSummary.aspx?UID={}",
            urlencoding::encode(uid)
        ))
    }

    fn attendance_stats(&self, html: &str) -> Option<AttendanceStats> {
        let document = Html::parse_document(html);
        let rows: Vec<Vec<String>> = document
            .select(&STATS_ROWS)
            .map(|tr| tr.select(&CELLS).map(|c| clean_text(&c)).collect())
            .collect();
        stats_from_rows(&rows)
    }
}
