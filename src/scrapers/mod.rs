//! Page-shape adapters for council committee software.
//!
//! A [`PageShape`] knows where a council-software variant keeps its pages and
//! how to read them: URL layouts, CSS selectors, link labels. The pipelines in
//! [`crate::crawl`], [`crate::download`], [`crate::reform`] and
//! [`crate::members`] only ever talk to markup through this trait, so a new
//! variant is supported by adding one adapter module here.
//!
//! # Supported Variants
//!
//! | Variant | Module | Notes |
//! |---------|--------|-------|
//! | ModernGov | [`moderngov`] | `mg*.aspx` / `ie*.aspx` pages, `#modgov` container |
//!
//! All methods are pure functions of their inputs; fetching is done by the
//! caller.

use crate::models::{Committee, CouncillorRef};
use url::{ParseError, Url};

pub mod moderngov;

pub use moderngov::ModernGov;

/// Headline attendance numbers from a councillor's statistics table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceStats {
    pub expected: u32,
    pub present: u32,
}

/// URL layout and markup of one council-software variant.
///
/// `base` arguments are normalised site roots ending in `/`
/// (see [`crate::utils::normalize_base_url`]).
pub trait PageShape {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Page listing every committee.
    fn committees_url(&self, base: &Url) -> Result<Url, ParseError>;

    /// Committees on the committee list page.
    ///
    /// `None` means the page does not have the expected container at all,
    /// which is logged differently from an empty list.
    fn parse_committees(&self, html: &str, page_url: &Url) -> Option<Vec<Committee>>;

    /// Identifier used to address a committee's meetings.
    fn committee_id(&self, committee_url: &Url) -> Option<String>;

    /// First meeting-list page of a committee.
    fn meetings_url(&self, base: &Url, committee_id: &str) -> Result<Url, ParseError>;

    /// Links to individual meeting pages on a meeting-list page.
    fn meeting_links(&self, html: &str, resolve_base: &Url) -> Vec<Url>;

    /// The link to the next (older) meeting-list page, if any.
    fn earlier_meetings_link(&self, html: &str, resolve_base: &Url) -> Option<Url>;

    /// Candidate minutes documents on a meeting page, resolved against it.
    ///
    /// No filtering by type or origin happens here.
    fn minutes_links(&self, html: &str, page_url: &Url) -> Vec<Url>;

    /// Page listing every councillor with their party.
    fn member_index_url(&self, base: &Url) -> Result<Url, ParseError>;

    /// Councillors on the member index whose party starts with `party`.
    fn party_members(&self, html: &str, base: &Url, party: &str) -> Vec<CouncillorRef>;

    /// Profile links of every councillor on the member index.
    fn profile_links(&self, html: &str, base: &Url) -> Vec<Url>;

    /// The councillor's display name on their profile page.
    fn councillor_name(&self, html: &str) -> Option<String>;

    /// Committee names listed on a profile page.
    fn committee_memberships(&self, html: &str) -> Vec<String>;

    /// A councillor's attendance statistics page.
    fn attendance_url(&self, base: &Url, uid: &str) -> Result<Url, ParseError>;

    /// Expected/present counts from the attendance statistics page.
    fn attendance_stats(&self, html: &str) -> Option<AttendanceStats>;
}
