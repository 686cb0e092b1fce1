//! Committee memberships per councillor.
//!
//! Walks every profile linked from the member index and records which
//! committees each councillor sits on. Profiles are fetched one after another
//! with the crawl's polite delay between them.

use crate::config::CrawlConfig;
use crate::fetch::PageFetcher;
use crate::models::{Councillor, CouncillorMemberships};
use crate::scrapers::PageShape;
use crate::utils::query_param;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::error::Error;
use tokio::time::sleep;
use tracing::{info, instrument, warn};
use url::Url;

/// Read one councillor profile. Profiles without a name or UID are skipped.
async fn fetch_councillor<F, S>(fetcher: &F, shape: &S, profile: &Url) -> Option<Councillor>
where
    F: PageFetcher,
    S: PageShape,
{
    let html = match fetcher.fetch_text(profile).await {
        Ok(html) => html,
        Err(e) => {
            warn!(url = %profile, error = %e, "Failed to fetch councillor profile");
            return None;
        }
    };
    let Some(name) = shape.councillor_name(&html) else {
        warn!(url = %profile, "Profile page has no councillor name");
        return None;
    };
    let Some(uid) = query_param(profile, "UID").filter(|uid| !uid.is_empty()) else {
        warn!(url = %profile, "Profile URL has no UID");
        return None;
    };
    let committees = shape.committee_memberships(&html);

    Some(Councillor {
        name,
        uid,
        committees,
    })
}

/// Map of councillor name to their committee memberships.
///
/// # Errors
///
/// Fails only when the member index cannot be fetched. Unreadable profiles are
/// logged and skipped.
#[instrument(level = "info", skip_all, fields(%base, shape = shape.name()))]
pub async fn collect_memberships<F, S>(
    fetcher: &F,
    shape: &S,
    config: &CrawlConfig,
    base: &Url,
) -> Result<BTreeMap<String, CouncillorMemberships>, Box<dyn Error>>
where
    F: PageFetcher,
    S: PageShape,
{
    let index_url = shape.member_index_url(base)?;
    let html = fetcher.fetch_text(&index_url).await?;
    let profiles = shape.profile_links(&html, base);
    info!(count = profiles.len(), "Found councillor profiles");

    let total = profiles.len();
    let councillors: Vec<Option<Councillor>> = stream::iter(profiles.into_iter().enumerate())
        .then(|(i, profile)| async move {
            let councillor = fetch_councillor(fetcher, shape, &profile).await;
            if i + 1 < total {
                sleep(config.polite_delay).await;
            }
            councillor
        })
        .collect()
        .await;

    let memberships: BTreeMap<String, CouncillorMemberships> = councillors
        .into_iter()
        .flatten()
        .map(|councillor| (councillor.name.clone(), CouncillorMemberships { councillor }))
        .collect();

    info!(councillors = memberships.len(), "Collected committee memberships");
    Ok(memberships)
}
