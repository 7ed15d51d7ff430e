//! Ranking a [`notice_types::Diff`] into the bounded `highlights` list
//! of an [`notice_types::EventSummary`].

use notice_types::{
    BaselineChangeHighlight, BaselineStatusWire, BaselineTag, BrowserChangeHighlight,
    BrowserStatusWire, BrowserSupportStatus, Diff, EventSummary, FeatureKey, NameChange,
    SummaryCategories, SummaryHighlight, EVENT_SUMMARY_SCHEMA_V1,
};

/// Default cap on the number of highlights carried in a summary.
pub const DEFAULT_HIGHLIGHT_CAP: usize = 20;

/// Build the [`EventSummary`] for a diff.
///
/// `query_changed` reflects the second publish trigger: the saved
/// search's query text itself changed since the previous event.
/// Counters are always exact; only `highlights` is truncated to
/// `cap`, ranked by salience (baseline promotions, then browser
/// completions, then renames, then moves/splits/other updates),
/// ascending by `feature_key` within a rank.
pub fn build_summary(diff: &Diff, query_changed: bool, cap: usize) -> EventSummary {
    let categories = SummaryCategories {
        query_changed: query_changed as u32,
        added: diff.added.len() as u32,
        removed: diff.removed.len() as u32,
        // The upstream catalog distinguishes a feature dropping out of a
        // saved search's results ("removed") from a feature being
        // retired from the catalog entirely ("deleted"); our diff model
        // only ever observes the former (a StateSnapshot is a search
        // result, not the raw catalog), so `deleted` is always 0 here.
        // See DESIGN.md.
        deleted: 0,
        moved: diff.moved.len() as u32,
        split: diff.split.len() as u32,
        updated: diff.updated.len() as u32,
        updated_impl: diff
            .updated
            .iter()
            .filter(|u| !u.impl_changes.is_empty())
            .count() as u32,
        updated_rename: diff.updated.iter().filter(|u| u.rename.is_some()).count() as u32,
        updated_baseline: diff
            .updated
            .iter()
            .filter(|u| u.baseline_change.is_some())
            .count() as u32,
    };

    let mut ranked: Vec<(u8, FeatureKey, SummaryHighlight)> = Vec::new();

    for u in &diff.updated {
        let name_change = u.rename.as_ref().map(|r| NameChange {
            from: r.from.clone(),
            to: r.to.clone(),
        });
        let baseline_change = u.baseline_change.as_ref().map(|b| BaselineChangeHighlight {
            from: BaselineStatusWire::from(&b.from_status),
            to: BaselineStatusWire::from(&b.to_status),
        });
        let browser_changes = u
            .impl_changes
            .iter()
            .map(|c| {
                (
                    c.browser.clone(),
                    BrowserChangeHighlight {
                        from: BrowserStatusWire {
                            status: c.from,
                            version: None,
                            date: None,
                        },
                        to: BrowserStatusWire {
                            status: c.to,
                            version: None,
                            date: None,
                        },
                    },
                )
            })
            .collect();

        let rank = rank_update(u);
        let feature_name = u
            .rename
            .as_ref()
            .map(|r| r.to.clone())
            .unwrap_or_else(|| u.feature_key.to_string());

        ranked.push((
            rank,
            u.feature_key.clone(),
            SummaryHighlight::Changed {
                feature_id: u.feature_key.clone(),
                feature_name,
                name_change,
                baseline_change,
                browser_changes,
            },
        ));
    }

    for m in &diff.moved {
        ranked.push((
            3,
            m.old_key.clone(),
            SummaryHighlight::Moved {
                feature_id: m.old_key.clone(),
                new_feature_id: m.new_key.clone(),
            },
        ));
    }

    for s in &diff.split {
        ranked.push((
            4,
            s.old_key.clone(),
            SummaryHighlight::Split {
                feature_id: s.old_key.clone(),
                new_feature_ids: s.new_keys.clone(),
            },
        ));
    }

    ranked.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let truncated = ranked.len() > cap;
    let highlights = ranked
        .into_iter()
        .take(cap)
        .map(|(_, _, h)| h)
        .collect();

    EventSummary {
        schema_version: EVENT_SUMMARY_SCHEMA_V1.to_string(),
        text: summary_text(&categories),
        categories,
        truncated,
        highlights,
    }
}

/// Salience rank for an updated feature: 0 = baseline promotion, 1 =
/// browser-implementation completion, 2 = rename, 5 = any other update
/// (e.g. a baseline regression or an implementation being pulled).
fn rank_update(u: &notice_types::UpdatedFeature) -> u8 {
    if let Some(change) = &u.baseline_change
        && is_promotion(change.from, change.to)
    {
        return 0;
    }
    if u
        .impl_changes
        .iter()
        .any(|c| c.to == BrowserSupportStatus::Available)
    {
        return 1;
    }
    if u.rename.is_some() {
        return 2;
    }
    5
}

fn is_promotion(from: BaselineTag, to: BaselineTag) -> bool {
    fn rank(tag: BaselineTag) -> u8 {
        match tag {
            BaselineTag::Limited => 0,
            BaselineTag::Newly => 1,
            BaselineTag::Widely => 2,
        }
    }
    rank(to) > rank(from)
}

fn summary_text(categories: &SummaryCategories) -> String {
    let mut parts = Vec::new();
    if categories.added > 0 {
        parts.push(format!("{} added", categories.added));
    }
    if categories.removed > 0 {
        parts.push(format!("{} removed", categories.removed));
    }
    if categories.updated > 0 {
        parts.push(format!("{} updated", categories.updated));
    }
    if categories.moved > 0 {
        parts.push(format!("{} moved", categories.moved));
    }
    if categories.split > 0 {
        parts.push(format!("{} split", categories.split));
    }
    if categories.query_changed > 0 {
        parts.push("query changed".to_string());
    }
    if parts.is_empty() {
        "no changes".to_string()
    } else {
        parts.join(", ")
    }
}
