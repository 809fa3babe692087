//! Duplicate merchant merger.
//!
//! The aggregator's raw keys can split one physical merchant across
//! several groups (canonical id on most orders, legacy id or a name on a
//! few). After resolution, groups are merged when:
//!
//! - both resolved to the same canonical merchant, or
//! - both are unresolved and their normalized names match, or
//! - one is unresolved and its normalized name matches the name of exactly
//!   one resolved merchant in the set.
//!
//! Merging sums counts and revenue. Passes repeat until nothing changes,
//! bounded by [`MAX_MERGE_PASSES`].
//!
//! An unresolved key whose ledger row is already Paid is never folded into
//! a resolved merchant. Its orders stay on the paid row, so the same
//! revenue cannot reappear on a Pending row.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use messpay_types::merchant::normalize_name;
use messpay_types::{Amount, Merchant, MerchantKey};

use crate::resolver::Resolution;

/// Upper bound on merge passes before giving up with a warning.
pub const MAX_MERGE_PASSES: usize = 8;

/// A resolved group of orders for one merchant identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MerchantGroup {
    pub key: MerchantKey,
    /// Directory record, when resolved.
    pub merchant: Option<Merchant>,
    pub display_name: String,
    pub order_count: u64,
    pub revenue: Amount,
    /// Orders seen under each raw name, for picking an unresolved name.
    #[serde(skip)]
    name_votes: BTreeMap<String, u64>,
}

impl MerchantGroup {
    pub fn new(resolution: Resolution, order_count: u64, revenue: Amount) -> Self {
        let key = resolution.key();
        let name_votes = BTreeMap::from([(resolution.display_name().to_string(), order_count)]);
        let (merchant, display_name) = match resolution {
            Resolution::Resolved(merchant) => (Some(merchant.clone()), merchant.name),
            Resolution::Unresolved { name } => (None, name),
        };
        Self {
            key,
            merchant,
            display_name,
            order_count,
            revenue,
            name_votes,
        }
    }

    /// Fold `other` into `self`. The directory name wins. Otherwise the
    /// non-empty raw name backed by the most orders wins, ties broken
    /// lexicographically, so the result does not depend on merge order.
    fn absorb(&mut self, other: MerchantGroup) {
        if self.merchant.is_none() && other.merchant.is_some() {
            self.key = other.key;
            self.merchant = other.merchant;
        }
        for (name, votes) in other.name_votes {
            *self.name_votes.entry(name).or_default() += votes;
        }
        self.display_name = match &self.merchant {
            Some(m) => m.name.clone(),
            None => best_name(&self.name_votes),
        };
        self.order_count += other.order_count;
        self.revenue = self.revenue.saturating_add(other.revenue);
    }
}

fn best_name(votes: &BTreeMap<String, u64>) -> String {
    votes
        .iter()
        .filter(|(name, _)| !name.trim().is_empty())
        // max_by_key keeps the last maximum; iterate in reverse so the
        // lexicographically smallest name wins ties.
        .rev()
        .max_by_key(|(_, &count)| count)
        .map(|(name, _)| name.clone())
        .unwrap_or_default()
}

/// Anomalies noticed while merging. None of them discards data.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeWarning {
    /// An unresolved name matches several resolved merchants; left separate.
    AmbiguousName { name: String, candidates: Vec<String> },
    /// The fixed point was not reached within the pass bound.
    NotConverged { passes: usize },
    /// An unresolved row already paid out matches a resolved merchant; it
    /// keeps its own row.
    PaidRowKept { key: String, merchant: String },
}

/// Result of [`merge`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Merged groups sorted by key.
    pub groups: Vec<MerchantGroup>,
    pub passes: usize,
    pub warnings: Vec<MergeWarning>,
}

/// Merge groups to a fixed point.
pub fn merge(groups: Vec<MerchantGroup>) -> MergeOutcome {
    merge_with_paid(groups, &BTreeSet::new())
}

/// Merge groups to a fixed point, keeping each unresolved key in `paid`
/// on its own row.
pub fn merge_with_paid(groups: Vec<MerchantGroup>, paid: &BTreeSet<MerchantKey>) -> MergeOutcome {
    let mut warnings = BTreeSet::new();
    let mut current = groups;
    let mut passes = 0;
    let mut converged = false;

    while passes < MAX_MERGE_PASSES {
        passes += 1;
        let (next, changed) = merge_pass(current, paid, &mut warnings);
        current = next;
        if !changed {
            converged = true;
            break;
        }
    }

    if !converged {
        tracing::warn!(passes, "merchant merge did not reach a fixed point");
        warnings.insert(MergeWarning::NotConverged { passes });
    }

    MergeOutcome {
        groups: current,
        passes,
        warnings: warnings.into_iter().collect(),
    }
}

/// One pass. Returns the merged groups and whether anything merged.
fn merge_pass(
    groups: Vec<MerchantGroup>,
    paid: &BTreeSet<MerchantKey>,
    warnings: &mut BTreeSet<MergeWarning>,
) -> (Vec<MerchantGroup>, bool) {
    let mut changed = false;

    let mut by_key: BTreeMap<MerchantKey, MerchantGroup> = BTreeMap::new();
    for group in groups {
        match by_key.get_mut(&group.key) {
            Some(existing) => {
                existing.absorb(group);
                changed = true;
            }
            None => {
                by_key.insert(group.key.clone(), group);
            }
        }
    }

    let mut resolved_by_name: BTreeMap<String, Vec<MerchantKey>> = BTreeMap::new();
    for group in by_key.values().filter(|g| g.key.is_resolved()) {
        resolved_by_name
            .entry(normalize_name(&group.display_name))
            .or_default()
            .push(group.key.clone());
    }

    let unresolved: Vec<MerchantKey> = by_key
        .keys()
        .filter(|k| !k.is_resolved())
        .cloned()
        .collect();
    for key in unresolved {
        let MerchantKey::Unresolved(name) = &key else {
            continue;
        };
        match resolved_by_name.get(name).map(Vec::as_slice) {
            Some([target]) if paid.contains(&key) => {
                warnings.insert(MergeWarning::PaidRowKept {
                    key: key.to_string(),
                    merchant: target.to_string(),
                });
            }
            Some([target]) => {
                if let Some(group) = by_key.remove(&key) {
                    if let Some(existing) = by_key.get_mut(target) {
                        tracing::debug!(from = %key, into = %target, "merging unresolved group by name");
                        existing.absorb(group);
                        changed = true;
                    }
                }
            }
            Some(targets) if targets.len() > 1 => {
                warnings.insert(MergeWarning::AmbiguousName {
                    name: name.clone(),
                    candidates: targets.iter().map(ToString::to_string).collect(),
                });
            }
            _ => {}
        }
    }

    (by_key.into_values().collect(), changed)
}
