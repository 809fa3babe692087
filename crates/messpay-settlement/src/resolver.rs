//! Merchant identity resolver.
//!
//! Resolution order, first match wins:
//!
//! 1. canonical id that exists in the directory
//! 2. legacy numeric id that exists in the directory, including an
//!    all-digit canonical-shaped id that missed step 1
//! 3. exact (case-sensitive) display name match
//! 4. unresolved, carrying the best available name
//!
//! Resolution never fails. An unresolved merchant still gets a payout row,
//! keyed by its normalized name.

use std::collections::{BTreeSet, HashMap};

use messpay_types::merchant::normalize_name;
use messpay_types::{LegacyId, Merchant, MerchantId, MerchantKey, MerchantRef};

/// Read access to the merchant directory.
pub trait MerchantDirectory {
    /// Lookup by canonical id.
    fn by_id(&self, id: &MerchantId) -> Option<&Merchant>;

    /// Lookup by legacy numeric id.
    fn by_legacy_id(&self, id: LegacyId) -> Option<&Merchant>;

    /// Lookup by exact display name. Names are not unique; implementations
    /// return a deterministic pick.
    fn by_name(&self, name: &str) -> Option<&Merchant>;
}

/// In-memory snapshot of the merchant directory.
#[derive(Debug, Default, Clone)]
pub struct MerchantIndex {
    merchants: Vec<Merchant>,
    by_id: HashMap<MerchantId, usize>,
    by_legacy: HashMap<LegacyId, usize>,
    by_name: HashMap<String, usize>,
}

impl MerchantIndex {
    /// Index a directory snapshot. Merchants are sorted by canonical id so
    /// that duplicate names and legacy ids resolve to the lowest id.
    pub fn new(mut merchants: Vec<Merchant>) -> Self {
        merchants.sort_by(|a, b| a.id.cmp(&b.id));
        let mut index = Self::default();
        for (i, m) in merchants.iter().enumerate() {
            index.by_id.entry(m.id.clone()).or_insert(i);
            if let Some(legacy) = m.legacy_id {
                index.by_legacy.entry(legacy).or_insert(i);
            }
            index.by_name.entry(m.name.clone()).or_insert(i);
        }
        index.merchants = merchants;
        index
    }

    pub fn len(&self) -> usize {
        self.merchants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merchants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Merchant> {
        self.merchants.iter()
    }
}

impl MerchantDirectory for MerchantIndex {
    fn by_id(&self, id: &MerchantId) -> Option<&Merchant> {
        self.by_id.get(id).map(|&i| &self.merchants[i])
    }

    fn by_legacy_id(&self, id: LegacyId) -> Option<&Merchant> {
        self.by_legacy.get(&id).map(|&i| &self.merchants[i])
    }

    fn by_name(&self, name: &str) -> Option<&Merchant> {
        self.by_name.get(name).map(|&i| &self.merchants[i])
    }
}

/// Outcome of resolving one merchant reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Merchant),
    /// No directory match. `name` is the best available display name.
    Unresolved { name: String },
}

impl Resolution {
    /// Ledger key for this outcome.
    pub fn key(&self) -> MerchantKey {
        match self {
            Self::Resolved(m) => MerchantKey::Resolved(m.id.clone()),
            Self::Unresolved { name } => MerchantKey::unresolved(name),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Resolved(m) => &m.name,
            Self::Unresolved { name } => name,
        }
    }

    /// Normalized name, used by the duplicate merger.
    pub fn normalized_name(&self) -> String {
        normalize_name(self.display_name())
    }
}

/// Resolve a raw reference and optional display name to a merchant.
pub fn resolve<D: MerchantDirectory + ?Sized>(
    directory: &D,
    reference: Option<&MerchantRef>,
    display_name: Option<&str>,
) -> Resolution {
    resolve_with_paid(directory, reference, display_name, &BTreeSet::new())
}

/// [`resolve`], except that a name-only match is skipped when the
/// unresolved key it would replace is in `paid`. Id matches are unaffected.
pub fn resolve_with_paid<D: MerchantDirectory + ?Sized>(
    directory: &D,
    reference: Option<&MerchantRef>,
    display_name: Option<&str>,
    paid: &BTreeSet<MerchantKey>,
) -> Resolution {
    let display_name = display_name.map(str::trim).filter(|n| !n.is_empty());

    let by_id = match reference {
        Some(MerchantRef::CanonicalId(id)) => directory
            .by_id(id)
            .or_else(|| id.as_legacy().and_then(|legacy| directory.by_legacy_id(legacy))),
        Some(MerchantRef::LegacyId(id)) => directory.by_legacy_id(*id),
        _ => None,
    };
    if let Some(merchant) = by_id {
        return Resolution::Resolved(merchant.clone());
    }

    let name = display_name
        .map(str::to_string)
        .or_else(|| reference.map(ToString::to_string))
        .unwrap_or_default();
    if !paid.is_empty() && paid.contains(&MerchantKey::unresolved(&name)) {
        tracing::debug!(name = %name, "name match skipped; unresolved row already paid");
        return Resolution::Unresolved { name };
    }

    let by_name = display_name.and_then(|n| directory.by_name(n)).or_else(|| match reference {
        // A free-text reference is a name too.
        Some(MerchantRef::Name(n)) => directory.by_name(n),
        _ => None,
    });
    match by_name {
        Some(merchant) => Resolution::Resolved(merchant.clone()),
        None => Resolution::Unresolved { name },
    }
}
