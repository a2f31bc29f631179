//! In-memory record store keyed by shop ID.

use std::collections::BTreeSet;

use crate::error::{Result, TpeError, ValidationError};
use crate::models::{MerchantCard, ShopId, Terminal, TerminalFamily, TerminalStats};

/// Ordered collection of terminal records with unique keys.
///
/// Records keep their insertion order. Keys are unique at all times; key
/// [`ShopId::AUTO`] on insertion means "assign the next free key".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalStore {
    /// Records in insertion order.
    records: Vec<Terminal>,
}

impl TerminalStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Builds a store from `records`, keeping their order.
    ///
    /// Explicit keys are claimed first; records carrying
    /// [`ShopId::AUTO`] are then numbered after the largest explicit key,
    /// in order of appearance.
    ///
    /// # Errors
    ///
    /// Returns [`TpeError::DuplicateShopId`] if two records share a key.
    #[inline]
    pub fn from_records<I: IntoIterator<Item = Terminal>>(records: I) -> Result<Self> {
        let records: Vec<Terminal> = records.into_iter().collect();
        let mut claimed = BTreeSet::new();
        for key in records
            .iter()
            .map(Terminal::shop_id)
            .filter(|key| !key.is_auto())
        {
            if !claimed.insert(key) {
                return Err(TpeError::DuplicateShopId(key));
            }
        }

        let mut last = claimed.last().map_or(0, |key| key.get());
        let mut store = Self {
            records: Vec::with_capacity(records.len()),
        };
        for mut record in records {
            if record.shop_id().is_auto() {
                last = last.checked_add(1).ok_or_else(|| {
                    ValidationError::ShopIdOutOfRange(i64::from(last).saturating_add(1))
                })?;
                record.assign_shop_id(ShopId::new(last));
            }
            store.records.push(record);
        }
        Ok(store)
    }

    /// Inserts a record and returns its key.
    ///
    /// A record carrying [`ShopId::AUTO`] gets one more than the largest key
    /// in the store (1 when empty).
    ///
    /// # Errors
    ///
    /// Returns [`TpeError::DuplicateShopId`] if the key is already taken;
    /// the store is left unchanged.
    #[inline]
    pub fn add(&mut self, mut record: Terminal) -> Result<ShopId> {
        if record.shop_id().is_auto() {
            record.assign_shop_id(self.next_shop_id()?);
        } else if self.find(record.shop_id()).is_some() {
            return Err(TpeError::DuplicateShopId(record.shop_id()));
        }
        let key = record.shop_id();
        self.records.push(record);
        tracing::debug!(%key, total = self.records.len(), "record added");
        Ok(key)
    }

    /// Removes the record with the given key.
    ///
    /// An absent key is a no-op and still succeeds, so this always returns
    /// `true`. Use [`take`](Self::take) to learn whether a record existed.
    #[inline]
    pub fn remove(&mut self, key: ShopId) -> bool {
        let _taken = self.take(key);
        true
    }

    /// Removes and returns the record with the given key, if any.
    #[inline]
    pub fn take(&mut self, key: ShopId) -> Option<Terminal> {
        let index = self
            .records
            .iter()
            .position(|record| record.shop_id() == key)?;
        let record = self.records.remove(index);
        tracing::debug!(%key, "record removed");
        Some(record)
    }

    /// Looks up a record by key.
    #[inline]
    #[must_use]
    pub fn find(&self, key: ShopId) -> Option<&Terminal> {
        self.records.iter().find(|record| record.shop_id() == key)
    }

    /// Replaces the record stored under `key`, in place.
    ///
    /// The new record inherits the key and creation time of the record it
    /// replaces. Returns `false` when no such record exists.
    #[inline]
    pub fn replace(&mut self, key: ShopId, mut record: Terminal) -> bool {
        let Some(slot) = self
            .records
            .iter_mut()
            .find(|existing| existing.shop_id() == key)
        else {
            return false;
        };
        record.assign_shop_id(key);
        record.inherit_created_at(slot.created_at());
        *slot = record;
        tracing::debug!(%key, "record replaced");
        true
    }

    /// All records in insertion order.
    #[inline]
    #[must_use]
    pub fn list(&self) -> &[Terminal] {
        &self.records
    }

    /// Number of records.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store holds no records.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Removes every record.
    #[inline]
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Aggregate counters over all records.
    #[inline]
    #[must_use]
    pub fn statistics(&self) -> TerminalStats {
        self.records
            .iter()
            .fold(TerminalStats::default(), |mut stats, record| {
                stats.total += 1;
                stats.total_devices += u64::from(record.device_count());
                if record.connectivity().is_wired() {
                    stats.wired += 1;
                }
                if record.connectivity().is_cellular() {
                    stats.cellular += 1;
                }
                if record.backoffice().is_active() {
                    stats.backoffice_active += 1;
                }
                stats
            })
    }

    /// Records matching every criterion of `filter`, in insertion order.
    #[inline]
    #[must_use]
    pub fn search(&self, filter: &TerminalFilter) -> Vec<&Terminal> {
        self.records
            .iter()
            .filter(|record| filter.matches(record))
            .collect()
    }

    /// Next free key for auto-assignment.
    fn next_shop_id(&self) -> Result<ShopId> {
        let max = self
            .records
            .iter()
            .map(|record| record.shop_id().get())
            .max()
            .unwrap_or(0);
        max.checked_add(1).map(ShopId::new).ok_or_else(|| {
            ValidationError::ShopIdOutOfRange(i64::from(max).saturating_add(1)).into()
        })
    }
}

/// Search criteria for [`TerminalStore::search`].
///
/// Unset criteria match everything.
///
/// ```rust
/// use tpe_registry::{TerminalFamily, TerminalFilter};
///
/// let filter = TerminalFilter::new()
///     .text("piscine")
///     .family(TerminalFamily::Move)
///     .cellular(true);
/// assert_ne!(filter, TerminalFilter::new());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalFilter {
    /// Substring of the decimal shop ID.
    shop_id: Option<String>,
    /// Case-insensitive text.
    text: Option<String>,
    /// Product line.
    family: Option<TerminalFamily>,
    /// Required ethernet flag.
    wired: Option<bool>,
    /// Required cellular flag.
    cellular: Option<bool>,
}

impl TerminalFilter {
    /// Creates a filter matching every record.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches records whose shop ID contains `digits`.
    #[inline]
    #[must_use]
    pub fn shop_id_contains<T: Into<String>>(mut self, digits: T) -> Self {
        self.shop_id = Some(digits.into());
        self
    }

    /// Matches records whose service, operators or card numbers contain
    /// `query`, ignoring case.
    #[inline]
    #[must_use]
    pub fn text<T: AsRef<str>>(mut self, query: T) -> Self {
        self.text = Some(query.as_ref().to_lowercase());
        self
    }

    /// Matches records of the given product line.
    #[inline]
    #[must_use]
    pub const fn family(mut self, family: TerminalFamily) -> Self {
        self.family = Some(family);
        self
    }

    /// Matches records with (or without) an ethernet link.
    #[inline]
    #[must_use]
    pub const fn wired(mut self, wired: bool) -> Self {
        self.wired = Some(wired);
        self
    }

    /// Matches records with (or without) a cellular link.
    #[inline]
    #[must_use]
    pub const fn cellular(mut self, cellular: bool) -> Self {
        self.cellular = Some(cellular);
        self
    }

    /// Returns `true` if `record` satisfies every set criterion.
    #[inline]
    #[must_use]
    pub fn matches(&self, record: &Terminal) -> bool {
        self.matches_shop_id(record)
            && self.matches_family(record)
            && self.matches_links(record)
            && self.matches_text(record)
    }

    /// Checks the shop ID substring.
    fn matches_shop_id(&self, record: &Terminal) -> bool {
        self.shop_id
            .as_deref()
            .is_none_or(|digits| record.shop_id().to_string().contains(digits))
    }

    /// Checks the product line.
    fn matches_family(&self, record: &Terminal) -> bool {
        self.family.is_none_or(|family| record.family() == family)
    }

    /// Checks the connectivity flags.
    fn matches_links(&self, record: &Terminal) -> bool {
        let links = record.connectivity();
        self.wired.is_none_or(|wired| links.is_wired() == wired)
            && self
                .cellular
                .is_none_or(|cellular| links.is_cellular() == cellular)
    }

    /// Case-insensitive match over the searchable text fields.
    fn matches_text(&self, record: &Terminal) -> bool {
        let Some(query) = self.text.as_deref() else {
            return true;
        };
        let operator = record.operator();
        [
            record.service(),
            operator.first_name.as_str(),
            operator.last_name.as_str(),
            record.alternate_operators(),
        ]
        .into_iter()
        .chain(record.cards().iter().map(MerchantCard::number))
        .any(|field| field.to_lowercase().contains(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackofficeAccess, ConnectivityType, Contact, NetworkConfig, timestamp};

    fn record(shop_id: u32) -> Terminal {
        Terminal::builder()
            .service("Piscine")
            .operator(Contact::new("Marie", "Durand", ""))
            .card(MerchantCard::new("1234567", None).unwrap())
            .shop_id(ShopId::new(shop_id))
            .model("Ingenico Move 5000")
            .connectivity(ConnectivityType::cellular())
            .build()
            .unwrap()
    }

    fn wired_record(shop_id: u32, devices: u32) -> Terminal {
        let network = NetworkConfig::new("192.168.1.10", "255.255.255.0", "192.168.1.1").unwrap();
        record(shop_id)
            .to_builder()
            .service("Musée")
            .model("Ingenico Desk 5000")
            .connectivity(ConnectivityType::ethernet(network))
            .device_count(devices)
            .backoffice(BackofficeAccess::new(true, Some("musee@ville.fr".to_owned())).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn auto_key_on_empty_store_is_one() {
        let mut store = TerminalStore::new();
        assert_eq!(store.add(record(0)).unwrap(), ShopId::new(1));
        assert_eq!(store.list()[0].shop_id(), ShopId::new(1));
    }

    #[test]
    fn auto_key_is_max_plus_one() {
        let mut store = TerminalStore::new();
        let _first = store.add(record(4)).unwrap();
        let _second = store.add(record(17)).unwrap();
        let _third = store.add(record(9)).unwrap();
        assert_eq!(store.add(record(0)).unwrap(), ShopId::new(18));
    }

    #[test]
    fn duplicate_key_rejected_and_store_unchanged() {
        let mut store = TerminalStore::new();
        let _key = store.add(record(5)).unwrap();
        let before = store.clone();
        let err = store.add(record(5)).unwrap_err();
        assert!(matches!(err, TpeError::DuplicateShopId(key) if key == ShopId::new(5)));
        assert_eq!(store, before);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn keys_stay_unique_after_many_auto_adds() {
        let mut store = TerminalStore::new();
        for _ in 0..10 {
            let _key = store.add(record(0)).unwrap();
        }
        let mut keys: Vec<_> = store.list().iter().map(Terminal::shop_id).collect();
        keys.dedup();
        assert_eq!(keys.len(), 10);
    }

    #[test]
    fn from_records_numbers_auto_keys_after_explicit_ones() {
        let store =
            TerminalStore::from_records([record(0), record(1), record(0), record(5)]).unwrap();
        let keys: Vec<u32> = store.list().iter().map(|r| r.shop_id().get()).collect();
        assert_eq!(keys, [6, 1, 7, 5]);
    }

    #[test]
    fn from_records_rejects_duplicate_explicit_keys() {
        let err = TerminalStore::from_records([record(0), record(3), record(3)]).unwrap_err();
        assert!(matches!(err, TpeError::DuplicateShopId(key) if key == ShopId::new(3)));
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut store = TerminalStore::new();
        let _key = store.add(record(1)).unwrap();
        assert!(store.remove(ShopId::new(42)));
        assert_eq!(store.len(), 1);
        assert!(store.remove(ShopId::new(1)));
        assert!(store.is_empty());
    }

    #[test]
    fn take_reports_whether_a_record_existed() {
        let mut store = TerminalStore::new();
        let _first = store.add(record(1)).unwrap();
        let _second = store.add(record(2)).unwrap();
        assert!(store.take(ShopId::new(42)).is_none());
        let taken = store.take(ShopId::new(1)).unwrap();
        assert_eq!(taken.shop_id(), ShopId::new(1));
        assert_eq!(store.len(), 1);
        assert!(store.find(ShopId::new(2)).is_some());
    }

    #[test]
    fn replace_keeps_key_and_creation_time() {
        let mut store = TerminalStore::new();
        let created = timestamp::parse("2024-05-06 07:08:09").unwrap();
        let original = record(3).to_builder().created_at(created).build().unwrap();
        let _key = store.add(original).unwrap();

        let edited = record(0).to_builder().service("Stade").build().unwrap();
        assert!(store.replace(ShopId::new(3), edited));

        let stored = store.find(ShopId::new(3)).unwrap();
        assert_eq!(stored.service(), "Stade");
        assert_eq!(stored.shop_id(), ShopId::new(3));
        assert_eq!(stored.created_at(), Some(created));
    }

    #[test]
    fn replace_absent_returns_false() {
        let mut store = TerminalStore::new();
        assert!(!store.replace(ShopId::new(1), record(1)));
        assert!(store.is_empty());
    }

    #[test]
    fn list_preserves_insertion_order() {
        let store = TerminalStore::from_records([record(9), record(2), record(5)]).unwrap();
        let keys: Vec<_> = store.list().iter().map(|r| r.shop_id().get()).collect();
        assert_eq!(keys, [9, 2, 5]);
    }

    #[test]
    fn statistics_sum_devices() {
        let store = TerminalStore::from_records([
            record(1),
            wired_record(2, 3),
            record(3).to_builder().device_count(2).build().unwrap(),
        ])
        .unwrap();
        let stats = store.statistics();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.total_devices, 6);
        assert_eq!(stats.wired, 1);
        assert_eq!(stats.cellular, 2);
        assert_eq!(stats.backoffice_active, 1);
    }

    #[test]
    fn empty_statistics() {
        assert_eq!(TerminalStore::new().statistics(), TerminalStats::default());
    }

    #[test]
    fn clear_empties_store() {
        let mut store = TerminalStore::from_records([record(1), record(2)]).unwrap();
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn search_by_text_is_case_insensitive() {
        let store = TerminalStore::from_records([record(1), wired_record(2, 1)]).unwrap();
        let hits = store.search(&TerminalFilter::new().text("MUSÉE"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].shop_id(), ShopId::new(2));

        let by_operator = store.search(&TerminalFilter::new().text("durand"));
        assert_eq!(by_operator.len(), 2);

        let by_card = store.search(&TerminalFilter::new().text("34567"));
        assert_eq!(by_card.len(), 2);
    }

    #[test]
    fn search_by_shop_id_and_flags() {
        let store =
            TerminalStore::from_records([record(12), record(21), wired_record(30, 1)]).unwrap();
        assert_eq!(
            store
                .search(&TerminalFilter::new().shop_id_contains("2"))
                .len(),
            2
        );
        assert_eq!(store.search(&TerminalFilter::new().wired(true)).len(), 1);
        assert_eq!(
            store
                .search(&TerminalFilter::new().family(TerminalFamily::Move))
                .len(),
            2
        );
        assert_eq!(
            store
                .search(&TerminalFilter::new().cellular(true).wired(true))
                .len(),
            0
        );
        assert_eq!(store.search(&TerminalFilter::new()).len(), 3);
    }
}
