//! Persisted document layouts and the read-side compatibility shim.
//!
//! Every persisted record goes through the `Stored*` types below on its
//! way in. They accept all layouts written by earlier versions of the tool
//! and hand the values to the regular validating constructors, so a
//! decoded record obeys exactly the same invariants as a freshly built one.
//!
//! Upgrades applied on read:
//!
//! - missing `nombre_tpe` → 1
//! - single legacy `carte_commercant` → one-card list
//! - bare string/integer cards → [`MerchantCard`] without serial
//! - missing `date_creation` → unset
//! - historical envelope keys (`tpes`, `version`, `date_backup`, ...)

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, TpeError, ValidationError};
use crate::models::{
    BackofficeAccess, ConnectivityType, Contact, MerchantCard, NaiveDateTime, NetworkConfig,
    ShopId, Terminal, UserAccount, Username, timestamp,
};

// ── Schema version ──────────────────────────────────────────────────────

/// `major.minor` version tag stored in every document.
///
/// Documents with a newer major version than [`SchemaVersion::CURRENT`]
/// are refused; older ones are upgraded on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion {
    /// Incompatible layout changes.
    major: u16,
    /// Backward-compatible additions.
    minor: u16,
}

impl SchemaVersion {
    /// Version written by this build.
    pub const CURRENT: Self = Self::new(2, 0);

    /// Version assumed for documents that carry no tag.
    pub const LEGACY: Self = Self::new(1, 0);

    /// Creates a version tag.
    #[inline]
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Returns `true` if this build can read documents tagged with `self`.
    #[inline]
    #[must_use]
    pub const fn is_readable(self) -> bool {
        self.major <= Self::CURRENT.major
    }

    /// Serde default for untagged documents.
    const fn legacy() -> Self {
        Self::LEGACY
    }
}

impl Default for SchemaVersion {
    #[inline]
    fn default() -> Self {
        Self::CURRENT
    }
}

impl core::fmt::Display for SchemaVersion {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl core::str::FromStr for SchemaVersion {
    type Err = TpeError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        let unsupported = || TpeError::UnsupportedSchema {
            found: s.to_owned(),
            supported: Self::CURRENT.to_string(),
        };
        let (major, minor) = s.trim().split_once('.').unwrap_or((s.trim(), "0"));
        let major = major.parse().map_err(|_malformed| unsupported())?;
        let minor = minor.parse().map_err(|_malformed| unsupported())?;
        Ok(Self::new(major, minor))
    }
}

impl Serialize for SchemaVersion {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SchemaVersion {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ── Envelopes ───────────────────────────────────────────────────────────

/// Binary snapshot of the whole record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Records in store order.
    #[serde(alias = "tpes")]
    pub records: Vec<Terminal>,
    /// When the snapshot was written.
    #[serde(
        alias = "date_sauvegarde",
        default,
        with = "timestamp::local_option"
    )]
    pub generated_at: Option<NaiveDateTime>,
    /// Layout version.
    #[serde(alias = "version", default = "SchemaVersion::legacy")]
    pub schema_version: SchemaVersion,
}

impl Snapshot {
    /// Wraps records in a snapshot stamped now with the current schema.
    #[inline]
    #[must_use]
    pub fn new(records: Vec<Terminal>) -> Self {
        Self {
            records,
            generated_at: Some(timestamp::now()),
            schema_version: SchemaVersion::CURRENT,
        }
    }
}

/// Human-readable backup of the whole record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    /// Records in store order.
    #[serde(alias = "tpes")]
    pub records: Vec<Terminal>,
    /// When the backup was written.
    #[serde(alias = "date_backup", default, with = "timestamp::local_option")]
    pub generated_at: Option<NaiveDateTime>,
    /// Layout version.
    #[serde(alias = "version", default = "SchemaVersion::legacy")]
    pub schema_version: SchemaVersion,
    /// Number of records, as declared by the writer.
    #[serde(alias = "nombre_tpes", default)]
    pub record_count: Option<usize>,
}

impl Backup {
    /// Wraps records in a backup stamped now with the current schema.
    #[inline]
    #[must_use]
    pub fn new(records: Vec<Terminal>) -> Self {
        let record_count = Some(records.len());
        Self {
            records,
            generated_at: Some(timestamp::now()),
            schema_version: SchemaVersion::CURRENT,
            record_count,
        }
    }
}

/// Persisted user directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsersDocument {
    /// Accounts keyed by login name.
    pub users: BTreeMap<Username, UserAccount>,
    /// When the directory was written.
    #[serde(
        alias = "date_sauvegarde",
        default,
        with = "timestamp::local_option"
    )]
    pub saved_at: Option<NaiveDateTime>,
}

/// Reads only the version tag of a document.
#[derive(Debug, Deserialize)]
struct VersionProbe {
    /// Layout version, legacy when absent.
    #[serde(alias = "version", default = "SchemaVersion::legacy")]
    schema_version: SchemaVersion,
}

/// Refuses documents from a newer major version.
fn ensure_readable(version: SchemaVersion) -> Result<()> {
    if !version.is_readable() {
        return Err(TpeError::UnsupportedSchema {
            found: version.to_string(),
            supported: SchemaVersion::CURRENT.to_string(),
        });
    }
    if version < SchemaVersion::CURRENT {
        tracing::debug!(from = %version, to = %SchemaVersion::CURRENT, "upgrading legacy records");
    }
    Ok(())
}

/// Wraps a CBOR codec error.
fn snapshot_error<E: core::fmt::Display>(err: E) -> TpeError {
    TpeError::Snapshot(err.to_string())
}

/// Encodes a snapshot as CBOR.
pub(crate) fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(snapshot, &mut bytes).map_err(snapshot_error)?;
    Ok(bytes)
}

/// Decodes a CBOR snapshot, checking its version before the records.
pub(crate) fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot> {
    let probe: VersionProbe = ciborium::from_reader(bytes).map_err(snapshot_error)?;
    ensure_readable(probe.schema_version)?;
    ciborium::from_reader(bytes).map_err(snapshot_error)
}

/// Encodes a backup as pretty-printed JSON.
pub(crate) fn encode_backup(backup: &Backup) -> Result<String> {
    serde_json::to_string_pretty(backup).map_err(TpeError::from)
}

/// Decodes a JSON backup, checking its version before the records.
pub(crate) fn decode_backup(text: &str) -> Result<Backup> {
    let probe: VersionProbe = serde_json::from_str(text)?;
    ensure_readable(probe.schema_version)?;
    let backup: Backup = serde_json::from_str(text)?;
    if let Some(declared) = backup.record_count
        && declared != backup.records.len()
    {
        tracing::warn!(
            declared,
            actual = backup.records.len(),
            "backup record count does not match its contents"
        );
    }
    Ok(backup)
}

/// Encodes the user directory as pretty-printed JSON.
pub(crate) fn encode_users(document: &UsersDocument) -> Result<String> {
    serde_json::to_string_pretty(document).map_err(TpeError::from)
}

/// Decodes the user directory.
pub(crate) fn decode_users(text: &str) -> Result<UsersDocument> {
    serde_json::from_str(text).map_err(TpeError::from)
}

// ── Record shim ─────────────────────────────────────────────────────────

/// A scalar that older layouts used where text is expected now.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    /// Text value.
    Text(String),
    /// Integer value, e.g. a card number typed as a number.
    Integer(i64),
}

impl Scalar {
    /// Returns the value as text.
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Integer(number) => number.to_string(),
        }
    }
}

/// Any historical encoding of a merchant card.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CardField {
    /// Current layout: `{numero, numero_serie_tpe}`.
    Structured(StoredCard),
    /// Bare card number.
    Bare(Scalar),
}

/// Structured card as persisted.
#[derive(Debug, Deserialize)]
struct StoredCard {
    /// Card number.
    #[serde(default)]
    numero: Option<Scalar>,
    /// Device serial number.
    #[serde(default)]
    numero_serie_tpe: Option<String>,
}

impl CardField {
    /// Normalizes to a validated card.
    fn into_card(self) -> core::result::Result<MerchantCard, ValidationError> {
        match self {
            Self::Structured(card) => MerchantCard::new(
                card.numero.map(Scalar::into_text).unwrap_or_default(),
                card.numero_serie_tpe,
            ),
            Self::Bare(number) => MerchantCard::new(number.into_text(), None),
        }
    }
}

/// Network configuration as persisted.
#[derive(Debug, Deserialize)]
struct StoredNetworkConfig {
    /// IP address.
    adresse_ip: String,
    /// Subnet mask.
    masque: String,
    /// Gateway.
    passerelle: String,
}

/// Backoffice access as persisted.
#[derive(Debug, Deserialize)]
struct StoredBackoffice {
    /// Access enabled.
    actif: bool,
    /// Login email.
    #[serde(default)]
    email: Option<String>,
}

/// Connectivity as persisted.
#[derive(Debug, Deserialize)]
struct StoredConnectivity {
    /// Ethernet link.
    #[serde(default)]
    ethernet: bool,
    /// Cellular link.
    #[serde(default)]
    quatre_cinq_g: bool,
    /// Network settings.
    #[serde(default)]
    config_reseau: Option<NetworkConfig>,
}

/// Terminal record as persisted, in any historical layout.
#[derive(Debug, Deserialize)]
struct StoredTerminal {
    /// Service name.
    service: String,
    /// Primary operator.
    regisseur: Contact,
    /// Alternate operators.
    regisseurs_suppleants: String,
    /// Card list (current layout).
    #[serde(default)]
    cartes_commercant: Option<Vec<CardField>>,
    /// Single card (legacy layout).
    #[serde(default)]
    carte_commercant: Option<CardField>,
    /// Record key.
    shop_id: i64,
    /// Backoffice access.
    acces_backoffice: BackofficeAccess,
    /// Model name.
    modele_tpe: String,
    /// Network links.
    type_tpe: ConnectivityType,
    /// Device count; absent before it was introduced.
    #[serde(default)]
    nombre_tpe: Option<i64>,
    /// Creation time; may be absent.
    #[serde(default, with = "timestamp::local_option")]
    date_creation: Option<NaiveDateTime>,
}

impl StoredTerminal {
    /// Applies the upgrades and runs the regular validation.
    fn into_terminal(self) -> core::result::Result<Terminal, ValidationError> {
        let raw_cards = match (self.cartes_commercant, self.carte_commercant) {
            (Some(list), _) => list,
            (None, Some(single)) => vec![single],
            (None, None) => Vec::new(),
        };
        let cards = raw_cards
            .into_iter()
            .map(CardField::into_card)
            .collect::<core::result::Result<Vec<_>, _>>()?;
        let device_count = match self.nombre_tpe {
            None => 1,
            Some(count) => u32::try_from(count)
                .ok()
                .filter(|devices| *devices >= 1)
                .ok_or(ValidationError::InvalidDeviceCount(count))?,
        };
        Terminal::builder()
            .service(self.service)
            .operator(self.regisseur)
            .alternate_operators(self.regisseurs_suppleants)
            .cards(cards)
            .shop_id(ShopId::try_from(self.shop_id)?)
            .backoffice(self.acces_backoffice)
            .model(self.modele_tpe)
            .connectivity(self.type_tpe)
            .device_count(device_count)
            .restored_created_at(self.date_creation)
            .build()
    }
}

impl<'de> Deserialize<'de> for Terminal {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        StoredTerminal::deserialize(deserializer)?
            .into_terminal()
            .map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for MerchantCard {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        CardField::deserialize(deserializer)?
            .into_card()
            .map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for NetworkConfig {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let stored = StoredNetworkConfig::deserialize(deserializer)?;
        Self::new(stored.adresse_ip, stored.masque, stored.passerelle)
            .map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for BackofficeAccess {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let stored = StoredBackoffice::deserialize(deserializer)?;
        Self::new(stored.actif, stored.email).map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for ConnectivityType {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let stored = StoredConnectivity::deserialize(deserializer)?;
        Self::new(stored.ethernet, stored.quatre_cinq_g, stored.config_reseau)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KNOWN_MODELS;

    fn sample(shop_id: u32) -> Terminal {
        let network = NetworkConfig::new("10.1.2.3", "255.255.0.0", "10.1.0.1").unwrap();
        Terminal::builder()
            .service("Médiathèque")
            .operator(Contact::new("Luc", "Bernard", "0102030405"))
            .alternate_operators("Paul Petit")
            .card(MerchantCard::new("998877", Some("SN-1".to_owned())).unwrap())
            .card(MerchantCard::new("112233", None).unwrap())
            .shop_id(ShopId::new(shop_id))
            .backoffice(BackofficeAccess::new(true, Some("regie@ville.fr".to_owned())).unwrap())
            .model(KNOWN_MODELS[0])
            .connectivity(ConnectivityType::new(true, true, Some(network)).unwrap())
            .device_count(2)
            .build()
            .unwrap()
    }

    /// A version 1.5 record as written by the historical tool.
    const LEGACY_RECORD: &str = r#"{
        "service": "Piscine",
        "regisseur": {"prenom": "Anne", "nom": "Roux", "telephone": "0600000000"},
        "regisseurs_suppleants": "",
        "carte_commercant": "123456",
        "shop_id": 12,
        "acces_backoffice": {"actif": false, "email": null},
        "modele_tpe": "Ingenico Move 5000",
        "type_tpe": {"ethernet": false, "quatre_cinq_g": true, "config_reseau": null}
    }"#;

    #[test]
    fn snapshot_roundtrip_preserves_records() {
        let snapshot = Snapshot::new(vec![sample(1), sample(2)]);
        let bytes = encode_snapshot(&snapshot).unwrap();
        let decoded = decode_snapshot(&bytes).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn backup_roundtrip_preserves_records() {
        let backup = Backup::new(vec![sample(5)]);
        let text = encode_backup(&backup).unwrap();
        assert!(text.contains("\"record_count\": 1"));
        assert!(text.contains("\"schema_version\": \"2.0\""));
        let decoded = decode_backup(&text).unwrap();
        assert_eq!(decoded, backup);
    }

    #[test]
    fn legacy_single_bare_card_is_wrapped() {
        let terminal: Terminal = serde_json::from_str(LEGACY_RECORD).unwrap();
        assert_eq!(terminal.cards().len(), 1);
        assert_eq!(terminal.cards()[0].number(), "123456");
        assert!(terminal.cards()[0].device_serial().is_none());
    }

    #[test]
    fn missing_device_count_defaults_to_one() {
        let terminal: Terminal = serde_json::from_str(LEGACY_RECORD).unwrap();
        assert_eq!(terminal.device_count(), 1);
    }

    #[test]
    fn missing_creation_time_stays_unset() {
        let terminal: Terminal = serde_json::from_str(LEGACY_RECORD).unwrap();
        assert!(terminal.created_at().is_none());
    }

    #[test]
    fn integer_and_string_cards_in_list_are_normalized() {
        let json = LEGACY_RECORD.replace(
            r#""carte_commercant": "123456""#,
            r#""cartes_commercant": [42, "A-7", {"numero": 99, "numero_serie_tpe": ""}]"#,
        );
        let terminal: Terminal = serde_json::from_str(&json).unwrap();
        let numbers: Vec<_> = terminal.cards().iter().map(MerchantCard::number).collect();
        assert_eq!(numbers, ["42", "A-7", "99"]);
        assert!(terminal.cards().iter().all(|card| card.device_serial().is_none()));
    }

    #[test]
    fn legacy_integer_single_card() {
        let json = LEGACY_RECORD.replace(r#""123456""#, "123");
        let terminal: Terminal = serde_json::from_str(&json).unwrap();
        assert_eq!(terminal.cards()[0].number(), "123");
    }

    #[test]
    fn invalid_persisted_record_is_rejected() {
        let json = LEGACY_RECORD.replace(r#""quatre_cinq_g": true"#, r#""quatre_cinq_g": false"#);
        let err = serde_json::from_str::<Terminal>(&json).unwrap_err();
        assert!(err.to_string().contains("connectivity"));
    }

    #[test]
    fn negative_shop_id_is_rejected() {
        let json = LEGACY_RECORD.replace(r#""shop_id": 12"#, r#""shop_id": -3"#);
        assert!(serde_json::from_str::<Terminal>(&json).is_err());
    }

    #[test]
    fn zero_device_count_is_rejected() {
        let json = LEGACY_RECORD.replace(r#""shop_id": 12"#, r#""shop_id": 12, "nombre_tpe": 0"#);
        assert!(serde_json::from_str::<Terminal>(&json).is_err());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let json = LEGACY_RECORD.replace(r#""service": "Piscine","#, "");
        assert!(serde_json::from_str::<Terminal>(&json).is_err());
    }

    #[test]
    fn historical_backup_envelope_is_read() {
        let text = format!(
            r#"{{"tpes": [{LEGACY_RECORD}], "date_backup": "2026-02-13 10:00:00", "version": "1.5", "nombre_tpes": 1}}"#
        );
        let backup = decode_backup(&text).unwrap();
        assert_eq!(backup.records.len(), 1);
        assert_eq!(backup.schema_version, SchemaVersion::new(1, 5));
        assert_eq!(backup.record_count, Some(1));
        assert!(backup.generated_at.is_some());
    }

    #[test]
    fn record_count_mismatch_still_loads() {
        let text = format!(r#"{{"records": [{LEGACY_RECORD}], "record_count": 4}}"#);
        let backup = decode_backup(&text).unwrap();
        assert_eq!(backup.records.len(), 1);
        assert_eq!(backup.schema_version, SchemaVersion::LEGACY);
    }

    #[test]
    fn newer_major_version_is_refused() {
        let text = r#"{"records": [], "schema_version": "3.1"}"#;
        let err = decode_backup(text).unwrap_err();
        assert!(matches!(err, TpeError::UnsupportedSchema { .. }));
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let err = decode_snapshot(b"\xff\x00garbage").unwrap_err();
        assert!(matches!(err, TpeError::Snapshot(_)));
    }

    #[test]
    fn schema_version_parsing() {
        assert_eq!("1.5".parse::<SchemaVersion>().unwrap(), SchemaVersion::new(1, 5));
        assert_eq!("2".parse::<SchemaVersion>().unwrap(), SchemaVersion::new(2, 0));
        assert!("x.y".parse::<SchemaVersion>().is_err());
        assert!(SchemaVersion::CURRENT.is_readable());
        assert!(!SchemaVersion::new(3, 0).is_readable());
    }
}
