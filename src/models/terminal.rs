//! Terminal record, the aggregate root.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::{BackofficeAccess, ConnectivityType, Contact, MerchantCard, ShopId, timestamp};
use crate::error::ValidationError;

/// Maximum number of merchant cards per terminal record.
pub const MAX_CARDS: usize = 8;

/// Terminal models offered by the entry form.
pub const KNOWN_MODELS: [&str; 2] = ["Ingenico Desk 5000", "Ingenico Move 5000"];

/// Product line of a terminal, derived from its model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalFamily {
    /// Portable "Move" terminals.
    Move,
    /// Countertop "Desk" terminals.
    Desk,
    /// Any other model.
    Other,
}

impl TerminalFamily {
    /// Classifies a model name.
    #[inline]
    #[must_use]
    pub fn of_model(model: &str) -> Self {
        if model.contains("Move") {
            Self::Move
        } else if model.contains("Desk") {
            Self::Desk
        } else {
            Self::Other
        }
    }
}

/// One payment-terminal deployment entry.
///
/// Built through [`Terminal::builder`]; every invariant is checked in
/// [`TerminalBuilder::build`], so a `Terminal` value is always valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Terminal {
    /// Department or service using the terminal.
    service: String,
    /// Primary operator.
    #[serde(rename = "regisseur")]
    operator: Contact,
    /// Alternate operators (free text).
    #[serde(rename = "regisseurs_suppleants")]
    alternate_operators: String,
    /// Merchant cards, first one mandatory.
    #[serde(rename = "cartes_commercant")]
    cards: Vec<MerchantCard>,
    /// Record key.
    shop_id: ShopId,
    /// Backoffice access.
    #[serde(rename = "acces_backoffice")]
    backoffice: BackofficeAccess,
    /// Terminal model name.
    #[serde(rename = "modele_tpe")]
    model: String,
    /// Network links.
    #[serde(rename = "type_tpe")]
    connectivity: ConnectivityType,
    /// Number of physical devices covered by this record.
    #[serde(rename = "nombre_tpe")]
    device_count: u32,
    /// Creation time; unset only for records restored without one.
    #[serde(rename = "date_creation", with = "timestamp::local_option")]
    created_at: Option<NaiveDateTime>,
}

impl Terminal {
    /// Starts building a terminal record.
    #[inline]
    #[must_use]
    pub fn builder() -> TerminalBuilder {
        TerminalBuilder::default()
    }

    /// Returns a builder pre-filled with this record's fields, for edits.
    ///
    /// The creation timestamp is carried over.
    #[inline]
    #[must_use]
    pub fn to_builder(&self) -> TerminalBuilder {
        TerminalBuilder {
            service: self.service.clone(),
            operator: Some(self.operator.clone()),
            alternate_operators: self.alternate_operators.clone(),
            cards: self.cards.clone(),
            shop_id: self.shop_id,
            backoffice: self.backoffice.clone(),
            model: self.model.clone(),
            connectivity: Some(self.connectivity.clone()),
            device_count: self.device_count,
            created_at: CreationStamp::Given(self.created_at),
        }
    }

    /// Department or service using the terminal.
    #[inline]
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Primary operator.
    #[inline]
    #[must_use]
    pub const fn operator(&self) -> &Contact {
        &self.operator
    }

    /// Alternate operators.
    #[inline]
    #[must_use]
    pub fn alternate_operators(&self) -> &str {
        &self.alternate_operators
    }

    /// Merchant cards (at least one).
    #[inline]
    #[must_use]
    pub fn cards(&self) -> &[MerchantCard] {
        &self.cards
    }

    /// Record key.
    #[inline]
    #[must_use]
    pub const fn shop_id(&self) -> ShopId {
        self.shop_id
    }

    /// Backoffice access.
    #[inline]
    #[must_use]
    pub const fn backoffice(&self) -> &BackofficeAccess {
        &self.backoffice
    }

    /// Terminal model name.
    #[inline]
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Product line derived from the model name.
    #[inline]
    #[must_use]
    pub fn family(&self) -> TerminalFamily {
        TerminalFamily::of_model(&self.model)
    }

    /// Network links.
    #[inline]
    #[must_use]
    pub const fn connectivity(&self) -> &ConnectivityType {
        &self.connectivity
    }

    /// Number of physical devices.
    #[inline]
    #[must_use]
    pub const fn device_count(&self) -> u32 {
        self.device_count
    }

    /// Creation time.
    #[inline]
    #[must_use]
    pub const fn created_at(&self) -> Option<NaiveDateTime> {
        self.created_at
    }

    /// Assigns the key chosen by the store.
    pub(crate) const fn assign_shop_id(&mut self, shop_id: ShopId) {
        self.shop_id = shop_id;
    }

    /// Carries the creation time of the record being replaced.
    pub(crate) const fn inherit_created_at(&mut self, created_at: Option<NaiveDateTime>) {
        self.created_at = created_at;
    }
}

/// Where a new record's creation time comes from.
#[derive(Debug, Clone, Copy)]
enum CreationStamp {
    /// Stamp with the current time at build.
    Now,
    /// Keep the supplied value, including "unset".
    Given(Option<NaiveDateTime>),
}

/// Builder for [`Terminal`].
#[derive(Debug, Clone)]
pub struct TerminalBuilder {
    /// Service name.
    service: String,
    /// Primary operator.
    operator: Option<Contact>,
    /// Alternate operators.
    alternate_operators: String,
    /// Merchant cards.
    cards: Vec<MerchantCard>,
    /// Record key, [`ShopId::AUTO`] by default.
    shop_id: ShopId,
    /// Backoffice access, inactive by default.
    backoffice: BackofficeAccess,
    /// Model name.
    model: String,
    /// Network links.
    connectivity: Option<ConnectivityType>,
    /// Device count, 1 by default.
    device_count: u32,
    /// Creation time source.
    created_at: CreationStamp,
}

impl Default for TerminalBuilder {
    #[inline]
    fn default() -> Self {
        Self {
            service: String::new(),
            operator: None,
            alternate_operators: String::new(),
            cards: Vec::new(),
            shop_id: ShopId::AUTO,
            backoffice: BackofficeAccess::inactive(),
            model: String::new(),
            connectivity: None,
            device_count: 1,
            created_at: CreationStamp::Now,
        }
    }
}

impl TerminalBuilder {
    /// Sets the service name.
    #[inline]
    #[must_use]
    pub fn service<T: Into<String>>(mut self, service: T) -> Self {
        self.service = service.into();
        self
    }

    /// Sets the primary operator.
    #[inline]
    #[must_use]
    pub fn operator(mut self, operator: Contact) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Sets the alternate operators.
    #[inline]
    #[must_use]
    pub fn alternate_operators<T: Into<String>>(mut self, names: T) -> Self {
        self.alternate_operators = names.into();
        self
    }

    /// Replaces the merchant card list.
    #[inline]
    #[must_use]
    pub fn cards(mut self, cards: Vec<MerchantCard>) -> Self {
        self.cards = cards;
        self
    }

    /// Appends one merchant card.
    #[inline]
    #[must_use]
    pub fn card(mut self, card: MerchantCard) -> Self {
        self.cards.push(card);
        self
    }

    /// Sets the record key; [`ShopId::AUTO`] lets the store choose.
    #[inline]
    #[must_use]
    pub const fn shop_id(mut self, shop_id: ShopId) -> Self {
        self.shop_id = shop_id;
        self
    }

    /// Sets the backoffice access.
    #[inline]
    #[must_use]
    pub fn backoffice(mut self, backoffice: BackofficeAccess) -> Self {
        self.backoffice = backoffice;
        self
    }

    /// Sets the model name.
    #[inline]
    #[must_use]
    pub fn model<T: Into<String>>(mut self, model: T) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the network links.
    #[inline]
    #[must_use]
    pub fn connectivity(mut self, connectivity: ConnectivityType) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Sets the device count.
    #[inline]
    #[must_use]
    pub const fn device_count(mut self, count: u32) -> Self {
        self.device_count = count;
        self
    }

    /// Uses an explicit creation time instead of the current time.
    #[inline]
    #[must_use]
    pub const fn created_at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = CreationStamp::Given(Some(created_at));
        self
    }

    /// Keeps a persisted creation time as is, including a missing one.
    #[must_use]
    pub(crate) const fn restored_created_at(mut self, created_at: Option<NaiveDateTime>) -> Self {
        self.created_at = CreationStamp::Given(created_at);
        self
    }

    /// Validates the parts and builds the record.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when a required part is missing, the
    /// operator is unnamed, the card count is outside `1..=8`, or the device
    /// count is zero.
    #[inline]
    pub fn build(self) -> Result<Terminal, ValidationError> {
        let operator = self
            .operator
            .ok_or(ValidationError::MissingField("operator"))?;
        let connectivity = self
            .connectivity
            .ok_or(ValidationError::MissingField("connectivity"))?;
        if operator.first_name.trim().is_empty() {
            return Err(ValidationError::EmptyField("operator first name"));
        }
        if operator.last_name.trim().is_empty() {
            return Err(ValidationError::EmptyField("operator last name"));
        }
        if self.cards.is_empty() {
            return Err(ValidationError::NoCards);
        }
        if self.cards.len() > MAX_CARDS {
            return Err(ValidationError::TooManyCards {
                count: self.cards.len(),
                max: MAX_CARDS,
            });
        }
        if self.device_count < 1 {
            return Err(ValidationError::InvalidDeviceCount(i64::from(
                self.device_count,
            )));
        }
        let created_at = match self.created_at {
            CreationStamp::Now => Some(timestamp::now()),
            CreationStamp::Given(stamp) => stamp,
        };
        Ok(Terminal {
            service: self.service,
            operator,
            alternate_operators: self.alternate_operators,
            cards: self.cards,
            shop_id: self.shop_id,
            backoffice: self.backoffice,
            model: self.model,
            connectivity,
            device_count: self.device_count,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NetworkConfig;

    fn card(number: &str) -> MerchantCard {
        MerchantCard::new(number, None).unwrap()
    }

    fn base() -> TerminalBuilder {
        Terminal::builder()
            .service("Piscine municipale")
            .operator(Contact::new("Marie", "Durand", "0601020304"))
            .card(card("1234567"))
            .model(KNOWN_MODELS[1])
            .connectivity(ConnectivityType::cellular())
    }

    #[test]
    fn builds_with_defaults() {
        let terminal = base().build().unwrap();
        assert_eq!(terminal.service(), "Piscine municipale");
        assert_eq!(terminal.shop_id(), ShopId::AUTO);
        assert_eq!(terminal.device_count(), 1);
        assert!(!terminal.backoffice().is_active());
        assert!(terminal.created_at().is_some());
        assert_eq!(terminal.family(), TerminalFamily::Move);
    }

    #[test]
    fn explicit_created_at_is_kept() {
        let ts = timestamp::parse("2025-01-02 03:04:05").unwrap();
        let terminal = base().created_at(ts).build().unwrap();
        assert_eq!(terminal.created_at(), Some(ts));
    }

    #[test]
    fn restored_without_timestamp_stays_unset() {
        let terminal = base().restored_created_at(None).build().unwrap();
        assert!(terminal.created_at().is_none());
    }

    #[test]
    fn zero_cards_rejected() {
        let err = base().cards(Vec::new()).build().unwrap_err();
        assert_eq!(err, ValidationError::NoCards);
    }

    #[test]
    fn eight_cards_accepted_nine_rejected() {
        let eight: Vec<_> = (1..=8).map(|n| card(&n.to_string())).collect();
        assert!(base().cards(eight.clone()).build().is_ok());

        let err = base().cards(eight).card(card("9")).build().unwrap_err();
        assert_eq!(err, ValidationError::TooManyCards { count: 9, max: 8 });
    }

    #[test]
    fn zero_devices_rejected() {
        let err = base().device_count(0).build().unwrap_err();
        assert_eq!(err, ValidationError::InvalidDeviceCount(0));
    }

    #[test]
    fn missing_parts_rejected() {
        let no_operator = Terminal::builder()
            .card(card("1"))
            .connectivity(ConnectivityType::cellular())
            .build();
        assert_eq!(no_operator, Err(ValidationError::MissingField("operator")));

        let no_link = Terminal::builder()
            .operator(Contact::new("A", "B", ""))
            .card(card("1"))
            .build();
        assert_eq!(no_link, Err(ValidationError::MissingField("connectivity")));
    }

    #[test]
    fn unnamed_operator_rejected() {
        let err = base()
            .operator(Contact::new(" ", "Durand", ""))
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyField("operator first name"));

        let err = base()
            .operator(Contact::new("Marie", "", ""))
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyField("operator last name"));
    }

    #[test]
    fn to_builder_round_trips() {
        let network = NetworkConfig::new("10.0.0.2", "255.0.0.0", "10.0.0.1").unwrap();
        let terminal = base()
            .connectivity(ConnectivityType::ethernet(network))
            .device_count(3)
            .build()
            .unwrap();
        let rebuilt = terminal.to_builder().build().unwrap();
        assert_eq!(rebuilt, terminal);
    }

    #[test]
    fn families() {
        assert_eq!(TerminalFamily::of_model("Ingenico Desk 5000"), TerminalFamily::Desk);
        assert_eq!(TerminalFamily::of_model("Ingenico Move 5000"), TerminalFamily::Move);
        assert_eq!(TerminalFamily::of_model("Verifone V200c"), TerminalFamily::Other);
    }

    #[test]
    fn serializes_with_wire_names() {
        let terminal = base().shop_id(ShopId::new(7)).build().unwrap();
        let json = serde_json::to_value(&terminal).unwrap();
        assert_eq!(json["shop_id"], 7);
        assert_eq!(json["nombre_tpe"], 1);
        assert_eq!(json["regisseur"]["prenom"], "Marie");
        assert_eq!(json["cartes_commercant"][0]["numero"], "1234567");
        assert!(json["date_creation"].is_string());
    }
}
