//! Merchant card model.

use serde::Serialize;

use crate::error::ValidationError;

/// Maximum card number length, in characters.
pub const MAX_CARD_NUMBER_LEN: usize = 50;

/// Maximum device serial number length, in characters.
pub const MAX_SERIAL_LEN: usize = 100;

/// A merchant card number, optionally paired with the serial number of the
/// terminal device it is loaded in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MerchantCard {
    /// Card number (alphanumeric).
    #[serde(rename = "numero")]
    number: String,
    /// Serial number of the terminal device.
    #[serde(rename = "numero_serie_tpe")]
    device_serial: Option<String>,
}

impl MerchantCard {
    /// Creates a validated merchant card. An empty serial is treated as
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyCardNumber`] for a blank number,
    /// [`ValidationError::CardNumberTooLong`] beyond
    /// [`MAX_CARD_NUMBER_LEN`] characters, or
    /// [`ValidationError::SerialTooLong`] beyond [`MAX_SERIAL_LEN`].
    #[inline]
    pub fn new<N: Into<String>>(
        number: N,
        device_serial: Option<String>,
    ) -> Result<Self, ValidationError> {
        let card = Self {
            number: number.into(),
            device_serial: device_serial.filter(|serial| !serial.is_empty()),
        };
        card.validate()?;
        Ok(card)
    }

    /// Card number.
    #[inline]
    #[must_use]
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Serial number of the terminal device, if recorded.
    #[inline]
    #[must_use]
    pub fn device_serial(&self) -> Option<&str> {
        self.device_serial.as_deref()
    }

    /// Checks the field-level invariants.
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.number.trim().is_empty() {
            return Err(ValidationError::EmptyCardNumber);
        }
        let len = self.number.chars().count();
        if len > MAX_CARD_NUMBER_LEN {
            return Err(ValidationError::CardNumberTooLong {
                len,
                max: MAX_CARD_NUMBER_LEN,
            });
        }
        if let Some(serial) = self.device_serial.as_deref() {
            let serial_len = serial.chars().count();
            if serial_len > MAX_SERIAL_LEN {
                return Err(ValidationError::SerialTooLong {
                    len: serial_len,
                    max: MAX_SERIAL_LEN,
                });
            }
        }
        Ok(())
    }
}
