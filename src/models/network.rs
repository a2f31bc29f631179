//! Wired network configuration.

use serde::Serialize;

use super::pattern;
use crate::error::ValidationError;

/// Static IPv4 settings of an ethernet terminal.
///
/// Each address must be a dotted quad (`a.b.c.d`, one to three digits per
/// part) with every octet at most 255. The original text is kept as
/// entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkConfig {
    /// Terminal IP address.
    #[serde(rename = "adresse_ip")]
    ip_address: String,
    /// Subnet mask.
    #[serde(rename = "masque")]
    subnet_mask: String,
    /// Default gateway.
    #[serde(rename = "passerelle")]
    gateway: String,
}

impl NetworkConfig {
    /// Creates a validated network configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAddress`] naming the first address
    /// that is not a valid dotted quad.
    #[inline]
    pub fn new<I, M, G>(ip_address: I, subnet_mask: M, gateway: G) -> Result<Self, ValidationError>
    where
        I: Into<String>,
        M: Into<String>,
        G: Into<String>,
    {
        let config = Self {
            ip_address: ip_address.into(),
            subnet_mask: subnet_mask.into(),
            gateway: gateway.into(),
        };
        check_address("IP address", &config.ip_address)?;
        check_address("subnet mask", &config.subnet_mask)?;
        check_address("gateway", &config.gateway)?;
        Ok(config)
    }

    /// Terminal IP address.
    #[inline]
    #[must_use]
    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    /// Subnet mask.
    #[inline]
    #[must_use]
    pub fn subnet_mask(&self) -> &str {
        &self.subnet_mask
    }

    /// Default gateway.
    #[inline]
    #[must_use]
    pub fn gateway(&self) -> &str {
        &self.gateway
    }
}

/// Rejects anything but four dot-separated groups of one to three digits,
/// each at most 255.
fn check_address(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if is_dotted_quad(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidAddress {
            field,
            value: value.to_owned(),
        })
    }
}

/// Returns `true` for a syntactically valid dotted quad.
fn is_dotted_quad(value: &str) -> bool {
    pattern::is_match(&pattern::DOTTED_QUAD, value)
        && value.split('.').all(|octet| octet.parse::<u8>().is_ok())
}
