//! Terminal connectivity.

use serde::Serialize;

use super::NetworkConfig;
use crate::error::ValidationError;

/// How a terminal reaches the acquirer: ethernet, cellular (4G/5G), or
/// both. Ethernet terminals always carry a [`NetworkConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityType {
    /// Wired ethernet link.
    #[serde(rename = "ethernet")]
    wired: bool,
    /// Cellular 4G/5G link.
    #[serde(rename = "quatre_cinq_g")]
    cellular: bool,
    /// Static network settings, present exactly when `wired` is set.
    #[serde(rename = "config_reseau")]
    network: Option<NetworkConfig>,
}

impl ConnectivityType {
    /// Creates a connectivity value.
    ///
    /// A network configuration passed for a terminal without ethernet is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoConnectivity`] if neither link is
    /// selected, or [`ValidationError::MissingNetworkConfig`] if ethernet is
    /// selected without a configuration.
    #[inline]
    pub fn new(
        wired: bool,
        cellular: bool,
        network: Option<NetworkConfig>,
    ) -> Result<Self, ValidationError> {
        if !wired && !cellular {
            return Err(ValidationError::NoConnectivity);
        }
        if wired && network.is_none() {
            return Err(ValidationError::MissingNetworkConfig);
        }
        Ok(Self {
            wired,
            cellular,
            network: network.filter(|_| wired),
        })
    }

    /// Cellular-only connectivity.
    #[inline]
    #[must_use]
    pub const fn cellular() -> Self {
        Self {
            wired: false,
            cellular: true,
            network: None,
        }
    }

    /// Ethernet-only connectivity with the given settings.
    #[inline]
    #[must_use]
    pub const fn ethernet(network: NetworkConfig) -> Self {
        Self {
            wired: true,
            cellular: false,
            network: Some(network),
        }
    }

    /// Returns `true` if the terminal has an ethernet link.
    #[inline]
    #[must_use]
    pub const fn is_wired(&self) -> bool {
        self.wired
    }

    /// Returns `true` if the terminal has a cellular link.
    #[inline]
    #[must_use]
    pub const fn is_cellular(&self) -> bool {
        self.cellular
    }

    /// Static network settings of a wired terminal.
    #[inline]
    #[must_use]
    pub const fn network(&self) -> Option<&NetworkConfig> {
        self.network.as_ref()
    }

    /// Human-readable link list, e.g. `"Ethernet + 4/5G"`.
    #[inline]
    #[must_use]
    pub fn label(&self) -> String {
        let mut links = Vec::with_capacity(2);
        if self.wired {
            links.push("Ethernet");
        }
        if self.cellular {
            links.push("4/5G");
        }
        links.join(" + ")
    }
}
