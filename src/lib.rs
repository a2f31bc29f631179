//! Record management for payment terminals (TPE).
//!
//! This crate keeps an inventory of payment-terminal deployments: who
//! operates each terminal, which merchant cards it accepts, how it is
//! connected and whether it has backoffice access.
//!
//! - [`models`]: validated value objects and the [`Terminal`] record.
//! - [`store`]: the in-memory [`TerminalStore`] keyed by [`ShopId`].
//! - [`storage`]: binary snapshot and JSON backup persistence, with
//!   upgrades of records written by earlier versions.
//! - [`registry`]: [`Registry`], the store bound to a storage backend.
//! - [`export`]: `.xlsx` export (feature `xlsx`).
//! - [`users`]: [`UserDirectory`], accounts and login session.
//!
//! ```rust
//! use tpe_registry::models::{Contact, ConnectivityType, MerchantCard};
//! use tpe_registry::storage::InMemoryStorage;
//! use tpe_registry::{Registry, Terminal};
//!
//! let mut registry = Registry::new(InMemoryStorage::new());
//! let record = Terminal::builder()
//!     .service("Piscine municipale")
//!     .operator(Contact::new("Marie", "Durand", "0601020304"))
//!     .card(MerchantCard::new("1234567", None)?)
//!     .model("Ingenico Move 5000")
//!     .connectivity(ConnectivityType::cellular())
//!     .build()?;
//! let key = registry.add(record)?;
//! assert_eq!(key.get(), 1);
//! registry.save()?;
//! # Ok::<(), tpe_registry::TpeError>(())
//! ```

pub mod error;
#[cfg(feature = "xlsx")]
pub mod export;
pub mod models;
pub mod registry;
pub mod storage;
pub mod store;
pub mod users;

pub use error::{Result, TpeError, ValidationError};
pub use models::{ShopId, Terminal, TerminalFamily};
pub use registry::{Registry, RegistryBuilder};
pub use store::{TerminalFilter, TerminalStore};
pub use users::UserDirectory;
