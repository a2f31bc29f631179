//! Data models for terminal records and user accounts.
//!
//! Value objects validate their own fields on construction; [`Terminal`]
//! checks the cross-field invariants. Wire names follow the historical
//! (French) keys so existing backup files stay readable.

mod backoffice;
mod card;
mod connectivity;
mod contact;
mod ids;
mod network;
mod pattern;
mod stats;
mod terminal;
pub(crate) mod timestamp;
mod user;

pub use backoffice::BackofficeAccess;
pub use card::{MAX_CARD_NUMBER_LEN, MAX_SERIAL_LEN, MerchantCard};
pub use chrono::NaiveDateTime;
pub use connectivity::ConnectivityType;
pub use contact::Contact;
pub use ids::{ShopId, Username};
pub use network::NetworkConfig;
pub use stats::{TerminalStats, UserStats};
pub use terminal::{KNOWN_MODELS, MAX_CARDS, Terminal, TerminalBuilder, TerminalFamily};
pub use user::{NewUser, Role, UserAccount};
