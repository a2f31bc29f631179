//! Aggregate counters.

use serde::Serialize;

/// Counters over a set of terminal records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TerminalStats {
    /// Number of records.
    pub total: usize,
    /// Sum of device counts.
    pub total_devices: u64,
    /// Records with an ethernet link.
    pub wired: usize,
    /// Records with a cellular link.
    pub cellular: usize,
    /// Records with active backoffice access.
    pub backoffice_active: usize,
}

/// Counters over the user directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UserStats {
    /// Number of accounts.
    pub total: usize,
    /// Accounts allowed to log in.
    pub active: usize,
    /// Deactivated accounts.
    pub inactive: usize,
    /// Administrators.
    pub admins: usize,
    /// Regular users.
    pub users: usize,
}
