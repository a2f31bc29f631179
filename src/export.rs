//! Spreadsheet export of terminal records.

use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet};

use crate::error::Result;
use crate::models::{NetworkConfig, Terminal, timestamp};

/// Worksheet name.
const SHEET_NAME: &str = "Gestion TPE";

/// Header fill colour.
const HEADER_FILL: u32 = 0x0066CC;

/// Maximum column width, in characters.
const MAX_COLUMN_WIDTH: usize = 50;

/// Column headers, in row order.
pub const HEADERS: [&str; 18] = [
    "Service",
    "Régisseur Prénom",
    "Régisseur Nom",
    "Régisseur Téléphone",
    "Régisseurs Suppléants",
    "Cartes Commerçant",
    "Numéros Série TPE",
    "ShopID",
    "Nombre de TPE",
    "Accès Backoffice",
    "Email Backoffice",
    "Modèle TPE",
    "Type Ethernet",
    "Type 4/5G",
    "Adresse IP",
    "Masque",
    "Passerelle",
    "Date Création",
];

/// One exported cell.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    /// Text cell.
    Text(String),
    /// Numeric cell.
    Number(f64),
}

impl Cell {
    /// Displayed width in characters.
    fn width(&self) -> usize {
        match self {
            Self::Text(text) => text.chars().count(),
            Self::Number(number) => number.to_string().chars().count(),
        }
    }

    /// Writes the cell to the worksheet.
    fn write(&self, sheet: &mut Worksheet, row: u32, col: u16) -> Result<()> {
        let _sheet = match self {
            Self::Text(text) => sheet.write_string(row, col, text)?,
            Self::Number(number) => sheet.write_number(row, col, *number)?,
        };
        Ok(())
    }
}

/// Renders a boolean as "Oui"/"Non".
fn yes_no(flag: bool) -> Cell {
    Cell::Text(if flag { "Oui" } else { "Non" }.to_owned())
}

/// Cells of one record, in [`HEADERS`] order.
fn record_row(record: &Terminal) -> [Cell; 18] {
    let operator = record.operator();
    let cards = record.cards();
    let network = record.connectivity().network();
    let address = |get: fn(&NetworkConfig) -> &str| {
        Cell::Text(network.map(get).unwrap_or_default().to_owned())
    };
    [
        Cell::Text(record.service().to_owned()),
        Cell::Text(operator.first_name.clone()),
        Cell::Text(operator.last_name.clone()),
        Cell::Text(operator.phone.clone()),
        Cell::Text(record.alternate_operators().to_owned()),
        Cell::Text(
            cards
                .iter()
                .map(|card| card.number())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Cell::Text(
            cards
                .iter()
                .map(|card| card.device_serial().unwrap_or("N/A"))
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Cell::Number(f64::from(record.shop_id().get())),
        Cell::Number(f64::from(record.device_count())),
        yes_no(record.backoffice().is_active()),
        Cell::Text(record.backoffice().email().unwrap_or_default().to_owned()),
        Cell::Text(record.model().to_owned()),
        yes_no(record.connectivity().is_wired()),
        yes_no(record.connectivity().is_cellular()),
        address(NetworkConfig::ip_address),
        address(NetworkConfig::subnet_mask),
        address(NetworkConfig::gateway),
        Cell::Text(
            record
                .created_at()
                .map(|created| created.format(timestamp::FORMAT).to_string())
                .unwrap_or_default(),
        ),
    ]
}

/// Writes `records` to an `.xlsx` workbook at `path`.
///
/// One sheet, a styled header row, then one row per record. Column widths
/// fit the longest cell, capped at 50 characters.
///
/// # Errors
///
/// Returns [`crate::TpeError::Export`] if the workbook cannot be built or
/// saved.
#[tracing::instrument(skip_all, fields(path = %path.display(), records = records.len()))]
#[inline]
pub fn write_xlsx(records: &[Terminal], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let _sheet = sheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_font_size(12)
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);

    let mut widths = HEADERS.map(|header| header.chars().count());
    for (col, header) in (0_u16..).zip(HEADERS) {
        let _sheet = sheet.write_string_with_format(0, col, header, &header_format)?;
    }

    for (row, record) in (1_u32..).zip(records) {
        for ((col, cell), width) in (0_u16..).zip(record_row(record)).zip(widths.iter_mut()) {
            cell.write(sheet, row, col)?;
            *width = (*width).max(cell.width());
        }
    }

    for (col, width) in (0_u16..).zip(widths) {
        let capped = u32::try_from((width + 2).min(MAX_COLUMN_WIDTH)).unwrap_or(50);
        let _sheet = sheet.set_column_width(col, capped)?;
    }

    workbook.save(path)?;
    tracing::debug!("export written");
    Ok(())
}
