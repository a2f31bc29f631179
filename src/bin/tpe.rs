//! Command-line front end for the payment-terminal registry.

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use secrecy::SecretString;
use tpe_registry::models::{
    BackofficeAccess, ConnectivityType, Contact, KNOWN_MODELS, MerchantCard, NetworkConfig,
    NewUser, Role, Username,
};
use tpe_registry::storage::{FileStorage, Storage};
use tpe_registry::{Registry, ShopId, Terminal, TerminalFamily, TerminalFilter, UserDirectory};

/// Payment-terminal registry: browse, edit and export TPE records.
#[derive(Debug, Parser)]
#[command(name = "tpe", version, about)]
struct Cli {
    /// Override the data directory (default: XDG data dir).
    #[arg(long, global = true, value_name = "DIR", env = "TPE_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// Login name for commands that modify data.
    #[arg(long, global = true, env = "TPE_USER")]
    user: Option<String>,
    /// Password for `--user`.
    #[arg(long, global = true, env = "TPE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// List records, optionally filtered.
    List(ListArgs),
    /// Show one record in detail.
    Show {
        /// Shop ID of the record.
        shop_id: u32,
    },
    /// Add a record (login required).
    Add(RecordArgs),
    /// Replace a record, keeping its creation date (admin only).
    Edit {
        /// Shop ID of the record to replace.
        #[arg(value_name = "SHOP_ID")]
        key: u32,
        /// New record contents.
        #[command(flatten)]
        record: RecordArgs,
    },
    /// Delete a record (admin only).
    Remove {
        /// Shop ID of the record.
        shop_id: u32,
    },
    /// Show record statistics.
    Stats,
    /// Export all records to an `.xlsx` workbook.
    Export {
        /// Output file.
        #[arg(default_value = "tpe_export.xlsx")]
        path: PathBuf,
    },
    /// Replace all records with those of a snapshot or `.json` backup
    /// (login required).
    Restore {
        /// Snapshot or backup file.
        path: PathBuf,
    },
    /// Manage user accounts.
    Users {
        /// User subcommand.
        #[command(subcommand)]
        command: UsersCommand,
    },
}

/// User management subcommands.
#[derive(Debug, Subcommand)]
enum UsersCommand {
    /// List accounts (admin only).
    List,
    /// Create an account (admin only).
    Add(NewUserArgs),
    /// Re-enable an account (admin only).
    Enable {
        /// Account to enable.
        username: String,
    },
    /// Disable an account (admin only).
    Disable {
        /// Account to disable.
        username: String,
    },
    /// Change the password of `--user`.
    Passwd {
        /// New password.
        #[arg(long)]
        new_password: String,
    },
    /// Show account statistics (admin only).
    Stats,
}

/// Filters for the `list` subcommand.
#[derive(Debug, Default, Args)]
struct ListArgs {
    /// Shop ID contains these digits.
    #[arg(long)]
    shop_id: Option<String>,
    /// Service, operator or card number contains this text.
    #[arg(long)]
    search: Option<String>,
    /// Terminal product line.
    #[arg(long, value_enum)]
    family: Option<FamilyArg>,
    /// Has (true) or lacks (false) an ethernet link.
    #[arg(long)]
    wired: Option<bool>,
    /// Has (true) or lacks (false) a cellular link.
    #[arg(long)]
    cellular: Option<bool>,
}

/// Product line accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FamilyArg {
    /// Portable terminals.
    Move,
    /// Countertop terminals.
    Desk,
    /// Any other model.
    Other,
}

impl From<FamilyArg> for TerminalFamily {
    fn from(arg: FamilyArg) -> Self {
        match arg {
            FamilyArg::Move => Self::Move,
            FamilyArg::Desk => Self::Desk,
            FamilyArg::Other => Self::Other,
        }
    }
}

/// Record fields for `add` and `edit`.
#[derive(Debug, Clone, Args)]
struct RecordArgs {
    /// Service using the terminal.
    #[arg(long)]
    service: String,
    /// Operator first name.
    #[arg(long)]
    first_name: String,
    /// Operator last name.
    #[arg(long)]
    last_name: String,
    /// Operator phone.
    #[arg(long, default_value = "")]
    phone: String,
    /// Alternate operators.
    #[arg(long, default_value = "")]
    alternates: String,
    /// Merchant card as `NUMBER` or `NUMBER:SERIAL` (repeatable, 1 to 8).
    #[arg(long = "card", required = true, value_parser = parse_card)]
    cards: Vec<MerchantCard>,
    /// Shop ID; 0 assigns the next free one.
    #[arg(long, default_value_t = 0)]
    shop_id: u32,
    /// Terminal model.
    #[arg(long, default_value = KNOWN_MODELS[1])]
    model: String,
    /// Terminal has an ethernet link.
    #[arg(long)]
    ethernet: bool,
    /// Terminal has a cellular link.
    #[arg(long)]
    cellular: bool,
    /// IP address (ethernet only).
    #[arg(long, requires_all = ["mask", "gateway"])]
    ip: Option<String>,
    /// Subnet mask (ethernet only).
    #[arg(long)]
    mask: Option<String>,
    /// Gateway (ethernet only).
    #[arg(long)]
    gateway: Option<String>,
    /// Backoffice login email; enables backoffice access.
    #[arg(long)]
    backoffice_email: Option<String>,
    /// Number of physical devices.
    #[arg(long, default_value_t = 1)]
    devices: u32,
}

/// Fields for `users add`.
#[derive(Debug, Clone, Args)]
struct NewUserArgs {
    /// Login name.
    #[arg(long)]
    username: String,
    /// Role: admin or user.
    #[arg(long, default_value = "user")]
    role: Role,
    /// Family name.
    #[arg(long, default_value = "")]
    last_name: String,
    /// Given name.
    #[arg(long, default_value = "")]
    first_name: String,
    /// Contact email.
    #[arg(long, default_value = "")]
    email: String,
    /// Initial password.
    #[arg(long)]
    new_password: String,
}

/// Login supplied on the command line.
#[derive(Debug, Default)]
struct Credentials {
    /// Login name.
    user: Option<String>,
    /// Password.
    password: Option<SecretString>,
}

/// Parses `NUMBER` or `NUMBER:SERIAL` into a card for clap.
fn parse_card(s: &str) -> Result<MerchantCard, String> {
    let (number, serial) = match s.split_once(':') {
        Some((number, serial)) => (number, Some(serial.to_owned())),
        None => (s, None),
    };
    MerchantCard::new(number, serial).map_err(|err| err.to_string())
}

/// Builds a record from CLI arguments.
fn build_record(args: &RecordArgs) -> tpe_registry::Result<Terminal> {
    let network = match (&args.ip, &args.mask, &args.gateway) {
        (Some(ip), Some(mask), Some(gateway)) => Some(NetworkConfig::new(
            ip.as_str(),
            mask.as_str(),
            gateway.as_str(),
        )?),
        _ => None,
    };
    let record = Terminal::builder()
        .service(args.service.as_str())
        .operator(Contact::new(
            args.first_name.as_str(),
            args.last_name.as_str(),
            args.phone.as_str(),
        ))
        .alternate_operators(args.alternates.as_str())
        .cards(args.cards.clone())
        .shop_id(ShopId::new(args.shop_id))
        .backoffice(BackofficeAccess::new(
            args.backoffice_email.is_some(),
            args.backoffice_email.clone(),
        )?)
        .model(args.model.as_str())
        .connectivity(ConnectivityType::new(args.ethernet, args.cellular, network)?)
        .device_count(args.devices)
        .build()?;
    Ok(record)
}

/// Builds a search filter from CLI arguments.
fn build_filter(args: &ListArgs) -> TerminalFilter {
    let mut filter = TerminalFilter::new();
    if let Some(digits) = &args.shop_id {
        filter = filter.shop_id_contains(digits.as_str());
    }
    if let Some(query) = &args.search {
        filter = filter.text(query);
    }
    if let Some(family) = args.family {
        filter = filter.family(family.into());
    }
    if let Some(wired) = args.wired {
        filter = filter.wired(wired);
    }
    if let Some(cellular) = args.cellular {
        filter = filter.cellular(cellular);
    }
    filter
}

/// Prints an error line and returns a failure exit code.
fn fail<E: core::fmt::Display>(context: &str, err: E) -> io::Result<ExitCode> {
    writeln!(
        io::stderr().lock(),
        "{} {context}: {err}",
        "error:".red().bold()
    )?;
    Ok(ExitCode::FAILURE)
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    let credentials = Credentials {
        user: cli.user,
        password: cli.password.map(SecretString::from),
    };

    let storage = match create_storage(cli.data_dir) {
        Ok(storage) => storage,
        Err(err) => return fail("failed to initialize storage", err),
    };

    let mut registry = match open_registry(storage.clone(), &cli.command) {
        Ok(registry) => registry,
        Err(err) => return fail("failed to load records", err),
    };

    let mut users = match UserDirectory::open(storage) {
        Ok(users) => users,
        Err(err) => return fail("failed to load users", err),
    };

    dispatch(&mut registry, &mut users, &credentials, cli.command)
}

/// Creates the storage backend, using `data_dir` if provided or the
/// default XDG data directory otherwise.
fn create_storage(data_dir: Option<PathBuf>) -> tpe_registry::Result<FileStorage> {
    let dir = match data_dir {
        Some(dir) => dir,
        None => FileStorage::default_dir()?,
    };
    FileStorage::in_dir(&dir)
}

/// Opens the registry with autosave.
///
/// Records are loaded from the snapshot, or the backup if the snapshot is
/// unreadable. `restore` skips loading so it can repair both.
fn open_registry<S: Storage>(storage: S, command: &Command) -> tpe_registry::Result<Registry<S>> {
    Registry::builder()
        .storage(storage)
        .autosave(true)
        .load_on_build(!matches!(*command, Command::Restore { .. }))
        .build()
}

/// Dispatches to the appropriate subcommand handler.
fn dispatch<S: Storage, U: Storage>(
    registry: &mut Registry<S>,
    users: &mut UserDirectory<U>,
    credentials: &Credentials,
    command: Command,
) -> io::Result<ExitCode> {
    match command {
        Command::List(args) => cmd_list(registry, &args),
        Command::Show { shop_id } => cmd_show(registry, ShopId::new(shop_id)),
        Command::Stats => cmd_stats(registry),
        Command::Export { path } => cmd_export(registry, &path),
        Command::Add(args) => {
            if !authorize(users, credentials, false)? {
                return Ok(ExitCode::FAILURE);
            }
            cmd_add(registry, &args)
        }
        Command::Edit { key, record } => {
            if !authorize(users, credentials, true)? {
                return Ok(ExitCode::FAILURE);
            }
            cmd_edit(registry, ShopId::new(key), &record)
        }
        Command::Remove { shop_id } => {
            if !authorize(users, credentials, true)? {
                return Ok(ExitCode::FAILURE);
            }
            cmd_remove(registry, ShopId::new(shop_id))
        }
        Command::Restore { path } => {
            if !authorize(users, credentials, false)? {
                return Ok(ExitCode::FAILURE);
            }
            cmd_restore(registry, &path)
        }
        Command::Users { command } => dispatch_users(users, credentials, command),
    }
}

/// Dispatches user management subcommands.
fn dispatch_users<U: Storage>(
    users: &mut UserDirectory<U>,
    credentials: &Credentials,
    command: UsersCommand,
) -> io::Result<ExitCode> {
    let admin_only = !matches!(command, UsersCommand::Passwd { .. });
    if !authorize(users, credentials, admin_only)? {
        return Ok(ExitCode::FAILURE);
    }
    match command {
        UsersCommand::List => cmd_users_list(users),
        UsersCommand::Add(args) => cmd_users_add(users, args),
        UsersCommand::Enable { username } => cmd_users_set_active(users, &username, true),
        UsersCommand::Disable { username } => cmd_users_set_active(users, &username, false),
        UsersCommand::Passwd { new_password } => {
            cmd_users_passwd(users, credentials, &SecretString::from(new_password))
        }
        UsersCommand::Stats => cmd_users_stats(users),
    }
}

/// Logs in with the command-line credentials.
///
/// Returns `Ok(false)` (reason already printed) when credentials are
/// missing or wrong, or when `admin` is required and the user is not one.
fn authorize<U: Storage>(
    users: &mut UserDirectory<U>,
    credentials: &Credentials,
    admin: bool,
) -> io::Result<bool> {
    let (Some(user), Some(password)) = (&credentials.user, &credentials.password) else {
        writeln!(
            io::stderr().lock(),
            "{} this command requires {} and {}",
            "error:".red().bold(),
            "--user".bold(),
            "--password".bold()
        )?;
        return Ok(false);
    };
    match users.authenticate(user, password) {
        Ok(account) if admin && !account.is_admin() => {
            writeln!(
                io::stderr().lock(),
                "{} administrator role required",
                "error:".red().bold()
            )?;
            Ok(false)
        }
        Ok(_) => Ok(true),
        Err(err) => {
            let _code = fail("login failed", err)?;
            Ok(false)
        }
    }
}

/// Executes the `list` subcommand.
fn cmd_list<S: Storage>(registry: &Registry<S>, args: &ListArgs) -> io::Result<ExitCode> {
    let records = registry.search(&build_filter(args));
    print_records_table(&records)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `show` subcommand.
fn cmd_show<S: Storage>(registry: &Registry<S>, key: ShopId) -> io::Result<ExitCode> {
    match registry.find(key) {
        Some(record) => {
            print_record_detail(record)?;
            Ok(ExitCode::SUCCESS)
        }
        None => fail("show", format_args!("no record with shop ID {key}")),
    }
}

/// Executes the `add` subcommand.
fn cmd_add<S: Storage>(registry: &mut Registry<S>, args: &RecordArgs) -> io::Result<ExitCode> {
    let record = match build_record(args) {
        Ok(record) => record,
        Err(err) => return fail("invalid record", err),
    };
    match registry.add(record) {
        Ok(key) => {
            writeln!(
                io::stdout().lock(),
                "{} record added with shop ID {}",
                "ok:".green().bold(),
                key.bold()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("add failed", err),
    }
}

/// Executes the `edit` subcommand.
fn cmd_edit<S: Storage>(
    registry: &mut Registry<S>,
    key: ShopId,
    args: &RecordArgs,
) -> io::Result<ExitCode> {
    let record = match build_record(args) {
        Ok(record) => record,
        Err(err) => return fail("invalid record", err),
    };
    match registry.replace(key, record) {
        Ok(true) => {
            writeln!(
                io::stdout().lock(),
                "{} record {key} updated",
                "ok:".green().bold()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(false) => fail("edit", format_args!("no record with shop ID {key}")),
        Err(err) => fail("edit failed", err),
    }
}

/// Executes the `remove` subcommand.
fn cmd_remove<S: Storage>(registry: &mut Registry<S>, key: ShopId) -> io::Result<ExitCode> {
    match registry.take(key) {
        Ok(Some(_)) => {
            writeln!(
                io::stdout().lock(),
                "{} record {key} removed",
                "ok:".green().bold()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => {
            writeln!(
                io::stdout().lock(),
                "{}",
                format_args!("No record with shop ID {key}.").dimmed()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("remove failed", err),
    }
}

/// Executes the `stats` subcommand.
fn cmd_stats<S: Storage>(registry: &Registry<S>) -> io::Result<ExitCode> {
    let stats = registry.statistics();
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Metric").fg(Color::Cyan),
        Cell::new("Count").fg(Color::Cyan),
    ]);
    for (label, value) in [
        ("Records", stats.total.to_string()),
        ("Devices", stats.total_devices.to_string()),
        ("Ethernet", stats.wired.to_string()),
        ("4/5G", stats.cellular.to_string()),
        ("Backoffice active", stats.backoffice_active.to_string()),
    ] {
        _ = table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    let mut out = io::stdout().lock();
    writeln!(out, "{}", "Statistics".green().bold())?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `export` subcommand.
fn cmd_export<S: Storage>(registry: &Registry<S>, path: &Path) -> io::Result<ExitCode> {
    let spinner = make_spinner("Exporting records...");
    match registry.export_table(path) {
        Ok(()) => {
            spinner.finish_and_clear();
            writeln!(
                io::stdout().lock(),
                "{} {} records exported to {}",
                "ok:".green().bold(),
                registry.len(),
                path.display().bold()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            spinner.finish_and_clear();
            fail("export failed", err)
        }
    }
}

/// Executes the `restore` subcommand.
fn cmd_restore<S: Storage>(
    registry: &mut Registry<S>,
    path: &Path,
) -> io::Result<ExitCode> {
    if let Err(err) = registry.restore_from(path) {
        return fail("restore failed", err);
    }
    if let Err(err) = registry.save() {
        return fail("failed to save restored records", err);
    }
    writeln!(
        io::stdout().lock(),
        "{} {} records restored from {}",
        "ok:".green().bold(),
        registry.len(),
        path.display().bold()
    )?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `users list` subcommand.
fn cmd_users_list<U: Storage>(users: &UserDirectory<U>) -> io::Result<ExitCode> {
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Username").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Role").fg(Color::Cyan),
        Cell::new("Active").fg(Color::Cyan),
        Cell::new("Last login").fg(Color::Cyan),
    ]);
    for account in users.list_users() {
        let last_login = account.last_login().map_or_else(
            || "-".to_owned(),
            |at| at.format("%Y-%m-%d %H:%M").to_string(),
        );
        let active = if account.is_active() {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::Red)
        };
        _ = table.add_row(vec![
            Cell::new(account.username()),
            Cell::new(format!("{} {}", account.first_name(), account.last_name())),
            Cell::new(account.role()),
            active,
            Cell::new(last_login),
        ]);
    }
    writeln!(io::stdout().lock(), "{table}")?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `users add` subcommand.
fn cmd_users_add<U: Storage>(
    users: &mut UserDirectory<U>,
    args: NewUserArgs,
) -> io::Result<ExitCode> {
    let profile = NewUser {
        username: Username::new(args.username),
        role: args.role,
        last_name: args.last_name,
        first_name: args.first_name,
        email: args.email,
    };
    let name = profile.username.clone();
    match users.add_user(profile, &SecretString::from(args.new_password)) {
        Ok(()) => {
            writeln!(
                io::stdout().lock(),
                "{} user {} created",
                "ok:".green().bold(),
                name.bold()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to add user", err),
    }
}

/// Executes the `users enable` / `users disable` subcommands.
fn cmd_users_set_active<U: Storage>(
    users: &mut UserDirectory<U>,
    username: &str,
    active: bool,
) -> io::Result<ExitCode> {
    match users.set_active(username, active) {
        Ok(()) => {
            let state = if active { "enabled" } else { "disabled" };
            writeln!(
                io::stdout().lock(),
                "{} user {} {state}",
                "ok:".green().bold(),
                username.bold()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to update user", err),
    }
}

/// Executes the `users passwd` subcommand.
fn cmd_users_passwd<U: Storage>(
    users: &mut UserDirectory<U>,
    credentials: &Credentials,
    new_password: &SecretString,
) -> io::Result<ExitCode> {
    let (Some(user), Some(old)) = (&credentials.user, &credentials.password) else {
        return fail("passwd", "missing --user or --password");
    };
    match users.change_password(user, old, new_password) {
        Ok(()) => {
            writeln!(
                io::stdout().lock(),
                "{} password changed",
                "ok:".green().bold()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to change password", err),
    }
}

/// Executes the `users stats` subcommand.
fn cmd_users_stats<U: Storage>(users: &UserDirectory<U>) -> io::Result<ExitCode> {
    let stats = users.user_statistics();
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Metric").fg(Color::Cyan),
        Cell::new("Count").fg(Color::Cyan),
    ]);
    for (label, value) in [
        ("Accounts", stats.total),
        ("Active", stats.active),
        ("Inactive", stats.inactive),
        ("Administrators", stats.admins),
        ("Users", stats.users),
    ] {
        _ = table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    writeln!(io::stdout().lock(), "{table}")?;
    Ok(ExitCode::SUCCESS)
}

/// Prints records in a table.
fn print_records_table(records: &[&Terminal]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if records.is_empty() {
        writeln!(out, "{}", "No records found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Shop ID").fg(Color::Cyan),
        Cell::new("Service").fg(Color::Cyan),
        Cell::new("Operator").fg(Color::Cyan),
        Cell::new("Model").fg(Color::Cyan),
        Cell::new("Cards").fg(Color::Cyan),
        Cell::new("Links").fg(Color::Cyan),
        Cell::new("Devices").fg(Color::Cyan),
    ]);

    for record in records {
        let cards = record
            .cards()
            .iter()
            .map(MerchantCard::number)
            .collect::<Vec<_>>()
            .join(", ");
        _ = table.add_row(vec![
            Cell::new(record.shop_id()),
            Cell::new(record.service()),
            Cell::new(record.operator().full_name()),
            Cell::new(record.model()),
            Cell::new(cards),
            Cell::new(record.connectivity().label()),
            Cell::new(record.device_count()),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Payment terminals".green().bold(),
        format_args!("({})", records.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints every field of one record.
fn print_record_detail(record: &Terminal) -> io::Result<()> {
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    let backoffice = record.backoffice();
    let network = record.connectivity().network();
    let mut rows = vec![
        ("Shop ID", record.shop_id().to_string()),
        ("Service", record.service().to_owned()),
        ("Operator", record.operator().to_string()),
        ("Alternates", record.alternate_operators().to_owned()),
        ("Model", record.model().to_owned()),
        ("Devices", record.device_count().to_string()),
        ("Links", record.connectivity().label()),
        (
            "Backoffice",
            match backoffice.email() {
                Some(email) => format!("active ({email})"),
                None if backoffice.is_active() => "active".to_owned(),
                None => "inactive".to_owned(),
            },
        ),
    ];
    if let Some(network) = network {
        rows.push(("IP address", network.ip_address().to_owned()));
        rows.push(("Subnet mask", network.subnet_mask().to_owned()));
        rows.push(("Gateway", network.gateway().to_owned()));
    }
    for (index, card) in record.cards().iter().enumerate() {
        let serial = card.device_serial().unwrap_or("N/A");
        rows.push(("Card", format!("#{} {} (serial {serial})", index + 1, card.number())));
    }
    rows.push((
        "Created",
        record.created_at().map_or_else(
            || "-".to_owned(),
            |at| at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
    ));
    for (label, value) in rows {
        _ = table.add_row(vec![Cell::new(label).fg(Color::Cyan), Cell::new(value)]);
    }
    writeln!(io::stdout().lock(), "{table}")?;
    Ok(())
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            // stderr itself may be gone; nothing left to report to
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tpe_registry::storage::InMemoryStorage;
    use tpe_registry::users::{DEFAULT_ADMIN, DEFAULT_ADMIN_PASSWORD};

    /// Record arguments for a cellular terminal.
    fn record_args() -> RecordArgs {
        RecordArgs {
            service: "Piscine".to_owned(),
            first_name: "Marie".to_owned(),
            last_name: "Durand".to_owned(),
            phone: String::new(),
            alternates: String::new(),
            cards: vec![parse_card("123456:SN-1").unwrap()],
            shop_id: 0,
            model: KNOWN_MODELS[1].to_owned(),
            ethernet: false,
            cellular: true,
            ip: None,
            mask: None,
            gateway: None,
            backoffice_email: None,
            devices: 1,
        }
    }

    fn admin() -> Credentials {
        Credentials {
            user: Some(DEFAULT_ADMIN.to_owned()),
            password: Some(SecretString::from(DEFAULT_ADMIN_PASSWORD.to_owned())),
        }
    }

    fn fixtures() -> (Registry<InMemoryStorage>, UserDirectory<InMemoryStorage>) {
        (
            Registry::new(InMemoryStorage::new()),
            UserDirectory::open(InMemoryStorage::new()).unwrap(),
        )
    }

    // ── parsing ──────────────────────────────────────────────────────

    #[test]
    fn parse_card_with_and_without_serial() {
        let card = parse_card("998877:SN-42").unwrap();
        assert_eq!(card.number(), "998877");
        assert_eq!(card.device_serial(), Some("SN-42"));

        let bare = parse_card("998877").unwrap();
        assert!(bare.device_serial().is_none());

        assert!(parse_card("   ").is_err());
    }

    #[test]
    fn cli_parses_add_command() {
        let cli = Cli::try_parse_from([
            "tpe",
            "add",
            "--service",
            "Musée",
            "--first-name",
            "Paul",
            "--last-name",
            "Petit",
            "--card",
            "111",
            "--card",
            "222:SN",
            "--ethernet",
            "--ip",
            "10.0.0.2",
            "--mask",
            "255.0.0.0",
            "--gateway",
            "10.0.0.1",
        ])
        .unwrap();
        let Command::Add(args) = cli.command else {
            panic!("expected add command");
        };
        let record = build_record(&args).unwrap();
        assert_eq!(record.cards().len(), 2);
        assert!(record.connectivity().is_wired());
    }

    #[test]
    fn build_record_rejects_ethernet_without_network() {
        let mut args = record_args();
        args.ethernet = true;
        args.cellular = false;
        assert!(build_record(&args).is_err());
    }

    #[test]
    fn build_filter_combines_criteria() {
        let args = ListArgs {
            search: Some("piscine".to_owned()),
            family: Some(FamilyArg::Move),
            ..ListArgs::default()
        };
        let record = build_record(&record_args()).unwrap();
        assert!(build_filter(&args).matches(&record));

        let desk = ListArgs {
            family: Some(FamilyArg::Desk),
            ..ListArgs::default()
        };
        assert!(!build_filter(&desk).matches(&record));
    }

    // ── commands ─────────────────────────────────────────────────────

    #[test]
    fn list_empty_and_populated() {
        let (mut registry, _users) = fixtures();
        assert_eq!(
            cmd_list(&registry, &ListArgs::default()).unwrap(),
            ExitCode::SUCCESS
        );
        assert_eq!(
            cmd_add(&mut registry, &record_args()).unwrap(),
            ExitCode::SUCCESS
        );
        assert_eq!(
            cmd_list(&registry, &ListArgs::default()).unwrap(),
            ExitCode::SUCCESS
        );
        assert_eq!(
            cmd_show(&registry, ShopId::new(1)).unwrap(),
            ExitCode::SUCCESS
        );
        assert_eq!(
            cmd_show(&registry, ShopId::new(9)).unwrap(),
            ExitCode::FAILURE
        );
    }

    #[test]
    fn add_requires_login() {
        let (mut registry, mut users) = fixtures();
        let code = dispatch(
            &mut registry,
            &mut users,
            &Credentials::default(),
            Command::Add(record_args()),
        )
        .unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_requires_admin() {
        let (mut registry, mut users) = fixtures();
        let _key = registry.add(build_record(&record_args()).unwrap()).unwrap();
        users
            .add_user(
                NewUser {
                    username: Username::from("bob"),
                    role: Role::User,
                    last_name: String::new(),
                    first_name: String::new(),
                    email: String::new(),
                },
                &SecretString::from("pw".to_owned()),
            )
            .unwrap();
        let bob = Credentials {
            user: Some("bob".to_owned()),
            password: Some(SecretString::from("pw".to_owned())),
        };

        let denied = dispatch(&mut registry, &mut users, &bob, Command::Remove { shop_id: 1 });
        assert_eq!(denied.unwrap(), ExitCode::FAILURE);
        assert_eq!(registry.len(), 1);

        let allowed = dispatch(&mut registry, &mut users, &admin(), Command::Remove { shop_id: 1 });
        assert_eq!(allowed.unwrap(), ExitCode::SUCCESS);
        assert!(registry.is_empty());
    }

    #[test]
    fn edit_replaces_record() {
        let (mut registry, mut users) = fixtures();
        let _key = registry.add(build_record(&record_args()).unwrap()).unwrap();
        let mut record = record_args();
        record.service = "Stade".to_owned();
        let code = dispatch(
            &mut registry,
            &mut users,
            &admin(),
            Command::Edit { key: 1, record },
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(registry.find(ShopId::new(1)).unwrap().service(), "Stade");
    }

    #[test]
    fn stats_and_user_commands() {
        let (mut registry, mut users) = fixtures();
        assert_eq!(cmd_stats(&registry).unwrap(), ExitCode::SUCCESS);
        for command in [UsersCommand::List, UsersCommand::Stats] {
            let code = dispatch(
                &mut registry,
                &mut users,
                &admin(),
                Command::Users { command },
            )
            .unwrap();
            assert_eq!(code, ExitCode::SUCCESS);
        }
        let protected = dispatch_users(
            &mut users,
            &admin(),
            UsersCommand::Disable {
                username: DEFAULT_ADMIN.to_owned(),
            },
        )
        .unwrap();
        assert_eq!(protected, ExitCode::FAILURE);
    }

    #[test]
    fn export_and_restore_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let (mut registry, mut users) = fixtures();
        let _key = registry.add(build_record(&record_args()).unwrap()).unwrap();

        let xlsx = dir.path().join("out.xlsx");
        assert_eq!(cmd_export(&registry, &xlsx).unwrap(), ExitCode::SUCCESS);
        assert!(xlsx.exists());

        let mut files = Registry::new(FileStorage::in_dir(dir.path()).unwrap());
        let _copied = files.add(build_record(&record_args()).unwrap()).unwrap();
        files.save().unwrap();
        let backup = files.storage().config().backup_path.clone();

        let restored = dispatch(
            &mut registry,
            &mut users,
            &admin(),
            Command::Restore { path: backup },
        )
        .unwrap();
        assert_eq!(restored, ExitCode::SUCCESS);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn restore_recovers_from_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path()).unwrap();
        let mut original = Registry::new(storage.clone());
        let _key = original.add(build_record(&record_args()).unwrap()).unwrap();
        original.save().unwrap();
        let snapshot = storage.config().snapshot_path.clone();
        let backup = storage.config().backup_path.clone();
        std::fs::write(&snapshot, b"\xff garbage").unwrap();

        let restore = Command::Restore {
            path: backup,
        };
        let mut registry = open_registry(storage.clone(), &restore).unwrap();
        let mut users = UserDirectory::open(storage.clone()).unwrap();
        let code = dispatch(&mut registry, &mut users, &admin(), restore).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(registry.len(), 1);

        let mut reopened = Registry::new(storage);
        assert!(reopened.load().unwrap());
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn read_commands_fall_back_to_backup() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path()).unwrap();
        let mut original = Registry::new(storage.clone());
        let _key = original.add(build_record(&record_args()).unwrap()).unwrap();
        original.save().unwrap();
        std::fs::write(&storage.config().snapshot_path, b"\xff").unwrap();

        let registry = open_registry(storage, &Command::Stats).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(cmd_stats(&registry).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn remove_absent_record_succeeds() {
        let (mut registry, mut users) = fixtures();
        let code = dispatch(
            &mut registry,
            &mut users,
            &admin(),
            Command::Remove { shop_id: 42 },
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn make_spinner_creates_spinner() {
        let spinner = make_spinner("Testing...");
        spinner.finish_and_clear();
    }
}
