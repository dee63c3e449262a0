use anyhow::Context;
use anyhow::Result;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use rusty_contract::Field;
use rusty_contract::FieldMapping;
use rusty_contract::GenerationOptions;
use rusty_contract::Selection;
use rusty_contract::SignNameMode;
use rusty_contract::Table;
use rusty_contract::Template;
use std::path::Path;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rusty-contract")]
#[command(about = "Fill a DOCX contract template from CSV rows")]
#[command(version)]
struct Cli {
    #[arg(short, long, global = true, help = "Verbose output")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show table columns, the proposed field mapping, row labels and template placeholders
    Inspect(InspectArgs),

    /// Generate the contract of one row
    Single(SingleArgs),

    /// Generate contracts for several rows into one zip archive
    Batch(BatchArgs),
}

#[derive(Args)]
struct InputArgs {
    #[arg(long, help = "CSV table, one row per person (UTF-8 or TIS-620)")]
    data: PathBuf,

    #[command(flatten)]
    columns: ColumnArgs,
}

#[derive(Args)]
struct ColumnArgs {
    #[arg(long, value_name = "COLUMN", help = "Column holding the name prefix")]
    prefix_column: Option<String>,

    #[arg(long, value_name = "COLUMN", help = "Column holding the given name")]
    name_column: Option<String>,

    #[arg(long, value_name = "COLUMN", help = "Column holding the surname")]
    surname_column: Option<String>,

    #[arg(long, value_name = "COLUMN", help = "Column holding the identification number")]
    id_column: Option<String>,

    #[arg(long, value_name = "COLUMN", help = "Column holding the address")]
    address_column: Option<String>,
}

#[derive(Args)]
struct RenderArgs {
    #[arg(long, help = "DOCX template with {{ key }} placeholders")]
    template: PathBuf,

    #[arg(long, env = "RUSTY_CONTRACT_START_ID", help = "Identifier of the first contract, e.g. CT-001")]
    start_id: String,

    #[arg(long, value_enum, default_value = "full", help = "Name parts printed on the signature line")]
    sign_name: SignName,

    #[arg(long, help = "Fail on placeholders that are not contract fields instead of leaving them blank")]
    strict: bool,

    #[arg(long, help = "Output file")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct InspectArgs {
    #[command(flatten)]
    input: InputArgs,

    #[arg(long, help = "DOCX template to check for unknown placeholders")]
    template: Option<PathBuf>,
}

#[derive(Args)]
struct SingleArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    render: RenderArgs,

    #[arg(long, help = "0-based row index")]
    row: usize,
}

#[derive(Args)]
struct BatchArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    render: RenderArgs,

    #[arg(long, value_delimiter = ',', conflicts_with = "all", required_unless_present = "all", help = "Comma separated 0-based row indices")]
    rows: Vec<usize>,

    #[arg(long, help = "Select every row")]
    all: bool,
}

#[derive(ValueEnum, Clone, Copy)]
enum SignName {
    /// Prefix, given name and surname
    Full,
    /// Given name and surname
    GivenSurname,
    /// Given name only
    Given,
}

impl From<SignName> for SignNameMode {
    fn from(value: SignName) -> Self {
        match value {
            SignName::Full => SignNameMode::Full,
            SignName::GivenSurname => SignNameMode::GivenAndSurname,
            SignName::Given => SignNameMode::GivenOnly,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Command::Inspect(args) => inspect(args),
        Command::Single(args) => single(args),
        Command::Batch(args) => batch(args),
    }
}

fn inspect(args: InspectArgs) -> Result<()> {
    let (table, mapping) = load(&args.input)?;

    println!("Columns:");
    for (index, column) in table.columns().iter().enumerate() {
        println!("  {index:>3}  {column}");
    }
    println!("Mapping:");
    for (field, column) in mapping.iter() {
        println!("  {:<10} <- {}", field.as_str(), column);
    }
    println!("Rows:");
    for (index, label) in table.labels(&mapping).iter().enumerate() {
        println!("  {index:>3}  {label}");
    }

    if let Some(path) = args.template {
        let template = Template::open(&path)?;
        let placeholders = template.placeholders()?;
        println!("Placeholders: {}", placeholders.into_iter().collect::<Vec<_>>().join(", "));
        for key in template.unknown_placeholders()? {
            println!("  '{key}' is not a contract field and will render blank");
        }
    }
    Ok(())
}

fn single(args: SingleArgs) -> Result<()> {
    let (table, mapping) = load(&args.input)?;
    let template = Template::open(&args.render.template)?;
    let options = options(&args.render);

    let document = rusty_contract::generate_single(
        &table,
        &mapping,
        args.row,
        &template,
        &args.render.start_id,
        &options,
    )?;
    let output = args.render.output.unwrap_or_else(|| PathBuf::from(&document.name));
    write(&output, &document.bytes)?;
    tracing::info!("Contract {} written to {:?}", document.contract_id, output);
    Ok(())
}

fn batch(args: BatchArgs) -> Result<()> {
    let (table, mapping) = load(&args.input)?;
    let template = Template::open(&args.render.template)?;
    let options = options(&args.render);
    let selection = if args.all {
        Selection::all(&table)
    } else {
        args.rows.iter().copied().collect()
    };

    let result = rusty_contract::generate(
        &table,
        &mapping,
        &selection,
        &template,
        &args.render.start_id,
        &options,
    )?;
    let output = args.render.output.unwrap_or_else(|| PathBuf::from("contracts.zip"));
    write(&output, &result.archive)?;
    for document in &result.documents {
        tracing::debug!("  {}", document.name);
    }
    tracing::info!(
        "{} contracts starting at {} written to {:?}",
        result.count,
        result.start_id,
        output
    );
    Ok(())
}

/// Loads the table and binds fields: positional defaults, then command line overrides.
fn load(args: &InputArgs) -> Result<(Table, FieldMapping)> {
    let table = Table::open(&args.data)?;
    let mut mapping = FieldMapping::propose(table.columns())?;
    let overrides = [
        (Field::Prefix, &args.columns.prefix_column),
        (Field::GivenName, &args.columns.name_column),
        (Field::Surname, &args.columns.surname_column),
        (Field::IdNumber, &args.columns.id_column),
        (Field::Address, &args.columns.address_column),
    ];
    for (field, column) in overrides {
        if let Some(column) = column {
            mapping.bind(field, column, table.columns())?;
        }
    }
    tracing::debug!("Loaded {} rows from {:?}", table.len(), args.data);
    Ok((table, mapping))
}

fn options(args: &RenderArgs) -> GenerationOptions {
    GenerationOptions {
        sign_name_mode: args.sign_name.into(),
        strict_placeholders: args.strict,
        timestamp: Some(chrono::Local::now().naive_local()),
    }
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {:?}", path))
}
