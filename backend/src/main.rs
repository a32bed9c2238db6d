//! Guestlist CLI - import guest spreadsheets into the planner
//!
//! # Main Commands
//!
//! ```bash
//! guestlist serve                          # Start HTTP server (port 3000)
//! guestlist import guests.csv              # Parse, validate and import
//! guestlist import guests.csv -o out.json  # Same, written to a file
//! guestlist template > guests.tsv          # Print the guest template
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! guestlist parse guests.xlsx              # Headers and rows as JSON
//! guestlist map guests.csv                 # Suggested column mapping
//! guestlist validate guests.csv --map name="Full Name"
//! ```

use clap::{Parser, Subcommand};
use guestlist::{
    auto_map, copy_template, parse_file, parse_pasted, FsFileReader, GuestField, HttpImporter,
    ImportConfig, ImportMethod, ImportSession, JsonFileImporter, ParseResult, SessionError, SessionOptions, Side,
    WriterClipboard,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "guestlist")]
#[command(about = "Import guest spreadsheets (CSV, XLSX, pasted text) into the guest list", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and output headers and rows as JSON
    Parse {
        /// Input file (.csv, .xlsx, .xls)
        input: PathBuf,

        /// Treat the input as pasted spreadsheet text
        #[arg(long)]
        paste: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the suggested column mapping
    Map {
        input: PathBuf,

        #[arg(long)]
        paste: bool,
    },

    /// Validate rows against the (adjusted) mapping
    Validate {
        input: PathBuf,

        #[arg(long)]
        paste: bool,

        /// Override a mapping, e.g. `--map email="E-mail Address"`
        #[arg(short, long = "map", value_parser = parse_map_arg)]
        mappings: Vec<(GuestField, String)>,
    },

    /// Full pipeline: parse → map → validate → transform → import
    Import {
        input: PathBuf,

        #[arg(long)]
        paste: bool,

        #[arg(short, long = "map", value_parser = parse_map_arg)]
        mappings: Vec<(GuestField, String)>,

        /// Default side for guests without one (bride, groom, mutual)
        #[arg(short, long)]
        side: Option<String>,

        /// Event to invite every guest to (repeatable)
        #[arg(short, long = "event")]
        events: Vec<String>,

        /// Guest API base URL (default: GUESTLIST_API_URL)
        #[arg(long, conflicts_with = "output")]
        api_url: Option<String>,

        /// Write the batch to a JSON file instead of calling the API
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the tab-separated guest template
    Template,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { input, paste, output } => cmd_parse(&input, paste, output.as_deref()),

        Commands::Map { input, paste } => cmd_map(&input, paste),

        Commands::Validate { input, paste, mappings } => cmd_validate(&input, paste, mappings).await,

        Commands::Import {
            input,
            paste,
            mappings,
            side,
            events,
            api_url,
            output,
        } => {
            cmd_import(
                &input,
                paste,
                mappings,
                side.as_deref(),
                events,
                api_url,
                output.as_deref(),
            )
            .await
        }

        Commands::Template => cmd_template(),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// Parse `field=Column` into a mapping override.
fn parse_map_arg(arg: &str) -> Result<(GuestField, String), String> {
    let (field, column) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected field=Column, got '{}'", arg))?;
    let field: GuestField = field.trim().parse().map_err(|e: guestlist::models::UnknownField| e.to_string())?;
    Ok((field, column.trim().to_string()))
}

fn read_input(input: &Path, paste: bool) -> Result<ParseResult, Box<dyn std::error::Error>> {
    if paste {
        let text = fs::read_to_string(input)?;
        Ok(parse_pasted(&text)?)
    } else {
        let name = input.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        Ok(parse_file(name, &fs::read(input)?)?)
    }
}

fn print_parse_info(result: &ParseResult) {
    eprintln!("   Encoding: {}", result.encoding);
    if let Some(d) = result.delimiter {
        eprintln!("   Delimiter: '{}'", format_delimiter(d));
    }
    eprintln!("   Columns: {}", result.headers.join(", "));
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn cmd_parse(input: &Path, paste: bool, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let result = read_input(input, paste)?;
    print_parse_info(&result);
    eprintln!("✅ Parsed {} rows", result.rows.len());

    let json = serde_json::to_string_pretty(&serde_json::json!({
        "headers": result.headers,
        "rows": result.rows,
    }))?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_map(input: &Path, paste: bool) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🧭 Mapping columns: {}", input.display());

    let result = read_input(input, paste)?;
    let mapping = auto_map(&result.headers);

    for field in GuestField::ALL {
        match mapping.get(field) {
            Some(column) => eprintln!("   {:<24} ← {}", field.as_str(), column),
            None => eprintln!("   {:<24}   (not mapped)", field.as_str()),
        }
    }
    if !mapping.is_mapped(GuestField::Name) {
        eprintln!("⚠️  No name column found, use --map name=<Column>");
    }

    println!("{}", serde_json::to_string_pretty(&mapping)?);
    Ok(())
}

/// Open a session on `input` and apply the mapping overrides.
async fn open_session(
    config: &ImportConfig,
    input: &Path,
    paste: bool,
    mappings: Vec<(GuestField, String)>,
) -> Result<ImportSession, Box<dyn std::error::Error>> {
    let mut session = ImportSession::new(SessionOptions::from(config));

    if paste {
        session.set_method(ImportMethod::Paste);
        session.set_paste_text(fs::read_to_string(input)?);
        session.load_paste()?;
    } else {
        session.load_from(&FsFileReader, input).await?;
    }

    for (field, column) in mappings {
        session.set_column(field, Some(column))?;
    }

    Ok(session)
}

fn print_errors(session: &ImportSession) {
    eprintln!("\n❌ {} error(s):", session.errors().len());
    for line in session.error_summary() {
        eprintln!("   - {}", line);
    }
}

async fn cmd_validate(
    input: &Path,
    paste: bool,
    mappings: Vec<(GuestField, String)>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", input.display());

    let config = ImportConfig::from_env()?;
    let mut session = open_session(&config, input, paste, mappings).await?;
    let rows = session.rows().len();
    let errors = session.validate().len();

    if errors > 0 {
        print_errors(&session);
        eprintln!("\n📊 Results: {} rows, {} errors", rows, errors);
        std::process::exit(1);
    }

    eprintln!("\n📊 Results: {} rows, no errors", rows);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_import(
    input: &Path,
    paste: bool,
    mappings: Vec<(GuestField, String)>,
    side: Option<&str>,
    events: Vec<String>,
    api_url: Option<String>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let mut config = ImportConfig::from_env()?;
    if let Some(url) = api_url {
        config.api_url = url;
    }

    let mut session = open_session(&config, input, paste, mappings).await?;
    if let Some(side) = side {
        let side = Side::known(side.trim()).ok_or_else(|| format!("Invalid side: {}. Must be bride, groom, or mutual", side))?;
        session.set_default_side(side);
    }
    session.set_event_ids(events);

    match session.advance_to_preview() {
        Ok(count) => eprintln!("\n⚙️  Transformed: {} guests", count),
        Err(SessionError::Invalid(count)) => {
            print_errors(&session);
            return Err(format!("{} validation error(s) must be fixed before importing", count).into());
        }
        Err(e) => return Err(e.into()),
    }

    let imported = match output {
        Some(path) => {
            let imported = session.submit(&JsonFileImporter::new(path)).await?;
            eprintln!("💾 Guests written to: {}", path.display());
            imported
        }
        None => {
            let importer = HttpImporter::from_config(&config);
            eprintln!("📤 Sending to: {}", importer.endpoint());
            session.submit(&importer).await?
        }
    };

    eprintln!("\n✨ Imported {} guests!", imported);
    Ok(())
}

fn cmd_template() -> Result<(), Box<dyn std::error::Error>> {
    copy_template(&mut WriterClipboard::stdout())?;
    Ok(())
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ImportConfig::from_env()?;
    if let Some(port) = port {
        config.port = port;
    }
    guestlist::server::start_server(config).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
