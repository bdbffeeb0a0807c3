use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use fsq_lang::Registry;
use fsq_lang::cli::{self, CliError, QueryOptions};
use fsq_lang::output::Format;
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(name = "fsq")]
#[command(about = "fsq - Query files and directories with SQL-like select statements")]
#[command(version)]
struct Cli {
    /// Log skipped rows and traversal details (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a query
    Query {
        /// The query, e.g. "select name, size from . where size > 1024"
        /// (reads from stdin if not provided)
        query: Option<String>,

        /// Only list the source directory, do not descend
        #[arg(long)]
        flat: bool,

        /// Query this directory instead of the one after `from`
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Fail on the first row that cannot be evaluated
        #[arg(long)]
        strict: bool,

        /// Ignore hidden files and directories
        #[arg(long)]
        skip_hidden: bool,

        /// Evaluate rows on a single thread
        #[arg(long)]
        sequential: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// List the attributes a query can select
    Attributes,

    /// List all functions
    Functions,

    /// List the functions usable in a where clause
    WhereFunctions,

    /// Describe an attribute or function
    Describe {
        #[arg(short, long)]
        term: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Format::Text,
            OutputFormat::Json => Format::Json,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let registry = Registry::builtin();
    let result = match cli.command {
        Commands::Query {
            query,
            flat,
            source,
            strict,
            skip_hidden,
            sequential,
            format,
            pretty,
        } => read_query(query).and_then(|query| {
            let options = QueryOptions {
                query,
                flat,
                source,
                strict,
                skip_hidden,
                sequential,
                format: format.into(),
                pretty,
            };
            cli::execute_query(&options, &registry)
        }),
        Commands::Attributes => Ok(cli::list_attributes(&registry)),
        Commands::Functions => Ok(cli::list_functions(&registry)),
        Commands::WhereFunctions => Ok(cli::list_where_functions(&registry)),
        Commands::Describe { term } => cli::describe(&registry, term.as_deref()),
    };

    match result {
        Ok(output) => {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn read_query(query: Option<String>) -> Result<Option<String>, CliError> {
    match query {
        Some(q) => Ok(Some(q)),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(Some(buffer))
        }
        None => Ok(None),
    }
}
