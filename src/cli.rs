use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CitySet;

#[derive(Parser, Debug)]
#[command(name = "geonames-cities")]
#[command(version, about = "Build and query an offline GeoNames city database")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download (if needed) and build the database
    Sync {
        /// Output SQLite database path (default: user data directory)
        output_db: Option<PathBuf>,

        #[command(flatten)]
        build: BuildArgs,

        /// Force re-download even if cached
        #[arg(short, long)]
        force: bool,

        /// Custom cache directory
        #[arg(short, long)]
        cache_dir: Option<PathBuf>,
    },

    /// Download the GeoNames dumps
    Download {
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// City dump to download
        #[arg(long, value_enum, default_value_t = CitySet::default())]
        cities: CitySet,

        /// Force re-download even if cached
        #[arg(short, long)]
        force: bool,
    },

    /// Build the database from dumps in a local directory
    Build {
        /// Directory containing the GeoNames text files (or their zips)
        input_dir: PathBuf,

        /// Output SQLite database path
        output_db: PathBuf,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Prefix search over city names
    Search {
        query: String,

        #[command(flatten)]
        query_args: QueryArgs,

        /// Maximum number of results (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Look up a city by GeoNames id
    Get {
        id: i64,

        #[command(flatten)]
        query_args: QueryArgs,
    },

    /// Cities nearest to a coordinate
    Nearest {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,

        #[arg(allow_hyphen_values = true)]
        longitude: f64,

        #[command(flatten)]
        query_args: QueryArgs,

        /// Number of cities to return
        #[arg(short = 'n', long, default_value_t = 1)]
        limit: usize,
    },

    /// List languages available in a database
    Languages {
        /// Database path (default: user data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// List fields accepted by --fields
    ListFields,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Languages for translated names (comma-separated)
    #[arg(short, long, value_delimiter = ',', default_value = "en")]
    pub languages: Vec<String>,

    /// City dump to use
    #[arg(long, value_enum, default_value_t = CitySet::default())]
    pub cities: CitySet,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Database path (default: user data directory)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Language for name fields
    #[arg(long)]
    pub lang: Option<String>,

    /// Fields to return (comma-separated, see list-fields)
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "id,name,administrative_name,country_name,latitude,longitude"
    )]
    pub fields: Vec<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
