use clap::Parser;
use std::path::PathBuf;

use crate::db::{OpenMode, StoreKind};

#[derive(Parser, Debug)]
#[command(name = "ecshell")]
#[command(author, version, about = "An interactive ECSql console for ECDb and iModel files")]
pub struct Cli {
    /// Path to an .ecdb, .bim or other SQLite file
    #[arg(required = true)]
    pub path: PathBuf,

    /// Kind of database (detected from the file extension by default)
    #[arg(short, long)]
    pub kind: Option<StoreKindArg>,

    /// How to open the file (asked interactively when omitted)
    #[arg(short, long)]
    pub mode: Option<OpenModeArg>,

    /// Execute a single ECSql statement and exit (non-interactive mode)
    #[arg(short, long)]
    pub query: Option<String>,

    /// List the schemas stored in the file and exit
    #[arg(long, conflicts_with = "query")]
    pub schemas: bool,

    /// Where query history is kept; an empty value disables it
    #[arg(long)]
    pub history_file: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreKindArg {
    Ecdb,
    Snapshot,
    Standalone,
    Briefcase,
    Sqlite,
}

impl From<StoreKindArg> for StoreKind {
    fn from(arg: StoreKindArg) -> Self {
        match arg {
            StoreKindArg::Ecdb => StoreKind::EcDb,
            StoreKindArg::Snapshot => StoreKind::Snapshot,
            StoreKindArg::Standalone => StoreKind::Standalone,
            StoreKindArg::Briefcase => StoreKind::Briefcase,
            StoreKindArg::Sqlite => StoreKind::Sqlite,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OpenModeArg {
    ReadOnly,
    ReadWrite,
    FileUpgrade,
}

impl From<OpenModeArg> for OpenMode {
    fn from(arg: OpenModeArg) -> Self {
        match arg {
            OpenModeArg::ReadOnly => OpenMode::ReadOnly,
            OpenModeArg::ReadWrite => OpenMode::ReadWrite,
            OpenModeArg::FileUpgrade => OpenMode::FileUpgrade,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// The database kind, from `--kind` or the file extension.
    pub fn store_kind(&self) -> StoreKind {
        self.kind
            .map(StoreKind::from)
            .unwrap_or_else(|| StoreKind::from_path(&self.path))
    }
}
