use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use studydeck_core::CardState;

#[derive(Debug, Parser, Clone)]
#[command(name = "studydeck", version, about = "Spaced-repetition flashcards (SM-2)")]
pub struct Cli {
    /// Card store file (defaults to the app data dir)
    #[arg(long)]
    pub store_file: Option<PathBuf>,

    /// Directory for timestamped backups (defaults next to the store file)
    #[arg(long)]
    pub backups_dir: Option<PathBuf>,

    /// Number of backups to keep
    #[arg(long, default_value_t = 10)]
    pub max_backups: usize,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Add a single card
    Add(CardAdd),
    /// Import question/answer pairs
    #[command(subcommand)]
    Import(ImportCmd),
    /// Export full card records
    #[command(subcommand)]
    Export(ExportCmd),
    /// List cards
    List(ListCmd),
    /// List due cards, most overdue first
    Due {
        #[arg(long)]
        max: Option<usize>,
    },
    /// Deck counts
    Stats,
    /// Review loop
    Review(ReviewCmd),
    /// Show what each rating would schedule for a card
    Preview { card_id: String },
    /// Remove a card
    Rm { card_id: String },
    /// Remove every card
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Args, Clone)]
pub struct LadderOpts {
    /// Learning steps in minutes for new cards, e.g. --steps 1,10
    #[arg(long, value_delimiter = ',')]
    pub steps: Vec<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct CardAdd {
    #[arg(long)]
    pub question: String,
    #[arg(long)]
    pub answer: String,
    #[command(flatten)]
    pub ladder: LadderOpts,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ImportCmd {
    /// JSON array of {"question", "answer"} objects
    Json {
        path: PathBuf,
        #[command(flatten)]
        ladder: LadderOpts,
    },
    /// CSV with a header row and question,answer columns
    Csv {
        path: PathBuf,
        #[command(flatten)]
        ladder: LadderOpts,
    },
}

#[derive(Debug, Subcommand, Clone)]
pub enum ExportCmd {
    Json { path: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StateArg {
    New,
    Learning,
    Review,
    Relearning,
}

impl From<StateArg> for CardState {
    fn from(s: StateArg) -> Self {
        match s {
            StateArg::New => CardState::New,
            StateArg::Learning => CardState::Learning,
            StateArg::Review => CardState::Review,
            StateArg::Relearning => CardState::Relearning,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct ListCmd {
    #[arg(long, value_enum)]
    pub state: Option<StateArg>,
    /// Case-insensitive text match on question or answer
    #[arg(long)]
    pub query: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ReviewCmd {
    #[arg(long, default_value_t = 50)]
    pub max: usize,
}
