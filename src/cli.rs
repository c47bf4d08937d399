use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pcdrift")]
#[command(about = "Track security-posture inventories and report what changed")]
#[command(version)]
pub struct Cli {
    /// Show debug logging on stderr (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Snapshot CI pipeline tool usage and report changes since earlier snapshots
    Pipelines(PipelinesArgs),

    /// List stored pipeline snapshots
    Snapshots(SnapshotsArgs),

    /// List repositories not scanned within the given number of days
    Repos(ReposArgs),

    /// List, create or delete suppression rules
    Suppressions(SuppressionsArgs),

    /// List tag rules
    Tags(TagsArgs),

    /// List enforcement rules
    EnforcementRules(OutputArgs),

    /// List pipeline risks
    PipelineRisks(OutputArgs),

    /// Save current scanned branches and optionally set a new one
    Branch(BranchArgs),
}

#[derive(Parser)]
pub struct PipelinesArgs {
    /// Compare against snapshots taken within this many days [default: 7]
    #[arg(long)]
    pub lookback_days: Option<u32>,

    /// Delete snapshots older than this many days [default: 30]
    #[arg(long)]
    pub retention_days: Option<u32>,

    /// Snapshot database path (defaults to the platform data directory)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Print every fetched record before the changes
    #[arg(long, default_value_t = false)]
    pub show_records: bool,

    /// Show repositories with their associated app names instead of tracking changes
    #[arg(long, default_value_t = false)]
    pub show: bool,
}

#[derive(Parser)]
pub struct SnapshotsArgs {
    /// Only list snapshots from the last N days
    #[arg(long)]
    pub days: Option<u32>,

    /// Snapshot database path (defaults to the platform data directory)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ReposArgs {
    /// Number of days to look back for last scan date
    #[arg(long)]
    pub days: u32,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct OutputArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct SuppressionsArgs {
    #[command(subcommand)]
    pub action: Option<SuppressionAction>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Subcommand)]
pub enum SuppressionAction {
    /// List suppression rules (default)
    List,

    /// Suppress a resource for a policy
    Create {
        /// Organization/repository the resource lives in
        #[arg(long)]
        account_id: String,

        /// file:resource name or id
        #[arg(long)]
        resource_id: String,

        #[arg(long)]
        comment: String,

        #[arg(long, default_value = "BC_GIT_2")]
        policy_id: String,
    },

    /// Delete a suppression justification
    Delete {
        #[arg(long)]
        policy_id: String,

        #[arg(long)]
        suppression_id: String,
    },
}

#[derive(Parser)]
pub struct TagsArgs {
    /// Filter by tag type
    #[arg(long = "type")]
    pub tag_type: Option<String>,

    /// Filter by repository ID
    #[arg(long)]
    pub repo_id: Option<String>,

    /// Filter by file path
    #[arg(long)]
    pub file_path: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser)]
pub struct BranchArgs {
    /// Branch name to set for scanning
    #[arg(long, required_unless_present = "scan_only")]
    pub branch: Option<String>,

    /// Prompt for confirmation before changing each repository's branch
    #[arg(long, default_value_t = false)]
    pub interactive: bool,

    /// Only save the existing branches without making changes
    #[arg(long, default_value_t = false)]
    pub scan_only: bool,

    /// Only act on this repository
    #[arg(long)]
    pub repository: Option<String>,

    /// Directory for the saved branch file
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}
