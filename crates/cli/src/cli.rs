use std::path::PathBuf;

use clap::Parser;

/// Find the stored detection rules most similar to a Sigma rule.
///
/// Extracts field names and values from the rule's detection section and
/// ranks every rule in the corpus directory by weighted similarity.
#[derive(Parser, Debug)]
#[command(name = "rulematch", about = "Rank stored Sigma rules by similarity to a rule file")]
pub struct CliArgs {
    /// Sigma rule YAML file to compare, or `-` to read it from stdin
    pub rule_file: PathBuf,

    /// Config profile; keys are read as {PROFILE}_{KEY} before {KEY}
    #[arg(long, env = "RULEMATCH_PROFILE", default_value = "")]
    pub profile: String,

    /// Rule corpus directory (overrides RULES_DIR)
    #[arg(long)]
    pub rules_dir: Option<PathBuf>,

    /// Maximum number of matches to print (overrides RULEMATCH_TOP_N)
    #[arg(long)]
    pub top_n: Option<usize>,

    /// TOML scoring policy (overrides RULEMATCH_POLICY)
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Score corpus rules on a single thread
    #[arg(long)]
    pub sequential: bool,

    /// Print the ranking report as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the best value matches for each candidate
    #[arg(long)]
    pub explain: bool,

    /// Print each matched rule's full YAML document
    #[arg(long)]
    pub show_rule: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,
}

impl CliArgs {
    /// True when the query rule should be read from stdin.
    pub fn reads_stdin(&self) -> bool {
        self.rule_file.as_os_str() == "-"
    }
}
