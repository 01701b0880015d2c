mod cli;
mod terminal;

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use rulematch_core::config::{load_dotenv, Config};
use rulematch_core::{DirectoryRuleStore, SigmaRule};
use rulematch_similarity::engine::DEFAULT_EXPLAIN_LIMIT;
use rulematch_similarity::{SimilarityConfig, SimilarityEngine, ValueMatch};

use crate::cli::CliArgs;
use crate::terminal::Terminal;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    // Command-line flags win over the profiled environment.
    let mut config = Config::for_profile(&args.profile);
    if let Some(dir) = &args.rules_dir {
        config.corpus.rules_dir = dir.clone();
    }
    if let Some(top_n) = args.top_n {
        config.ranking.top_n = top_n;
    }
    if let Some(policy) = &args.policy {
        config.ranking.policy_path = Some(policy.clone());
    }
    if args.sequential {
        config.ranking.parallel = false;
    }
    config.log_summary();

    let policy = match &config.ranking.policy_path {
        Some(path) => SimilarityConfig::from_path(path)
            .with_context(|| format!("failed to load scoring policy {}", path.display()))?,
        None => SimilarityConfig::default(),
    };
    let engine = SimilarityEngine::new(policy.with_parallel(config.ranking.parallel))
        .context("invalid scoring policy")?;

    let rule = if args.reads_stdin() {
        let yaml = io::read_to_string(io::stdin()).context("failed to read rule from stdin")?;
        SigmaRule::from_yaml_str(&yaml).context("failed to parse rule from stdin")?
    } else {
        SigmaRule::from_path(&args.rule_file)
            .with_context(|| format!("failed to read rule {}", args.rule_file.display()))?
    };
    info!(
        rule = %args.rule_file.display(),
        title = rule.title.as_deref().unwrap_or("(untitled)"),
        "loaded query rule"
    );

    let store = DirectoryRuleStore::new(&config.corpus.rules_dir);
    let report = engine
        .compare_with_store(&rule.detection_or_empty(), &store, config.ranking.top_n)
        .context("failed to retrieve stored rules")?;

    let stdout = io::stdout();
    let color = !args.no_color && !args.json && stdout.is_terminal();
    let mut terminal = Terminal::new(stdout.lock(), color).with_rule_dump(args.show_rule);

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
        terminal.print_json(&json)?;
        return Ok(());
    }

    let explanations: Vec<Vec<ValueMatch>> = if args.explain {
        report
            .matches
            .iter()
            .map(|m| engine.best_value_matches(&report.query_values, m, DEFAULT_EXPLAIN_LIMIT))
            .collect()
    } else {
        Vec::new()
    };

    terminal.print_query(&report.query_fields, &report.query_values)?;
    terminal.print_matches(&report, config.ranking.top_n, &explanations)?;
    terminal.print_summary(report.summary.as_ref())?;

    Ok(())
}
