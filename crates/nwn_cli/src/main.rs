use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use nwn_core::core_api::{Engine, Session};
use nwn_core::creature::ClassId;
use nwn_core::feats::{CategoryFilter, FeatId, Status};
use nwn_render::{
    JsonStyle, TextRenderOptions, render_json_full, render_json_summary,
    render_text_sheet_with_options,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "CREATURE.json")]
    path: PathBuf,
    /// Rule tables (JSON, optionally gzip-compressed).
    #[arg(long, env = "NWN_SE_RULES", value_name = "RULES.json")]
    rules: PathBuf,
    /// Case-insensitive substring of the feat name.
    #[arg(long)]
    search: Option<String>,
    #[arg(long, value_name = "all|CATEGORY", value_parser = parse_category)]
    category: Option<CategoryFilter>,
    /// Make a status visible. Repeatable.
    #[arg(long, value_name = "STATUS", value_parser = parse_status)]
    show: Vec<Status>,
    /// Hide a status. Repeatable; applied after --show.
    #[arg(long, value_name = "STATUS", value_parser = parse_status)]
    hide: Vec<Status>,
    #[arg(long)]
    grouped: bool,
    #[arg(long)]
    summary: bool,
    #[arg(long)]
    json: bool,
    #[arg(short, long)]
    verbose: bool,
    #[arg(long = "add-feat", value_name = "ID")]
    add_feat: Vec<u16>,
    #[arg(long = "remove-feat", value_name = "ID")]
    remove_feat: Vec<u16>,
    /// Set a class level, adding the class if needed.
    #[arg(long = "set-class", value_name = "CLASS:LEVEL", value_parser = parse_class_level)]
    set_class: Vec<(ClassId, u8)>,
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let has_edits =
        !cli.add_feat.is_empty() || !cli.remove_feat.is_empty() || !cli.set_class.is_empty();
    if has_edits && cli.output.is_none() {
        eprintln!("--add-feat, --remove-feat and --set-class require --output <PATH>");
        process::exit(2);
    }
    if !has_edits && cli.output.is_some() {
        eprintln!("--output requires at least one --add-feat, --remove-feat or --set-class flag");
        process::exit(2);
    }

    let engine = Engine::load_rules(&cli.rules).unwrap_or_else(|e| {
        eprintln!("Error loading rules: {}", cli.rules.display());
        eprintln!("  {}", e);
        process::exit(1);
    });

    let bytes = fs::read(&cli.path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {e}", cli.path.display());
        process::exit(1);
    });
    let mut session = engine.open_bytes(bytes).unwrap_or_else(|e| {
        eprintln!("Error parsing creature file: {}", cli.path.display());
        eprintln!("  {}", e);
        process::exit(1);
    });

    for &(class, level) in &cli.set_class {
        session.set_class_level(class, level).unwrap_or_else(|e| {
            eprintln!("Error applying class level edit: {e}");
            process::exit(1);
        });
    }
    for &raw in &cli.remove_feat {
        remove_feat(&mut session, FeatId(raw));
    }
    for &raw in &cli.add_feat {
        add_feat(&mut session, FeatId(raw));
    }

    if let Some(out_path) = cli.output.as_ref() {
        let edited_bytes = session.to_json_bytes().unwrap_or_else(|e| {
            eprintln!("Error serializing edited creature: {e}");
            process::exit(1);
        });
        fs::write(out_path, edited_bytes).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {e}", out_path.display());
            process::exit(1);
        });
        debug!(path = %out_path.display(), "edited creature written");
    }

    apply_view_flags(&cli, &mut session);

    if cli.json {
        let json = if cli.summary {
            render_json_summary(&session, JsonStyle::CanonicalV1)
        } else {
            render_json_full(&session, JsonStyle::CanonicalV1)
        };
        let rendered = serde_json::to_string_pretty(&json).unwrap_or_else(|e| {
            eprintln!("Error rendering JSON output: {e}");
            process::exit(1);
        });
        println!("{rendered}");
        return;
    }

    if let Some(out_path) = cli.output.as_ref() {
        println!("Wrote edited creature to {}", out_path.display());
        return;
    }

    let options = TextRenderOptions {
        grouped: cli.grouped,
        summary_only: cli.summary,
    };
    print!("{}", render_text_sheet_with_options(&session, options));
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn apply_view_flags(cli: &Cli, session: &mut Session) {
    if let Some(search) = &cli.search {
        session.set_search(search.clone());
    }
    if let Some(category) = cli.category {
        session.set_category(category);
    }
    for &status in &cli.show {
        session.set_status_visible(status, true);
    }
    for &status in &cli.hide {
        session.set_status_visible(status, false);
    }
}

fn add_feat(session: &mut Session, feat: FeatId) {
    if session.rules().feats().get(feat).is_none() {
        eprintln!("Warning: feat {feat} is not in the rule tables; not added");
        return;
    }
    if !session.add_feat(feat) {
        eprintln!("Warning: feat {feat} is already on the creature; not added");
    }
}

fn remove_feat(session: &mut Session, feat: FeatId) {
    if session.remove_feat(feat) {
        return;
    }
    if session.creature().feats.contains(feat) {
        eprintln!("Warning: feat {feat} is granted by race or class; not removed");
    } else {
        eprintln!("Warning: feat {feat} is not on the creature; not removed");
    }
}

fn parse_category(raw: &str) -> Result<CategoryFilter, String> {
    raw.parse()
}

fn parse_status(raw: &str) -> Result<Status, String> {
    raw.parse()
}

fn parse_class_level(raw: &str) -> Result<(ClassId, u8), String> {
    let (class, level) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected CLASS:LEVEL, got '{raw}'"))?;
    let class = class
        .trim()
        .parse::<u16>()
        .map_err(|e| format!("invalid class id '{class}': {e}"))?;
    let level = level
        .trim()
        .parse::<u8>()
        .map_err(|e| format!("invalid level '{level}': {e}"))?;
    Ok((ClassId(class), level))
}
