use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use vellum_store::{RevisionInfo, StoreConfig, StoreService};

#[derive(Parser)]
#[command(name = "vellum")]
#[command(about = "Inspect git-backed content repositories")]
struct Cli {
    /// Base directory holding owner repositories (overrides VELLUM_ROOT)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List owners that have a content repository
    List,
    /// Show repository statistics for an owner
    Stats {
        /// Owning entity id
        owner: String,
    },
    /// List tracked files in an owner's repository
    Files {
        /// Owning entity id
        owner: String,
    },
    /// Show the revision history of one content item
    History {
        /// Owning entity id
        owner: String,
        /// Repository-relative file path
        path: String,
        /// Maximum number of revisions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Print a content item body
    Read {
        /// Owning entity id
        owner: String,
        /// Repository-relative file path
        path: String,
        /// Read at this revision instead of the current state
        #[arg(short, long)]
        revision: Option<String>,
    },
    /// Search file contents with a regular expression
    Search {
        /// Owning entity id
        owner: String,
        /// Regular expression applied line by line
        query: String,
        /// Glob restricting which files are searched
        #[arg(short, long)]
        file_pattern: Option<String>,
    },
    /// Show changes to one content item between two revisions
    Diff {
        /// Owning entity id
        owner: String,
        /// Repository-relative file path
        path: String,
        /// Revision to compare from
        from: String,
        /// Revision to compare to (defaults to the latest)
        #[arg(short, long)]
        to: Option<String>,
    },
    /// Show the most recent revisions across an owner's repository
    Recent {
        /// Owning entity id
        owner: String,
        /// Maximum number of revisions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = StoreConfig::from_env();
    if let Some(root) = &cli.root {
        config = config.with_root_dir(root);
    }
    info!("Using content root {}", config.root_dir.display());

    let service = StoreService::new(config)?;

    match cli.command {
        Commands::List => {
            list_owners(&service, cli.json).await?;
        }
        Commands::Stats { owner } => {
            show_stats(&service, &owner, cli.json).await?;
        }
        Commands::Files { owner } => {
            list_files(&service, &owner, cli.json).await?;
        }
        Commands::History { owner, path, limit } => {
            show_history(&service, &owner, &path, limit, cli.json).await?;
        }
        Commands::Read {
            owner,
            path,
            revision,
        } => {
            read_item(&service, &owner, &path, revision.as_deref(), cli.json).await?;
        }
        Commands::Search {
            owner,
            query,
            file_pattern,
        } => {
            search_repo(&service, &owner, &query, file_pattern.as_deref(), cli.json).await?;
        }
        Commands::Diff {
            owner,
            path,
            from,
            to,
        } => {
            show_diff(&service, &owner, &path, &from, to.as_deref(), cli.json).await?;
        }
        Commands::Recent { owner, limit } => {
            show_recent(&service, &owner, limit, cli.json).await?;
        }
    }

    Ok(())
}

async fn list_owners(
    service: &StoreService,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let owners = service.list_owners().await?;

    if json {
        return print_json(&owners);
    }

    println!("Content repositories:");
    if owners.is_empty() {
        println!("  No repositories found.");
    } else {
        for owner in owners {
            println!("  - {}", owner);
        }
    }

    Ok(())
}

async fn show_stats(
    service: &StoreService,
    owner: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let stats = service.stats(owner).await?;

    if json {
        return print_json(&stats);
    }

    if !stats.exists {
        println!("No repository found for {}.", stats.owner);
        return Ok(());
    }

    println!("Repository stats for {}:", stats.owner);
    println!("  files: {}", stats.file_count);
    println!("  revisions: {}", stats.revision_count);
    println!("  size: {} bytes", stats.size_bytes);

    Ok(())
}

async fn list_files(
    service: &StoreService,
    owner: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = service.list_files(owner).await?;

    if json {
        return print_json(&files);
    }

    println!("Tracked files for {}:", owner);
    if files.is_empty() {
        println!("  No tracked files found.");
    } else {
        for file in files {
            println!("  - {}", file);
        }
    }

    Ok(())
}

async fn show_history(
    service: &StoreService,
    owner: &str,
    path: &str,
    limit: usize,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let revisions = service.history(owner, path, limit).await?;

    if json {
        return print_json(&revisions);
    }

    println!("History for {}/{}:", owner, path);
    if revisions.is_empty() {
        println!("  No revisions found.");
    } else {
        for revision in &revisions {
            print_revision(revision);
        }
    }

    Ok(())
}

async fn read_item(
    service: &StoreService,
    owner: &str,
    path: &str,
    revision: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let body = service.read(owner, path, revision).await?;

    if json {
        return print_json(&body);
    }

    print!("{}", body);
    if !body.ends_with('\n') {
        println!();
    }

    Ok(())
}

async fn search_repo(
    service: &StoreService,
    owner: &str,
    query: &str,
    file_pattern: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let matches = service.search(owner, query, file_pattern).await?;

    if json {
        return print_json(&matches);
    }

    if matches.is_empty() {
        println!("No matches found.");
    } else {
        for entry in &matches {
            println!("{}:{}: {}", entry.file, entry.line, entry.text);
        }
    }

    Ok(())
}

async fn show_diff(
    service: &StoreService,
    owner: &str,
    path: &str,
    from: &str,
    to: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let patch = service.diff(owner, path, from, to).await?;

    if json {
        return print_json(&patch);
    }

    if patch.is_empty() {
        println!("No differences.");
    } else {
        print!("{}", patch);
    }

    Ok(())
}

async fn show_recent(
    service: &StoreService,
    owner: &str,
    limit: usize,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let revisions = service.recent_revisions(owner, limit).await?;

    if json {
        return print_json(&revisions);
    }

    println!("Recent revisions for {}:", owner);
    if revisions.is_empty() {
        println!("  No revisions found.");
    } else {
        for revision in &revisions {
            print_revision(revision);
        }
    }

    Ok(())
}

fn print_revision(revision: &RevisionInfo) {
    let actor = revision
        .audit_actor
        .as_deref()
        .map(|actor| format!(" ({})", actor))
        .unwrap_or_default();
    println!(
        "  {}  {}  {}{}",
        revision.short_id,
        revision.timestamp.format("%Y-%m-%d %H:%M:%S"),
        revision.summary,
        actor
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
