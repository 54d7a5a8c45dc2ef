use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::error;
use serde_json::{json, Value};

use gitwiki::{
    paths, ArchiveFormat, Author, Commit, Document, Error, OpenOptions, Result, Revision, Wiki,
};

#[derive(Parser)]
#[command(name = "gitwiki", about = "Git-backed wiki document store", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the bare repository
    #[arg(long, env = "GITWIKI_REPO", global = true, default_value = "wiki.git")]
    repo: PathBuf,

    /// Branch holding the wiki
    #[arg(long, env = "GITWIKI_BRANCH", global = true)]
    branch: Option<String>,

    /// Suffix of page blobs, e.g. ".md"
    #[arg(long, env = "GITWIKI_EXTENSION", global = true)]
    extension: Option<String>,

    /// Commit author as "Name <email>"
    #[arg(
        long,
        env = "GITWIKI_AUTHOR",
        global = true,
        default_value = "gitwiki <gitwiki@localhost>"
    )]
    author: String,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new repository
    Init(InitArgs),
    /// Print a page, or list a tree, for a request such as "docs/Guide/3f2a9c1"
    Get(GetArgs),
    /// Commit page content read from a file or stdin
    Write(WriteArgs),
    /// Replace a byte range of a page
    Edit(EditArgs),
    /// Store a file, creating or replacing it
    Upload(UploadArgs),
    /// Commits that changed a path
    History(HistoryArgs),
    /// Diff between two revisions
    Diff(DiffArgs),
    /// Show a commit and its changes
    Show(ShowArgs),
    /// Export a tree as a compressed archive
    Archive(ArchiveArgs),
    /// Listing of the root tree, expanded along a path
    Ls(LsArgs),
    /// Check paths against reserved routes
    Reserved(ReservedArgs),
}

#[derive(Args)]
struct InitArgs {
    /// Commit an initial main page at this path
    #[arg(long)]
    main_page: Option<String>,
}

#[derive(Args)]
struct GetArgs {
    request: String,
}

#[derive(Args)]
struct WriteArgs {
    path: String,
    /// Read content from this file instead of stdin
    #[arg(long)]
    file: Option<PathBuf>,
    /// Revision of the page being replaced; omit for a new page
    #[arg(long)]
    baseline: Option<String>,
    #[arg(short, long)]
    message: Option<String>,
}

#[derive(Args)]
struct EditArgs {
    path: String,
    #[arg(long)]
    baseline: String,
    #[arg(long)]
    pos: i64,
    #[arg(long)]
    len: Option<i64>,
    #[arg(long)]
    file: Option<PathBuf>,
    #[arg(short, long)]
    message: String,
}

#[derive(Args)]
struct UploadArgs {
    path: String,
    file: PathBuf,
}

#[derive(Args)]
struct HistoryArgs {
    #[arg(default_value = "")]
    path: String,
    #[arg(short = 'n', long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct DiffArgs {
    from: String,
    to: String,
    #[arg(long)]
    path: Option<String>,
}

#[derive(Args)]
struct ShowArgs {
    revision: String,
}

#[derive(Args)]
struct ArchiveArgs {
    #[arg(default_value = "")]
    path: String,
    #[arg(long)]
    rev: Option<String>,
    #[arg(long = "type", default_value = "tar.gz")]
    kind: ArchiveFormat,
}

#[derive(Args)]
struct LsArgs {
    #[arg(default_value = "")]
    path: String,
    #[arg(long)]
    rev: Option<String>,
}

#[derive(Args)]
struct ReservedArgs {
    paths: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("gitwiki: {}", e);
            if e.is_recoverable() {
                ExitCode::from(1)
            } else {
                ExitCode::from(2)
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let author = Author::parse(&cli.author)?;
    let mut options = OpenOptions {
        branch: cli.branch.clone(),
        extension: cli.extension.clone(),
        author: Some(author.name.clone()),
        email: Some(author.email.clone()),
        ..Default::default()
    };
    if let Command::Init(args) = &cli.command {
        if cli.repo.exists() {
            return Err(Error::duplicate(format!(
                "{} already exists",
                cli.repo.display()
            )));
        }
        options.create = true;
        options.main_page = args.main_page.clone();
    }

    let wiki = Wiki::open(&cli.repo, options)?;
    let out = Output(cli.format);

    match cli.command {
        Command::Init(_) => {
            out.emit(
                json!({ "repo": cli.repo.display().to_string(), "branch": wiki.store().branch() }),
                || format!("Initialized {} on {}", cli.repo.display(), wiki.store().branch()),
            );
        }
        Command::Get(args) => {
            let (target, doc) = wiki.resolve_request(&args.request)?;
            match doc {
                Document::Page(page) if cli.format == OutputFormat::Text => {
                    std::io::stdout()
                        .write_all(page.content())
                        .map_err(|e| Error::io("<stdout>", e))?;
                }
                Document::Page(page) => {
                    out.emit(
                        json!({
                            "path": page.path(),
                            "revision": target.revision.as_ref().map(Revision::as_str),
                            "mime": page.mime().mime_type(),
                            "object": page.object_hash(),
                            "commit": page.commit().map(commit_json),
                            "content": page.text(),
                        }),
                        String::new,
                    );
                }
                Document::Tree(tree) => {
                    let children = tree.children()?;
                    out.emit(
                        json!({
                            "path": tree.path(),
                            "revision": tree.revision().as_str(),
                            "children": children.iter().map(|c| json!({
                                "name": c.name(),
                                "tree": c.is_tree(),
                            })).collect::<Vec<_>>(),
                        }),
                        || {
                            children
                                .iter()
                                .map(|c| format!("{}{}", c.name(), if c.is_tree() { "/" } else { "" }))
                                .collect::<Vec<_>>()
                                .join("\n")
                        },
                    );
                }
            }
        }
        Command::Write(args) => {
            let content = read_input(args.file.as_ref())?;
            let baseline = args.baseline.as_deref().map(Revision::parse).transpose()?;
            let message =
                paths::format_commit_message(baseline.is_none(), &args.path, args.message.as_deref());
            let commit = wiki.write(&args.path, &content, baseline.as_ref(), &message, &cli.author)?;
            out.commit(&commit);
        }
        Command::Edit(args) => {
            let fragment = read_input(args.file.as_ref())?;
            let baseline = Revision::parse(&args.baseline)?;
            let commit = wiki.edit_range(
                &args.path,
                &baseline,
                args.pos,
                args.len,
                &fragment,
                &args.message,
                &cli.author,
            )?;
            out.commit(&commit);
        }
        Command::Upload(args) => {
            let content = std::fs::read(&args.file).map_err(|e| Error::io(&args.file, e))?;
            let commit = wiki.upload(&args.path, &content, &cli.author)?;
            out.commit(&commit);
        }
        Command::History(args) => {
            let commits = wiki.store().history_limit(&args.path, args.limit)?;
            out.emit(
                Value::Array(commits.iter().map(commit_json).collect()),
                || commits.iter().map(commit_line).collect::<Vec<_>>().join("\n"),
            );
        }
        Command::Diff(args) => {
            let from = Revision::parse(&args.from)?;
            let to = Revision::parse(&args.to)?;
            let diff = wiki.diff(args.path.as_deref(), &from, &to)?;
            out.emit(json!({ "from": from.as_str(), "to": to.as_str(), "diff": diff }), || {
                diff.trim_end().to_string()
            });
        }
        Command::Show(args) => {
            let (commit, diff) = wiki.show(&Revision::parse(&args.revision)?)?;
            out.emit(json!({ "commit": commit_json(&commit), "diff": diff }), || {
                format!("{}\n\n{}", commit_line(&commit), diff.trim_end())
            });
        }
        Command::Archive(args) => {
            let rev = args.rev.as_deref().map(Revision::parse).transpose()?;
            let path = wiki.archive(&args.path, rev.as_ref(), args.kind)?;
            out.emit(
                json!({ "archive": path.display().to_string(), "mime": args.kind.mime_type() }),
                || path.display().to_string(),
            );
        }
        Command::Ls(args) => {
            let rev = args.rev.as_deref().map(Revision::parse).transpose()?;
            let items = wiki.walk(&args.path, rev.as_ref())?;
            out.emit(
                Value::Array(
                    items
                        .iter()
                        .map(|i| {
                            json!({
                                "depth": i.depth,
                                "path": i.document.path(),
                                "tree": i.document.is_tree(),
                                "open": i.is_open,
                            })
                        })
                        .collect(),
                ),
                || {
                    items
                        .iter()
                        .map(|i| {
                            let marker = match (i.document.is_tree(), i.is_open) {
                                (true, true) => "- ",
                                (true, false) => "+ ",
                                (false, _) => "  ",
                            };
                            format!("{}{}{}", "  ".repeat(i.depth), marker, i.document.name())
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                },
            );
        }
        Command::Reserved(args) => {
            let results: Vec<(String, bool)> = args
                .paths
                .into_iter()
                .map(|p| {
                    let reserved = wiki.is_reserved_path(&p);
                    (p, reserved)
                })
                .collect();
            out.emit(
                Value::Array(
                    results
                        .iter()
                        .map(|(p, r)| json!({ "path": p, "reserved": r }))
                        .collect(),
                ),
                || {
                    results
                        .iter()
                        .map(|(p, r)| format!("{}\t{}", p, if *r { "reserved" } else { "free" }))
                        .collect::<Vec<_>>()
                        .join("\n")
                },
            );
        }
    }
    Ok(())
}

struct Output(OutputFormat);

impl Output {
    fn emit(&self, value: Value, text: impl FnOnce() -> String) {
        match self.0 {
            OutputFormat::Json => println!("{}", value),
            OutputFormat::Text => {
                let text = text();
                if !text.is_empty() {
                    println!("{}", text);
                }
            }
        }
    }

    fn commit(&self, commit: &Commit) {
        self.emit(commit_json(commit), || commit_line(commit));
    }
}

fn read_input(file: Option<&PathBuf>) -> Result<Vec<u8>> {
    match file {
        Some(path) => std::fs::read(path).map_err(|e| Error::io(path, e)),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|e| Error::io("<stdin>", e))?;
            Ok(buf)
        }
    }
}

fn format_time(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn commit_line(commit: &Commit) -> String {
    format!(
        "{}  {}  {}  {}",
        commit.sha.short(),
        format_time(commit.time),
        commit.author.name,
        commit.message.lines().next().unwrap_or("")
    )
}

fn commit_json(commit: &Commit) -> Value {
    json!({
        "sha": commit.sha.as_str(),
        "message": commit.message,
        "author": { "name": commit.author.name, "email": commit.author.email },
        "date": format_time(commit.time),
        "time": commit.time,
        "parent": commit.parent.as_ref().map(Revision::as_str),
    })
}
