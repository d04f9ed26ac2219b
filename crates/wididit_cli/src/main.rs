//! Wididit CLI
//!
//! Command-line client for Wididit servers.
//!
//! # Commands
//!
//! - `whoami` - Show who the server thinks you are
//! - `user show` / `user set-bio` - Read a profile, edit your biography
//! - `entry show` / `entry post` / `entry list` - Read, write and search entries

mod commands;

use clap::{Parser, Subcommand};
use commands::entry::ListOptions;
use commands::Session;
use tracing_subscriber::EnvFilter;
use wididit_core::{Config, Wididit};

/// Wididit command-line client.
#[derive(Parser)]
#[command(name = "wididit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Hostname of your Wididit server
    #[arg(global = true, long, env = "WIDIDIT_HOST")]
    host: Option<String>,

    /// Username to authenticate as
    #[arg(global = true, short, long, env = "WIDIDIT_USER")]
    user: Option<String>,

    /// Password of that user
    #[arg(global = true, short, long, env = "WIDIDIT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// API base URL template, `{hostname}` is replaced by the host
    #[arg(global = true, long, env = "WIDIDIT_API_BASE")]
    api_base: Option<String>,

    /// API path below the host, when not served at `/api/json`
    #[arg(global = true, long, env = "WIDIDIT_API_PATH")]
    api_path: Option<String>,

    /// Output format (text, json)
    #[arg(global = true, short, long, default_value = "text")]
    format: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show who the server thinks you are
    Whoami,

    /// Read and edit users
    #[command(subcommand)]
    User(UserCommand),

    /// Read, write and search entries
    #[command(subcommand)]
    Entry(EntryCommand),

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum UserCommand {
    /// Show a user's profile
    Show {
        /// `username@hostname`, or a username on --host
        userid: String,
    },

    /// Change your biography
    SetBio {
        /// New biography
        text: String,
    },
}

#[derive(Subcommand)]
enum EntryCommand {
    /// Show one entry
    Show {
        /// Author, `username@hostname` or a username on --host
        userid: String,

        /// Entry id
        id: u64,
    },

    /// Publish an entry as yourself
    Post {
        /// Title
        #[arg(short, long, default_value = "")]
        title: String,

        /// Content
        #[arg(short, long)]
        content: String,
    },

    /// List entries of --host
    List {
        /// Only entries by this author (repeatable)
        #[arg(short, long)]
        author: Vec<String>,

        /// Only entries containing this text (repeatable)
        #[arg(short, long)]
        content: Vec<String>,

        /// List your timeline instead of every entry
        #[arg(long)]
        timeline: bool,

        /// Leave out entries written by their authors
        #[arg(long)]
        no_native: bool,

        /// Include entries shared by other users
        #[arg(long)]
        shared: bool,
    },
}

fn client_config(api_base: Option<String>, api_path: Option<String>) -> Config {
    let mut config = Config::default()
        .with_user_agent(format!("wididit-cli/{}", env!("CARGO_PKG_VERSION")));
    if let Some(path) = api_path {
        config = config.with_api_path(path);
    }
    if let Some(base) = api_base {
        config = config.with_api_base(base);
    }
    config
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("Wididit CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Wididit Core v{}", wididit_core::VERSION);
        return Ok(());
    }

    let host = cli.host.ok_or("Server hostname required (--host or WIDIDIT_HOST)")?;
    let config = client_config(cli.api_base, cli.api_path);
    let wididit = Wididit::with_reqwest(config)?;
    let session = Session::open(
        &wididit,
        &host,
        cli.user.as_deref(),
        cli.password.as_deref(),
    )?;

    let format = cli.format.as_str();
    let mut out = std::io::stdout().lock();
    match cli.command {
        Commands::Whoami => commands::whoami::run(&session, format, &mut out)?,
        Commands::User(UserCommand::Show { userid }) => {
            commands::user::show(&session, &userid, format, &mut out)?;
        }
        Commands::User(UserCommand::SetBio { text }) => {
            commands::user::set_bio(&session, &text, format, &mut out)?;
        }
        Commands::Entry(EntryCommand::Show { userid, id }) => {
            commands::entry::show(&session, &userid, id, format, &mut out)?;
        }
        Commands::Entry(EntryCommand::Post { title, content }) => {
            commands::entry::post(&session, &title, &content, format, &mut out)?;
        }
        Commands::Entry(EntryCommand::List {
            author,
            content,
            timeline,
            no_native,
            shared,
        }) => {
            let options = ListOptions {
                authors: author,
                contents: content,
                timeline,
                native: !no_native,
                shared,
            };
            commands::entry::list(&session, &options, format, &mut out)?;
        }
        Commands::Version => {}
    }

    Ok(())
}
