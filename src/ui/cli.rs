use clap::{Args, Parser, Subcommand};

/// chaptersearch - Full-text search across the chapters of a static course site
#[derive(Parser, Debug)]
#[command(name = "chaptersearch")]
#[command(about = "Cross-document full-text search for static multi-page course sites", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Custom base directory (default: ~/.chaptersearch)
    #[arg(long, global = true)]
    pub base_dir: Option<String>,
}

/// Where the chapter list comes from
#[derive(Args, Debug, Clone, Default)]
pub struct RegistryArgs {
    /// Local site directory to discover chapter pages in
    #[arg(long)]
    pub site: Option<String>,

    /// Explicit chapter as ID=TITLE, in reading order (repeatable)
    #[arg(long = "chapter", value_name = "ID=TITLE")]
    pub chapters: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the configuration and session directories
    Init,
    /// List the chapters of a local site in reading order
    Chapters {
        /// Path to the site directory
        site: String,
    },
    /// Write each chapter's article text to `<chapter>_tekst.txt`
    Export {
        /// Path to the site directory
        site: String,
        /// Directory to write the text files into
        out_dir: String,
    },
    /// Search every chapter from the given page
    Search {
        /// Page the reader has open (URL or local path)
        page: String,
        /// Search query
        query: String,
        #[command(flatten)]
        registry: RegistryArgs,
        /// Print the results as HTML
        #[arg(long)]
        html: bool,
    },
    /// Jump to a chapter, scrolling to the first occurrence of the query there
    Goto {
        /// Page the reader has open (URL or local path)
        page: String,
        /// Query to carry over
        query: String,
        /// Target chapter id, e.g. kapitel4.html
        target: String,
    },
    /// Resume a pending jump on the given page
    Resume {
        /// Page that was navigated to (URL or local path)
        page: String,
    },
    /// Type queries line by line; `:go N` jumps to result N, `:q` quits
    Interactive {
        /// Page the reader has open (URL or local path)
        page: String,
        #[command(flatten)]
        registry: RegistryArgs,
    },
}

/// Split an `ID=TITLE` chapter argument
pub fn parse_chapter_arg(raw: &str) -> Option<(String, String)> {
    let (id, title) = raw.split_once('=')?;
    let (id, title) = (id.trim(), title.trim());
    if id.is_empty() {
        return None;
    }
    let title = if title.is_empty() { id } else { title };
    Some((id.to_string(), title.to_string()))
}
