use chaptersearch::core::config::Config;
use chaptersearch::core::error::{Error, Result};
use chaptersearch::indexing::fetch::{parse_page_url, CurrentPage};
use chaptersearch::ui::cli::{parse_chapter_arg, Cli, Commands, RegistryArgs};
use chaptersearch::{
    export_chapters, ChapterDescriptor, ChapterRegistry, Extractor, HandoffOutcome, HandoffStore, NavigationHandoff,
    QueryController, SearchSession, SiteNavigator, StaticPage,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "chaptersearch=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::new(cli.base_dir.as_deref().map(PathBuf::from))?;

    match cli.command {
        Commands::Init => handle_init(&config)?,
        Commands::Chapters { site } => handle_chapters(&site)?,
        Commands::Export { site, out_dir } => handle_export(&config, &site, &out_dir)?,
        Commands::Search { page, query, registry, html } => {
            handle_search(&config, &page, &query, &registry, html).await?
        }
        Commands::Goto { page, query, target } => handle_goto(&config, &page, &query, &target).await?,
        Commands::Resume { page } => handle_resume(&config, &page).await?,
        Commands::Interactive { page, registry } => handle_interactive(&config, &page, &registry).await?,
    }

    Ok(())
}

fn handle_init(config: &Config) -> Result<()> {
    if config.is_initialized() {
        println!("chaptersearch is already initialized at: {:?}", config.base_dir);
        return Ok(());
    }

    config.init()?;
    println!("✓ Created configuration directory: {:?}", config.base_dir);
    println!("✓ Created session directory: {:?}", config.session_dir);
    println!("  Optional settings file: {:?}", config.settings_path);
    Ok(())
}

fn handle_chapters(site: &str) -> Result<()> {
    let registry = ChapterRegistry::discover(Path::new(site))?;
    if registry.is_empty() {
        println!("No chapter pages found in {}", site);
        return Ok(());
    }
    for (i, chapter) in registry.chapters().iter().enumerate() {
        println!("{:>3}. {:<20} {}", i + 1, chapter.id, chapter.title);
    }
    Ok(())
}

fn handle_export(config: &Config, site: &str, out_dir: &str) -> Result<()> {
    let settings = config.load_settings()?;
    let site_dir = Path::new(site);
    let registry = ChapterRegistry::discover(site_dir)?;
    let exported = export_chapters(
        &registry,
        site_dir,
        Path::new(out_dir),
        &Extractor::from_settings(&settings),
    )?;

    for chapter in &exported {
        println!("Wrote {} chars -> {}", chapter.chars, chapter.path.display());
    }
    println!("✓ Exported {} of {} chapters", exported.len(), registry.len());
    Ok(())
}

async fn handle_search(
    config: &Config,
    page: &str,
    query: &str,
    registry_args: &RegistryArgs,
    html: bool,
) -> Result<()> {
    let session = open_session(config, page, registry_args).await?;
    let view = session.run_query(query).await;

    if html {
        print!("{}", view.to_html());
    } else {
        print!("{}", view);
    }
    Ok(())
}

async fn handle_goto(config: &Config, page: &str, query: &str, target: &str) -> Result<()> {
    let current = parse_page_url(page)?;
    let handoff = open_handoff(config)?;
    let destination = handoff.persist_and_navigate(query, target, &SiteNavigator::new(current))?;
    println!("→ {}", destination);

    // A full navigation: the destination loads as a fresh page and resumes
    resume_on(config, &handoff, destination).await
}

async fn handle_resume(config: &Config, page: &str) -> Result<()> {
    let handoff = open_handoff(config)?;
    resume_on(config, &handoff, parse_page_url(page)?).await
}

async fn handle_interactive(config: &Config, page: &str, registry_args: &RegistryArgs) -> Result<()> {
    let session = Arc::new(open_session(config, page, registry_args).await?);
    let current_url = parse_page_url(page)?;
    let controller = QueryController::new(session.clone());
    let handoff = open_handoff(config)?;

    let mut views = controller.subscribe();
    let printer = tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            println!("\n{}", view);
        }
    });

    controller.open();
    println!("Type a query (`:go N` opens result N, `:q` quits)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_query: Option<String> = None;
    let mut interrupted = false;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        if line == ":q" {
            controller.escape();
            interrupted = true;
            break;
        }
        if let Some(n) = line.strip_prefix(":go ") {
            let view = controller.current_view();
            let entry = n
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| view.entries.get(i));
            match entry {
                Some(entry) => {
                    let destination = handoff.persist_and_navigate(
                        &view.query,
                        &entry.document_id,
                        &SiteNavigator::new(current_url.clone()),
                    )?;
                    println!("→ {}", destination);
                    controller.close();
                    resume_on(config, &handoff, destination).await?;
                    interrupted = true;
                    break;
                }
                None => println!("No such result: {}", n.trim()),
            }
            continue;
        }
        controller.on_input(line);
        last_query = Some(line.trim().to_string());
    }

    if interrupted {
        printer.abort();
        return Ok(());
    }

    // Input ran out (piped stdin): let the last debounced search publish
    if let Some(query) = last_query {
        controller.wait_settled(&query).await;
    }
    // The printer ends once every sender clone is gone and the last view is printed
    drop(controller);
    let _ = printer.await;
    Ok(())
}

async fn open_session(config: &Config, page: &str, registry_args: &RegistryArgs) -> Result<SearchSession> {
    let settings = config.load_settings()?;
    let url = parse_page_url(page)?;
    let registry = resolve_registry(registry_args, &url)?;
    let current = CurrentPage::open(url).await?;
    Ok(SearchSession::for_page(registry, current, settings))
}

fn open_handoff(config: &Config) -> Result<NavigationHandoff> {
    let settings = config.load_settings()?;
    Ok(NavigationHandoff::new(HandoffStore::open(config)?, &settings))
}

async fn resume_on(config: &Config, handoff: &NavigationHandoff, url: Url) -> Result<()> {
    let settings = config.load_settings()?;
    let page = CurrentPage::open(url).await?;
    let surface = Arc::new(StaticPage::from_html(&page.html, &Extractor::from_settings(&settings))?);

    match handoff.resume_if_pending(surface.clone()).await? {
        HandoffOutcome::Found { leaf, offset } => {
            println!("Scrolled to match in {} at position {}:", page.id, offset);
            println!("  {}", surface.leaf(leaf).unwrap_or_default());
        }
        HandoffOutcome::Miss | HandoffOutcome::NotPending => {}
    }
    Ok(())
}

fn resolve_registry(args: &RegistryArgs, page: &Url) -> Result<ChapterRegistry> {
    if !args.chapters.is_empty() {
        let chapters = args
            .chapters
            .iter()
            .map(|raw| {
                parse_chapter_arg(raw)
                    .map(|(id, title)| ChapterDescriptor::new(id, title))
                    .ok_or_else(|| Error::Config(format!("Invalid chapter argument: {}", raw)))
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(ChapterRegistry::new(chapters));
    }

    if let Some(site) = &args.site {
        return ChapterRegistry::discover(Path::new(site));
    }

    let site_dir = page
        .to_file_path()
        .ok()
        .and_then(|path| path.parent().map(Path::to_path_buf))
        .ok_or_else(|| {
            Error::Config("Pass --site or --chapter for pages served over HTTP".to_string())
        })?;
    ChapterRegistry::discover(&site_dir)
}
