//! jenisaver - download YouTube videos and audio through a JeniSaver backend
//!
//! Paste a URL, pick a format, and the backend merges and sends back the file.

use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use jenisaver::core::api::ApiClient;
use jenisaver::core::progress::ProgressChannel;
use jenisaver::core::shell::{DownloadEvents, DownloadOutcome, Notice, Shell};
use jenisaver::core::thumbnail::Thumbnail;
use jenisaver::storage::config;
use jenisaver::storage::session::SessionStore;
use jenisaver::types::{ActiveDownload, AppState, DownloadProgress, FormatChoice, MediaKind, MenuItem, VideoInfo};
use jenisaver::ui::render::{self, DownloadBar};
use jenisaver::ui::selector::{create_selector, find_format, format_menu};
use jenisaver::utils::paths::{ensure_app_dirs, expand_home, get_session_path};

/// Download YouTube videos and audio through a JeniSaver backend.
#[derive(Parser, Debug)]
#[command(name = "jenisaver")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Video URL (prompted for when omitted)
    url: Option<String>,

    /// List audio-only formats
    #[arg(short, long)]
    audio: bool,

    /// Download the format with this itag without asking
    #[arg(long)]
    itag: Option<u32>,

    /// Directory to save downloads in
    #[arg(short, long)]
    output: Option<String>,

    /// Backend origin
    #[arg(long)]
    api: Option<String>,

    /// Push channel origin (defaults to the backend origin)
    #[arg(long)]
    socket: Option<String>,

    /// Print video information and formats, then exit
    #[arg(short, long)]
    info: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Edit the configuration file
    #[arg(short, long)]
    edit: bool,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "jenisaver=info",
        _ => "jenisaver=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Open the push channel and remember its session id for merge requests
async fn connect_progress(origin: &str, sessions: &SessionStore) -> Option<ProgressChannel> {
    match ProgressChannel::connect(origin).await {
        Ok(channel) => {
            if let Err(e) = sessions.save(&channel.session_id()).await {
                warn!("Could not store session id: {}", e);
            }
            Some(channel)
        }
        Err(e) => {
            warn!("Live progress unavailable: {}", e);
            None
        }
    }
}

/// Where to go when the lookup fails: ask again unless the URL came from the command line
fn after_lookup_failure(cli: &Cli) -> AppState {
    if cli.url.is_some() {
        AppState::Exit
    } else {
        AppState::Init
    }
}

/// Where to go once a download has ended
fn after_download(cli: &Cli) -> AppState {
    if cli.itag.is_some() {
        AppState::Exit
    } else if cli.audio {
        AppState::SelectFormat(MediaKind::Audio)
    } else {
        AppState::SelectKind
    }
}

fn print_formats(info: &VideoInfo) {
    for (kind, heading) in [(MediaKind::Video, "Video"), (MediaKind::Audio, "Audio Only")] {
        println!("{}", heading.bold());
        for item in format_menu(info, kind) {
            println!("  {:>4}  {}", item.value.itag, item.label);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Ensure app directories exist
    ensure_app_dirs().await?;

    // Handle --edit flag
    if cli.edit {
        let cfg = config::load_config().await?;
        config::edit_config(&cfg.editor).await?;
        return Ok(());
    }

    // Load config, flags take precedence
    let mut cfg = config::load_config().await?;
    if let Some(api) = &cli.api {
        cfg.api_url = api.clone();
    }
    if let Some(socket) = &cli.socket {
        cfg.socket_url = Some(socket.clone());
    }
    if let Some(output) = &cli.output {
        cfg.download_dir = expand_home(output);
    }

    let backend = ApiClient::new(&cfg.api_url)?;
    let sessions = SessionStore::new(&get_session_path());
    let selector = create_selector(cfg.selector);
    let mut shell = Shell::new(&cfg.download_dir, Duration::from_secs(cfg.display_delay_secs));

    // Live progress for the whole session
    let channel = if cli.info {
        None
    } else {
        connect_progress(cfg.push_origin(), &sessions).await
    };

    let mut state = match &cli.url {
        Some(url) => {
            shell.set_url(url.as_str());
            AppState::FetchInfo
        }
        None => AppState::Init,
    };
    let mut choice: Option<FormatChoice> = None;

    while state != AppState::Exit {
        match state {
            AppState::Init => {
                let input: String = dialoguer::Input::new()
                    .with_prompt("Paste YouTube URL")
                    .allow_empty(true)
                    .interact_text()?;
                shell.set_url(input);
                state = AppState::FetchInfo;
            }

            AppState::FetchInfo => {
                let spinner = render::loading_spinner("Loading video information...");
                let result = shell.fetch_video_info(&backend).await;
                spinner.finish_and_clear();

                if let Err(notice) = result {
                    render::print_notice(notice);
                    state = after_lookup_failure(&cli);
                    continue;
                }
                let Some(info) = shell.video_info() else {
                    state = after_lookup_failure(&cli);
                    continue;
                };

                let thumbnail = match Thumbnail::for_video(&info.thumbnail, shell.url()) {
                    Some(thumb) => thumb.resolve(backend.http()).await,
                    None => None,
                };
                render::print_video_info(info, thumbnail.as_deref());

                state = if cli.info {
                    print_formats(info);
                    AppState::Exit
                } else if let Some(itag) = cli.itag {
                    choice = find_format(info, itag, cli.audio.then_some(MediaKind::Audio));
                    if choice.is_none() {
                        eprintln!("{} no format with itag {}", "Error:".red(), itag);
                    }
                    if choice.is_some() { AppState::Download } else { AppState::Exit }
                } else if cli.audio {
                    AppState::SelectFormat(MediaKind::Audio)
                } else {
                    AppState::SelectKind
                };
            }

            AppState::SelectKind => {
                let menu_items = vec![
                    MenuItem { label: "🎬 Video".into(), value: AppState::SelectFormat(MediaKind::Video) },
                    MenuItem { label: "🎵 Audio Only".into(), value: AppState::SelectFormat(MediaKind::Audio) },
                ];

                state = selector.select(&menu_items, "Select Type (Esc to quit)").unwrap_or(AppState::Exit);
            }

            AppState::SelectFormat(kind) => {
                let Some(info) = shell.video_info() else {
                    state = AppState::Exit;
                    continue;
                };

                choice = selector.select_format(info, kind);
                state = if choice.is_some() {
                    AppState::Download
                } else if cli.audio {
                    AppState::Exit
                } else {
                    AppState::SelectKind
                };
            }

            AppState::Download => {
                let (Some(picked), Some(info)) = (choice.as_ref(), shell.video_info()) else {
                    state = AppState::Exit;
                    continue;
                };

                let bar = DownloadBar::new(&ActiveDownload {
                    title: info.title.clone(),
                    quality: picked.quality.clone(),
                    format: picked.kind.label().to_string(),
                });
                let sid = sessions.current_sid(channel.as_ref().map(|c| c.session_id())).await;
                let events = DownloadEvents {
                    updates: channel.as_ref().map(|c| c.subscribe()),
                    interrupt: async {
                        let _ = tokio::signal::ctrl_c().await;
                    },
                    on_progress: |p: &DownloadProgress| bar.update(p),
                };
                println!("{}", "Press Ctrl-C to cancel".dimmed());

                match shell.download(&backend, picked, &sid, events).await {
                    Some(DownloadOutcome::Completed(path)) => {
                        bar.finish();
                        render::print_notice(Notice::DownloadComplete);
                        println!("{} {}", "Saved to".dimmed(), path.display());
                        shell.settle().await;
                    }
                    Some(outcome) => {
                        bar.abandon();
                        render::print_notice(outcome.notice());
                    }
                    None => bar.abandon(),
                }

                state = after_download(&cli);
            }

            AppState::Exit => break,
        }
    }

    if let Some(channel) = channel {
        channel.disconnect().await;
    }

    Ok(())
}
