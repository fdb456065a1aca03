use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use serde::Serialize;
use std::path::PathBuf;
use std::process::Stdio;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod actions;
mod app;
mod backend;
mod check;
mod config;
mod hook;
mod keys;
mod switcher;

use actions::Action;
use app::App;
use backend::{BackendClient, Discoverer, Session};
use check::CheckResult;
use config::{Command, Config, Settings};
use hook::Shell;
use switcher::{SwitchFile, SwitchTarget};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Config::parse_args();

    setup_logging(cli.debug);

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        // The hook runs resume before every prompt; a broken config must not spam it
        Err(e) if matches!(cli.command, Some(Command::Resume)) => {
            debug!("Using default settings for resume: {:#}", e);
            let mut settings = Settings::default();
            settings.merge_env();
            settings
        }
        Err(e) => return Err(e),
    };

    match cli.command {
        None => run_picker(&settings).await,
        Some(Command::List { json }) => run_list(&settings, json).await,
        Some(Command::Check { json }) => run_check(&settings, json),
        Some(Command::Attach { name, dir }) => {
            Err(settings.client().exec_attach(&name, dir.as_deref()))
        }
        Some(Command::Kill { name }) => settings.client().kill_session(&name).await,
        Some(Command::Resume) => {
            run_resume(&settings.client(), &SwitchFile::default());
            Ok(())
        }
        Some(Command::InstallHook { remove, shell }) => run_install_hook(remove, shell.as_deref()),
        Some(Command::Version) => {
            println!("zp {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn setup_logging(debug: bool) {
    // stdout belongs to `resume` and `list`, so logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("zp=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_settings(cli: &Config) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_ref())?;
    settings.merge_env();
    settings.merge_cli(cli);
    Ok(settings)
}

/// JSON shape of `zp list --json`
#[derive(Serialize)]
struct ListResult {
    sessions: Vec<Session>,
    count: usize,
}

async fn run_list(settings: &Settings, json: bool) -> Result<()> {
    let sessions = settings.discoverer().discover().await?;

    if json {
        let result = ListResult {
            count: sessions.len(),
            sessions,
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions running");
        return Ok(());
    }

    let keys = settings.key_map();
    let width = sessions.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for (i, session) in sessions.iter().enumerate() {
        println!(
            "{} {:<width$}  {:<6} {:>3}  {}",
            keys.key_for_index(i),
            session.name,
            if session.active() { "active" } else { "idle" },
            session.clients,
            session.started_in,
            width = width,
        );
    }
    Ok(())
}

fn run_check(settings: &Settings, json: bool) -> Result<()> {
    let result = CheckResult::run(&settings.backend);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", result.human());
    }

    if !result.ok() {
        anyhow::bail!("{} not found in PATH", settings.backend);
    }
    Ok(())
}

/// Print the pending switch command, if any. Silent otherwise.
fn run_resume(client: &BackendClient, switch_file: &SwitchFile) {
    let Some(target) = switch_file.take() else {
        return;
    };
    if let Some(line) = target.resume_line(client) {
        println!("{}", line);
    }
}

fn run_install_hook(remove: bool, shell: Option<&str>) -> Result<()> {
    let shell = Shell::detect(shell)?;
    let rc_file = shell.rc_file()?;

    if remove {
        if hook::remove_from(&rc_file)? {
            println!("Removed zpick hook from {}", rc_file.display());
        } else {
            println!("No zpick hook found in {}", rc_file.display());
        }
    } else if hook::install_into(&rc_file, shell)? {
        println!(
            "Added zpick hook to {}; open a new shell or run: source {}",
            rc_file.display(),
            rc_file.display()
        );
    } else {
        println!("zpick hook already present in {}", rc_file.display());
    }
    Ok(())
}

async fn run_picker(settings: &Settings) -> Result<()> {
    let discoverer = settings.discoverer();
    let client = settings.client();
    let cwd = std::env::current_dir().context("Cannot determine current directory")?;

    // Discovery errors surface before the terminal is taken over
    let sessions = discoverer.discover().await?;

    let mut app = App::new(settings.key_map(), cwd);
    app.handle_action(Action::SessionsUpdated(sessions))?;
    debug!("Picker using {:?} key order", app.keys.mode());

    let mut terminal = ratatui::init();
    let result = picker_loop(&mut terminal, &mut app, &discoverer, &client).await;
    ratatui::restore();

    if let Some(target) = result? {
        let switch_file = SwitchFile::default();
        debug!("Handing off to {:?}", switch_file.path());
        switch_file.write(&target)?;
    }
    Ok(())
}

/// Run until the user picks something (Some) or quits (None)
async fn picker_loop(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut App,
    discoverer: &Discoverer,
    client: &BackendClient,
) -> Result<Option<SwitchTarget>> {
    loop {
        for pending_action in app.take_pending_actions() {
            match pending_action {
                Action::Select(target) => return Ok(Some(target)),
                Action::KillSession(name) => {
                    if let Err(e) = client.kill_session(&name).await {
                        app.handle_action(Action::Error(format!("{:#}", e)))?;
                        continue;
                    }
                    match discoverer.discover().await {
                        Ok(sessions) => app.handle_action(Action::SessionsUpdated(sessions))?,
                        Err(e) => app.handle_action(Action::Error(format!("Discovery: {}", e)))?,
                    };
                }
                Action::PickDirectory => {
                    // Hand the terminal to zoxide/fzf
                    ratatui::restore();
                    let picked = pick_directory().await;
                    *terminal = ratatui::init();

                    match picked {
                        Ok(Some(dir)) => {
                            let name = app.new_session_name(&dir);
                            return Ok(Some(SwitchTarget::new_session(name, &dir)));
                        }
                        Ok(None) => {}
                        Err(e) => {
                            app.handle_action(Action::Error(format!("{:#}", e)))?;
                        }
                    }
                }
                _ => {}
            }
        }

        terminal.draw(|f| app.render(f))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && app.handle_action(Action::KeyPress(key))? {
                return Ok(None);
            }
        }
    }
}

/// Interactive `zoxide query -i`; None when the user cancels
async fn pick_directory() -> Result<Option<PathBuf>> {
    which::which("zoxide").context("zoxide is not installed")?;

    let output = tokio::process::Command::new("zoxide")
        .args(["query", "-i"])
        .stdin(Stdio::inherit())
        .stderr(Stdio::inherit())
        .output()
        .await
        .context("Failed to run zoxide")?;

    if !output.status.success() {
        return Ok(None);
    }
    let dir = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!dir.is_empty()).then(|| PathBuf::from(dir)))
}
