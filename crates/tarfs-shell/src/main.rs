use std::io;

use anyhow::{Context, Result};
use tarfs_core::VirtualFileSystem;
use tarfs_shell::{load_config, ActionLog, Cli, Flow, Parser, Shell};
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.level())
        .with_writer(io::stderr)
        .init();

    let mut config = load_config(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    let vfs = VirtualFileSystem::open(&config.archive, config.vfs.clone())
        .with_context(|| format!("failed to mount {}", config.archive.display()))?;
    info!("Mounted {} under /{}", config.archive.display(), vfs.home());

    let stdout = io::stdout();
    let mut shell = Shell::new(vfs, config.user.as_str(), config.host.as_str(), stdout.lock());
    if let Some(path) = &config.log_file {
        let log = ActionLog::open(path)
            .with_context(|| format!("failed to open action log {}", path.display()))?;
        shell = shell.with_action_log(log);
    }

    if let Some(script) = &config.startup_script {
        if shell.run_script(script)? == Flow::Exit {
            return Ok(());
        }
    }

    shell.run(io::stdin().lock())
}
