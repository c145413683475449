mod view;

use agisfl_core::telemetry::init_logging;
use agisfl_core::{AgisConfig, AgisFl, BackendApi, ShellChannel, ShellEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use view::{parse_command, Renderer};

/// Forward stdin lines to the shell channel as menu commands
fn spawn_command_reader(shell: ShellChannel) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_command(&line) {
                Some(channel) => {
                    if shell.send_channel(&channel).is_none() {
                        println!("unknown command: {}", line.trim());
                    }
                }
                None if line.trim().is_empty() => {}
                None => println!("commands: go <view> | theme | reload | quit"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    init_logging()?;

    info!(target: "agisfl_monitor", "Starting AgisFL monitor");

    let config = AgisConfig::load();
    let api = BackendApi::new(&config.api_base, config.request_timeout())?;

    let mut app = AgisFl::new(config);
    app.start().await?;

    let mut renderer = Renderer::new(app.theme.theme());
    match api.dashboard().await {
        Ok(snapshot) => {
            for line in renderer.snapshot_lines(&snapshot) {
                println!("{}", line);
            }
        }
        Err(e) => warn!(target: "agisfl_monitor", error = %e, "Dashboard snapshot unavailable"),
    }

    let mut shell_rx = app.shell.subscribe();
    spawn_command_reader(app.shell.clone());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    'session: loop {
        let Some(stream) = app.stream() else {
            break;
        };
        let mut status_rx = stream.subscribe_status();
        let mut payload_rx = stream.subscribe_payload();

        loop {
            tokio::select! {
                Ok(()) = status_rx.changed() => {
                    let status = status_rx.borrow_and_update().clone();
                    println!("{}", renderer.status_line(&status));
                }
                Ok(()) = payload_rx.changed() => {
                    let payload = payload_rx.borrow_and_update().clone();
                    if let Some(line) = payload.as_ref().and_then(|p| renderer.feed_line(p)) {
                        println!("{}", line);
                    }
                }
                event = shell_rx.recv() => match event {
                    Ok(ShellEvent::Quit) => break 'session,
                    Ok(ShellEvent::Navigate(view)) => println!("{}", renderer.navigate(view)),
                    Ok(ShellEvent::ToggleTheme) => {
                        if let Err(e) = app.theme.toggle() {
                            warn!(target: "agisfl_monitor", error = %e, "Failed to save theme");
                        }
                        renderer.set_theme(app.theme.theme());
                        println!("theme: {}", app.theme.theme().as_str());
                    }
                    Ok(ShellEvent::Reload) => {
                        info!(target: "agisfl_monitor", "Reloading live feed");
                        app.reload().await?;
                        continue 'session;
                    }
                    Err(e) => {
                        warn!(target: "agisfl_monitor", error = %e, "Shell channel error");
                    }
                },
                _ = &mut ctrl_c => {
                    info!(target: "agisfl_monitor", "Interrupted");
                    break 'session;
                }
            }
        }
    }

    app.shutdown().await?;
    Ok(())
}
