//! Process launcher
//!
//! Starts the page server as a child process, announces the network URL
//! and opens the default browser once the server has had time to bind.

use devtalk_core::Config;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};

/// Address used to pick the outbound interface; nothing is sent
const PROBE_ADDR: &str = "10.255.255.255:1";

/// Run the launcher until the server exits or Ctrl+C is pressed
pub async fn run(config: &Config, config_path: Option<&Path>) -> anyhow::Result<()> {
    let port = config.server.port;
    let ip = local_ip();

    println!("Starting DevTalk application...");
    println!(
        "To access from other devices on your network, use: {}",
        network_url(ip, port)
    );

    let mut child = spawn_server(config_path)?;

    let browser = config.launcher.open_browser.then(|| {
        let delay = Duration::from_secs(config.launcher.startup_delay_secs);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let url = browser_url(port);
            if let Err(e) = open_browser(&url) {
                tracing::warn!("Failed to open browser at {}: {}", url, e);
            }
        })
    });

    let exited = tokio::select! {
        status = child.wait() => Some(status?),
        _ = tokio::signal::ctrl_c() => None,
    };

    if let Some(handle) = browser {
        handle.abort();
    }

    match exited {
        Some(status) => check_exit(status),
        None => {
            println!("Shutting down...");
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to stop server process: {}", e);
            }
            Ok(())
        }
    }
}

/// Spawn the current executable in server mode
fn spawn_server(config_path: Option<&Path>) -> anyhow::Result<Child> {
    let exe = std::env::current_exe()
        .map_err(|e| anyhow::anyhow!("Failed to locate current executable: {}", e))?;

    let child = Command::new(&exe)
        .args(server_args(config_path))
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| anyhow::anyhow!("Failed to start server process {}: {}", exe.display(), e))?;

    tracing::debug!("Server process started: pid={:?}", child.id());
    Ok(child)
}

/// Arguments passed to the server child process
fn server_args(config_path: Option<&Path>) -> Vec<String> {
    let mut args = vec!["--serve".to_string()];
    if let Some(path) = config_path {
        args.push("--config".to_string());
        args.push(path.display().to_string());
    }
    args
}

fn check_exit(status: ExitStatus) -> anyhow::Result<()> {
    if status.success() {
        Ok(())
    } else {
        anyhow::bail!("Server process exited with {}", status)
    }
}

/// LAN IPv4 address of this machine, or loopback when it can't be determined
pub fn local_ip() -> IpAddr {
    probe_local_ip().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn probe_local_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(PROBE_ADDR)?;
    let ip = socket.local_addr()?.ip();
    if ip.is_unspecified() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "no outbound interface",
        ));
    }
    Ok(ip)
}

/// URL announced for other devices on the network
pub fn network_url(ip: IpAddr, port: u16) -> String {
    format!("http://{}:{}", ip, port)
}

/// URL opened in the local browser
pub fn browser_url(port: u16) -> String {
    format!("http://localhost:{}", port)
}

fn open_browser(url: &str) -> std::io::Result<()> {
    if !is_safe_url(url) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("refusing to open non-http URL: {}", url),
        ));
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", url])
            .spawn()?;
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }
    #[cfg(all(not(target_os = "windows"), not(target_os = "macos")))]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }
    Ok(())
}

fn is_safe_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.scheme() == "http" || parsed.scheme() == "https",
        Err(_) => false,
    }
}
