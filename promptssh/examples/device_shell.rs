//! Log in to a device, run a few commands, optionally push a file and
//! rotate the password.
//!
//! # Prerequisites
//!
//! - `ssh` and `scp` on the PATH
//! - A device (or any SSH server) accepting password authentication
//!
//! # Usage
//!
//! ```bash
//! cargo run --example device_shell -- --host 192.168.1.1 --password secret
//! cargo run --example device_shell -- --host 192.168.1.1 --password secret \
//!     --copy ./firmware.bin --to /tmp
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use promptssh::RemoteSession;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let Some(password) = args.password.clone() else {
        eprintln!("Error: --password is required");
        std::process::exit(1);
    };

    let mut session = RemoteSession::builder(&args.host)
        .port(args.port)
        .username(&args.user)
        .password(password)
        .timeout(Duration::from_secs(args.timeout))
        .build()?;

    if let Some(file) = &args.copy {
        println!("Copying {} to {}:{}...", file.display(), args.host, args.to);
        session
            .copy_file(file, &args.to, Duration::from_secs(60))
            .await?;
        println!("Copy complete");
    }

    println!("Logging in to {}:{}...", args.host, args.port);
    let mut guard = session.enter().await?;
    println!("Logged in!");

    for command in ["uname -a", "uptime", "df -h"] {
        println!("\nExecuting: {}", command);
        println!("{}", "-".repeat(50));
        let response = guard.execute(command).await?;
        println!("{}", response.result);
        println!("{}", "-".repeat(50));
        println!("Completed in {:?}", response.elapsed);
    }

    if let Some(new_password) = &args.new_password {
        println!("\nChanging password...");
        let change = guard.set_password(new_password).await?;
        if change.completed {
            println!("Password changed ({} prompts answered)", change.prompts_answered);
        } else {
            eprintln!("Password change did not complete:\n{}", change.output);
        }
    }

    // Dropping the guard closes the session
    drop(guard);
    println!("\nDone!");

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    new_password: Option<String>,
    copy: Option<PathBuf>,
    to: String,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            host: "localhost".to_string(),
            port: 22,
            user: "root".to_string(),
            password: None,
            new_password: None,
            copy: None,
            to: "/tmp".to_string(),
            timeout: 5,
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--host" | "-h" => parsed.host = value.unwrap_or(parsed.host),
                "--port" | "-p" => {
                    parsed.port = value.and_then(|v| v.parse().ok()).unwrap_or(22)
                }
                "--user" | "-u" => parsed.user = value.unwrap_or(parsed.user),
                "--password" | "-P" => parsed.password = value,
                "--new-password" => parsed.new_password = value,
                "--copy" => parsed.copy = value.map(PathBuf::from),
                "--to" => parsed.to = value.unwrap_or(parsed.to),
                "--timeout" | "-t" => {
                    parsed.timeout = value.and_then(|v| v.parse().ok()).unwrap_or(5)
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {}", other);
                    i += 1;
                    continue;
                }
            }
            i += 2;
        }

        parsed
    }

    fn print_help() {
        println!(
            r#"promptssh device_shell example

USAGE:
    cargo run --example device_shell -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>         Target host [default: localhost]
    -p, --port <PORT>         SSH port [default: 22]
    -u, --user <USER>         Username [default: root]
    -P, --password <PASS>     Login password
    --new-password <PASS>     Change the password after running commands
    --copy <FILE>             Copy a local file to the device first
    --to <DIR>                Remote directory for --copy [default: /tmp]
    -t, --timeout <SECS>      Prompt timeout [default: 5]
    --help                    Print this help message
"#
        );
    }
}
