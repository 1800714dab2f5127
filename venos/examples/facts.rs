//! Discover a device and print its facts as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example facts -- --host 192.168.1.10 --user admin --password secret
//! ```
//!
//! With `--nos-only` only the detected family is printed.

use std::env;
use std::time::Duration;

use venos::{DeviceBuilder, Discovery};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut builder = DeviceBuilder::new(&args.host)
        .user(&args.user)
        .password(&args.password)
        .ssh_port(args.ssh_port);

    if let Some(secs) = args.probe_timeout {
        builder = builder.probe_timeout(Duration::from_secs(secs));
    }
    if let Some(family) = &args.family {
        builder = builder.family(family.parse()?);
    }

    match builder.discover(args.nos_only).await? {
        Discovery::Family(family) => println!("{family}"),
        Discovery::Device(mut device) => {
            eprintln!("{}", device.describe());
            if let Some(facts) = device.facts() {
                println!("{}", serde_json::to_string_pretty(facts)?);
            }
            device.close().await?;
        }
    }

    Ok(())
}

/// Simple argument parser
struct Args {
    host: String,
    user: String,
    password: String,
    ssh_port: u16,
    probe_timeout: Option<u64>,
    family: Option<String>,
    nos_only: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = Self {
            host: "localhost".to_string(),
            user: "admin".to_string(),
            password: "admin".to_string(),
            ssh_port: 22,
            probe_timeout: None,
            family: None,
            nos_only: false,
        };

        let mut iter = env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--host" | "-h" => args.host = iter.next().unwrap_or(args.host),
                "--user" | "-u" => args.user = iter.next().unwrap_or(args.user),
                "--password" | "-P" => args.password = iter.next().unwrap_or(args.password),
                "--ssh-port" | "-p" => {
                    args.ssh_port = iter.next().and_then(|v| v.parse().ok()).unwrap_or(22)
                }
                "--probe-timeout" => args.probe_timeout = iter.next().and_then(|v| v.parse().ok()),
                "--family" | "-f" => args.family = iter.next(),
                "--nos-only" => args.nos_only = true,
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                other => eprintln!("Unknown argument: {other}"),
            }
        }

        args
    }

    fn print_help() {
        println!(
            r#"venos facts example

USAGE:
    cargo run --example facts -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>           Target host [default: localhost]
    -u, --user <USER>           Username [default: admin]
    -P, --password <PASS>       Password [default: admin]
    -p, --ssh-port <PORT>       Port the classifier logs in on [default: 22]
    --probe-timeout <SECS>      Override the family's probe timeout
    -f, --family <FAMILY>       Skip classification (nxos, eos, cumulus, ubuntu, centos, opx)
    --nos-only                  Print the detected family and stop
    --help                      Print this help message
"#
        );
    }
}
