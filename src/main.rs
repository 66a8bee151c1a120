use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::io::Write;
use tracing::info;

use davmount::{config::Config, Props, WebDavSession};

fn cli() -> Command {
    let path_arg = || {
        Arg::new("path")
            .help("Path relative to the WebDAV URL")
            .required(true)
            .index(1)
    };

    Command::new("davmount")
        .about("Browse a WebDAV collection as a read-oriented filesystem")
        .subcommand_required(true)
        .arg(
            Arg::new("url")
                .help("WebDAV collection URL (defaults to DAVMOUNT_URL)")
                .long("url")
                .global(true),
        )
        .arg(
            Arg::new("username")
                .help("Basic auth username (defaults to DAVMOUNT_USERNAME)")
                .long("username")
                .short('u')
                .global(true),
        )
        .arg(
            Arg::new("password")
                .help("Basic auth password (defaults to DAVMOUNT_PASSWORD)")
                .long("password")
                .short('p')
                .global(true),
        )
        .subcommand(
            Command::new("stat")
                .about("Show metadata of a resource")
                .arg(path_arg())
                .arg(
                    Arg::new("json")
                        .help("Print the metadata as JSON")
                        .long("json")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("ls").about("List a collection").arg(path_arg()))
        .subcommand(
            Command::new("cat")
                .about("Write a byte range of a file to stdout")
                .arg(path_arg())
                .arg(
                    Arg::new("start")
                        .long("start")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("0"),
                )
                .arg(
                    Arg::new("end")
                        .help("Exclusive end offset (defaults to the file size)")
                        .long("end")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(Command::new("rm").about("Delete a resource").arg(path_arg()))
        .subcommand(
            Command::new("mv")
                .about("Move a resource without overwriting the destination")
                .arg(Arg::new("src").required(true).index(1))
                .arg(Arg::new("dest").required(true).index(2)),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,davmount=info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    let mut env_config = Config::from_env()?;
    if let Some(username) = matches.get_one::<String>("username") {
        env_config.dav_username = Some(username.clone());
    }
    if let Some(password) = matches.get_one::<String>("password") {
        env_config.dav_password = Some(password.clone());
    }
    let config = env_config.webdav_config(matches.get_one::<String>("url").map(String::as_str))?;

    info!("Connecting to {}", config.server_url);
    let mut session = WebDavSession::new(config)?;

    match matches.subcommand() {
        Some(("stat", args)) => {
            let path = required(args, "path")?;
            let props = session.stat(path).await?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&props)?);
            } else {
                print_props(path, &props);
            }
        }
        Some(("ls", args)) => {
            for name in session.list_directory(required(args, "path")?).await? {
                println!("{}", name);
            }
        }
        Some(("cat", args)) => {
            let path = required(args, "path")?;
            let start = args.get_one::<u64>("start").copied().unwrap_or(0);
            let end = match args.get_one::<u64>("end") {
                Some(end) => *end,
                None => session.stat(path).await?.size,
            };
            let data = session.read(path, start, end).await?;
            std::io::stdout()
                .write_all(&data)
                .context("Failed to write to stdout")?;
        }
        Some(("rm", args)) => {
            session.delete(required(args, "path")?).await?;
        }
        Some(("mv", args)) => {
            session
                .move_resource(required(args, "src")?, required(args, "dest")?)
                .await?;
        }
        _ => unreachable!("clap enforces a subcommand"),
    }

    Ok(())
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing argument '{}'", name))
}

fn print_props(path: &str, props: &Props) {
    println!("  File: {}", path);
    println!("  Type: {:?}", props.kind);
    println!("  Mode: {:o}", props.mode());
    println!("  Size: {}\tBlocks: {}\tIO Block: {}", props.size, props.blocks, props.blksize);
    println!(" Links: {}", props.nlink);
    println!("Modify: {}", props.mtime_secs());
}
