use std::path::PathBuf;
use std::process;

use log::debug;
use smtp_tester::config::Config;
use structopt::StructOpt;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let opt = Opt::from_args();
    println!("smtp-tester v{}", env!("CARGO_PKG_VERSION"));

    let code = run(&opt).await;

    if opt.wait {
        wait_for_enter().await;
    }
    process::exit(code);
}

async fn run(opt: &Opt) -> i32 {
    let config = match Config::load(&opt.config).await {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return 2;
        }
    };
    debug!("{:?}", config.connection);

    match smtp_tester::send(&config.connection, &config.message).await {
        Ok(()) => {
            println!("E-mail has been successfully sent");
            0
        }
        Err(err) => {
            eprintln!("errSMTP: {}", err);
            if err.message_may_have_been_delivered() {
                eprintln!("the server had already accepted the message, it was probably delivered");
            }
            1
        }
    }
}

async fn wait_for_enter() {
    println!("Press Enter to exit");
    let mut line = String::new();
    if let Err(err) = BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
        debug!("stdin: {}", err);
    }
}

#[derive(StructOpt, Debug)]
#[structopt(name = "smtp-tester")]
struct Opt {
    /// YAML file with the server settings and the message
    #[structopt(
        short = "c",
        long = "config",
        parse(from_os_str),
        default_value = "config.yaml"
    )]
    config: PathBuf,

    /// Wait for Enter before exiting
    #[structopt(long = "wait")]
    wait: bool,
}
