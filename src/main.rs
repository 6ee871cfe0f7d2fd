mod cli;
mod commands;
mod config;
mod elastic;
mod env_loader;
mod error;
mod feed;
mod fsdb;

fn main() {
    env_loader::load_dotenv();

    if let Err(err) = cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
