use clap::{CommandFactory, Parser};
use clap_complete::env::CompleteEnv;
use rcon_cli::{Cli, Runtime};

#[tokio::main]
async fn main() {
  // Answers `COMPLETE=<shell> rcon-cli ...` requests and exits.
  CompleteEnv::with_factory(Cli::command).complete();

  let cli = Cli::parse();
  let exit_code = Runtime::new(cli).execute().await;
  std::process::exit(exit_code);
}
