use clap::Parser;
use javelin_cli::CliArgs;

fn main() {
    let args = CliArgs::parse();
    match javelin_cli::compile(&args) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("javelin: {err:#}");
            std::process::exit(2);
        }
    }
}
