use pacm::cli::PacmCli;
use pacm::colors::*;

fn main() {
    let cli = PacmCli::parse();
    if let Err(err) = cli.run() {
        eprintln!(
            "{C_GRAY}[pacm]{C_RESET} {C_RED}error{C_RESET} {} {err}",
            err.tag()
        );
        std::process::exit(1);
    }
}
