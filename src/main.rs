use std::process;

fn main() {
    process::exit(wpp::cli::run());
}
