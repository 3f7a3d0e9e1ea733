fn main() {
    if let Err(error) = branchsweep_cli::run() {
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}
