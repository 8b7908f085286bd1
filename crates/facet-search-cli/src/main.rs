#![forbid(unsafe_code)]

fn main() {
    std::process::exit(facet_search_cli::run());
}
