fn main() {
    if let Err(err) = mermaid_live::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
