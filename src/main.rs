fn main() {
    if let Err(e) = koma::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
