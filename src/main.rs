fn main() {
    if let Err(err) = metric_rows::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
