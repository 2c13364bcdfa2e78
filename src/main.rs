fn main() {
    if let Err(err) = censo_indigena::run() {
        eprintln!("error: {}", censo_indigena::describe_error(&err));
        std::process::exit(1);
    }
}
