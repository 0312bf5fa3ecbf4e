//! Thin entrypoint for the `wp-zip` binary.

fn main() {
    std::process::exit(wpzip_cli::run());
}
