//! pboard - command-line entry point

use paperboard::ui::output;

fn main() {
    if let Err(err) = paperboard::cli::run() {
        output::error(format!("{:#}", err));
        std::process::exit(1);
    }
}
