use clap::Parser;
use std::path::PathBuf;

/// A compiler for the keel interface definition language
#[derive(Parser)]
#[clap(author, version, about)]
enum Cli {
    /// Check schema files, reporting any diagnostics
    Check {
        /// Paths to the schema files to check
        #[clap(name = "FILE", required = true)]
        files: Vec<PathOrStdin>,
        /// Continue even if errors were encountered
        #[clap(long = "allow-errors")]
        allow_errors: bool,
    },
    /// Run a backend target over schema files
    Generate {
        /// Name of the target to run
        #[clap(long = "target", name = "TARGET", default_value = "schema")]
        target: String,
        /// Directory to write generated files into, defaults to stdout
        #[clap(long = "out-dir", name = "OUT_DIR")]
        out_dir: Option<PathBuf>,
        /// Paths to the schema files to compile
        #[clap(name = "FILE", required = true)]
        files: Vec<PathOrStdin>,
        /// Continue even if errors were encountered
        #[clap(long = "allow-errors")]
        allow_errors: bool,
    },
    /// List the registered backend targets
    Targets,
}

#[derive(Clone, Debug)]
enum PathOrStdin {
    StdIn,
    Path(PathBuf),
}

impl std::str::FromStr for PathOrStdin {
    type Err = std::convert::Infallible;

    fn from_str(src: &str) -> Result<PathOrStdin, std::convert::Infallible> {
        match src {
            "-" => Ok(PathOrStdin::StdIn),
            _ => Ok(PathOrStdin::Path(PathBuf::from(src))),
        }
    }
}

fn load_file_or_exit(driver: &mut keel::Driver, file: PathOrStdin) -> keel::files::FileId {
    let file_id = match file {
        PathOrStdin::StdIn => driver.load_source("<stdin>".to_owned(), std::io::stdin()),
        PathOrStdin::Path(path) => driver.load_source_path(&path),
    };
    file_id.unwrap_or_else(|| std::process::exit(keel::Status::Error.exit_code()))
}

const MAX_PRETTY_WIDTH: usize = 80;

fn get_pretty_width() -> usize {
    let term_width = termsize::get().map_or(usize::MAX, |size| usize::from(size.cols));
    std::cmp::min(term_width, MAX_PRETTY_WIDTH)
}

fn main() -> ! {
    match Cli::parse() {
        Cli::Check {
            files,
            allow_errors,
        } => {
            let mut driver = keel::Driver::new();
            driver.install_panic_hook();
            driver.set_allow_errors(allow_errors);

            let file_ids: Vec<_> = files
                .into_iter()
                .map(|file| load_file_or_exit(&mut driver, file))
                .collect();
            let status = driver.check_modules(&file_ids);

            std::process::exit(status.exit_code());
        }
        Cli::Generate {
            target,
            out_dir,
            files,
            allow_errors,
        } => {
            let mut driver = keel::Driver::new();
            driver.install_panic_hook();
            driver.set_allow_errors(allow_errors);
            driver.set_emit_width(get_pretty_width());

            let file_ids: Vec<_> = files
                .into_iter()
                .map(|file| load_file_or_exit(&mut driver, file))
                .collect();
            let status = driver.generate_modules(&file_ids, &target, out_dir.as_deref());

            std::process::exit(status.exit_code());
        }
        Cli::Targets => {
            for target in keel::target::targets() {
                println!("{}", target.name());
            }

            std::process::exit(keel::Status::Ok.exit_code());
        }
    }
}
