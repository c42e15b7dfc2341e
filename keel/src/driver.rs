use codespan_reporting::diagnostic::{Diagnostic, Severity};
use codespan_reporting::term::termcolor::{BufferedStandardStream, ColorChoice, WriteColor};
use std::cell::RefCell;
use std::io::{Read, Write};
use std::path::Path;

use crate::ast::resolve;
use crate::files::{FileId, Files};
use crate::{surface, target, BUG_REPORT_URL};

#[derive(Debug, Copy, Clone)]
pub enum Status {
    Ok,
    Error,
}

impl Status {
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Error => 1,
        }
    }
}

pub struct Driver {
    files: Files,

    allow_errors: bool,
    seen_errors: RefCell<bool>,
    codespan_config: codespan_reporting::term::Config,
    diagnostic_writer: RefCell<Box<dyn WriteColor>>,

    emit_width: usize,
    emit_writer: RefCell<Box<dyn WriteColor>>,
}

impl Driver {
    pub fn new() -> Driver {
        Driver {
            files: Files::new(),

            allow_errors: false,
            seen_errors: RefCell::new(false),
            codespan_config: codespan_reporting::term::Config::default(),
            diagnostic_writer: RefCell::new(Box::new(BufferedStandardStream::stderr(
                if atty::is(atty::Stream::Stderr) {
                    ColorChoice::Auto
                } else {
                    ColorChoice::Never
                },
            ))),

            emit_width: 80,
            emit_writer: RefCell::new(Box::new(BufferedStandardStream::stdout(
                if atty::is(atty::Stream::Stdout) {
                    ColorChoice::Auto
                } else {
                    ColorChoice::Never
                },
            ))),
        }
    }

    /// Setup a global panic hook
    pub fn install_panic_hook(&self) {
        // Use the currently set codespan configuration
        let term_config = self.codespan_config.clone();
        // Fetch the default hook (which prints the panic message and an optional backtrace)
        let default_hook = std::panic::take_hook();

        std::panic::set_hook(Box::new(move |info| {
            let location = info.location();
            let message = if let Some(error) = info.payload().downcast_ref::<resolve::Error>() {
                error.description()
            } else if let Some(message) = info.payload().downcast_ref::<String>() {
                message.clone()
            } else if let Some(message) = info.payload().downcast_ref::<&str>() {
                (*message).to_owned()
            } else {
                "unknown panic type".to_owned()
            };

            let diagnostic = Diagnostic::bug()
                .with_message(format!("compiler panicked at '{message}'"))
                .with_notes(vec![
                    match location {
                        Some(location) => format!("panicked at: {location}"),
                        None => "panicked at: unknown location".to_owned(),
                    },
                    format!("please file a bug report at: {BUG_REPORT_URL}"),
                ]);

            let mut writer = BufferedStandardStream::stderr(if atty::is(atty::Stream::Stderr) {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            });
            let dummy_files = Files::new();

            default_hook(info);
            eprintln!();
            codespan_reporting::term::emit(&mut writer, &term_config, &dummy_files, &diagnostic)
                .unwrap();
        }));
    }

    /// Set to true if we should attempt to continue after encountering errors
    pub fn set_allow_errors(&mut self, allow_errors: bool) {
        self.allow_errors = allow_errors;
    }

    /// Set the writer to use when rendering diagnostics
    pub fn set_diagnostic_writer(&mut self, stream: impl 'static + WriteColor) {
        self.diagnostic_writer = RefCell::new(Box::new(stream) as Box<dyn WriteColor>);
    }

    /// Set the width to use when rendering generated output
    pub fn set_emit_width(&mut self, emit_width: usize) {
        self.emit_width = emit_width;
    }

    /// Set the writer to use when emitting generated output
    pub fn set_emit_writer(&mut self, stream: impl 'static + WriteColor) {
        self.emit_writer = RefCell::new(Box::new(stream) as Box<dyn WriteColor>);
    }

    /// Load a source string into the file database.
    pub fn load_source_string(&mut self, name: String, source: String) -> FileId {
        self.files.add(name, source)
    }

    /// Load a source file into the file database using a reader.
    pub fn load_source(&mut self, name: String, mut reader: impl Read) -> Option<FileId> {
        let mut source = String::new();
        match reader.read_to_string(&mut source) {
            Ok(_) => Some(self.load_source_string(name, source)),
            Err(error) => {
                self.emit_read_diagnostic(name, error);
                None
            }
        }
    }

    /// Load a source file into the file database from the given path.
    pub fn load_source_path(&mut self, path: &Path) -> Option<FileId> {
        match std::fs::File::open(path) {
            Ok(file) => self.load_source(path.display().to_string(), file),
            Err(error) => {
                self.emit_read_diagnostic(path.display(), error);
                None
            }
        }
    }

    /// Parse and resolve the given files, reporting every diagnostic.
    pub fn check_modules(&mut self, file_ids: &[FileId]) -> Status {
        self.resolve_modules(file_ids);

        match *self.seen_errors.borrow() {
            true => Status::Error,
            false => Status::Ok,
        }
    }

    /// Parse and resolve the given files, then run the named target over
    /// them. Output lands in `out_dir` when one is given, otherwise on the
    /// emit writer.
    pub fn generate_modules(
        &mut self,
        file_ids: &[FileId],
        target_name: &str,
        out_dir: Option<&Path>,
    ) -> Status {
        let target = match target::find(target_name) {
            Some(target) => target,
            None => {
                use itertools::Itertools;

                let names = target::targets().iter().map(|target| target.name());
                self.emit_diagnostic(
                    Diagnostic::error()
                        .with_message(format!("unknown target `{target_name}`"))
                        .with_notes(vec![format!(
                            "available targets: {}",
                            names.format(", "),
                        )]),
                );
                return Status::Error;
            }
        };

        let ast = self.resolve_modules(file_ids);

        // Return early if we’ve seen any errors, unless `allow_errors` is enabled
        if *self.seen_errors.borrow() && !self.allow_errors {
            return Status::Error;
        }

        let modules: Vec<_> = ast.modules().collect();
        for file in target.generate(&ast, &modules, self.emit_width) {
            if file.is_empty() {
                self.emit_diagnostic(Diagnostic::warning().with_message(format!(
                    "target `{target_name}` produced no output for `{}`",
                    file.path
                )));
                continue;
            }

            match out_dir {
                Some(dir) => {
                    let path = dir.join(&file.path);
                    if let Err(error) = std::fs::create_dir_all(dir)
                        .and_then(|()| std::fs::write(&path, &file.content))
                    {
                        self.emit_write_diagnostic(path.display(), error);
                        return Status::Error;
                    }
                }
                None => {
                    let mut emit_writer = self.emit_writer.borrow_mut();
                    write!(emit_writer, "{}", file.content).unwrap();
                    emit_writer.flush().unwrap();
                }
            }
        }

        match *self.seen_errors.borrow() {
            true => Status::Error,
            false => Status::Ok,
        }
    }

    fn resolve_modules(&self, file_ids: &[FileId]) -> crate::ast::Ast {
        let modules: Vec<_> = file_ids
            .iter()
            .map(|file_id| self.parse_module(*file_id))
            .collect();

        let (ast, messages) = resolve::resolve(&modules);
        self.emit_diagnostics(messages.iter().map(|message| message.to_diagnostic()));

        ast
    }

    fn parse_module(&self, file_id: FileId) -> surface::Module {
        let source = self.files.source(file_id).unwrap();
        let (module, messages) = surface::Module::parse(file_id, source);
        self.emit_diagnostics(messages.iter().map(|message| message.to_diagnostic()));

        module
    }

    fn emit_diagnostic(&self, diagnostic: Diagnostic<FileId>) {
        let mut writer = self.diagnostic_writer.borrow_mut();
        let config = &self.codespan_config;

        codespan_reporting::term::emit(&mut *writer, config, &self.files, &diagnostic).unwrap();
        writer.flush().unwrap();

        if diagnostic.severity >= Severity::Error {
            *self.seen_errors.borrow_mut() = true;
        }
    }

    fn emit_diagnostics(&self, diagnostics: impl Iterator<Item = Diagnostic<FileId>>) {
        for diagnostic in diagnostics {
            self.emit_diagnostic(diagnostic);
        }
    }

    fn emit_read_diagnostic(&self, name: impl std::fmt::Display, error: std::io::Error) {
        let diagnostic =
            Diagnostic::error().with_message(format!("couldn't read `{name}`: {error}"));
        self.emit_diagnostic(diagnostic);
    }

    fn emit_write_diagnostic(&self, name: impl std::fmt::Display, error: std::io::Error) {
        let diagnostic =
            Diagnostic::error().with_message(format!("couldn't write `{name}`: {error}"));
        self.emit_diagnostic(diagnostic);
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}
