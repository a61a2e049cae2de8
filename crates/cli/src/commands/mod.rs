pub(crate) mod cart;
pub(crate) mod order;
pub(crate) mod parse;

use std::io::Read;
use std::path::Path;
use std::process;

use crate::config::Config;
use crate::wiring::Services;
use crate::{report_error, OutputFormat};

/// Flags shared by every command.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context<'a> {
    pub config: &'a Config,
    pub no_assistant: bool,
    pub output: OutputFormat,
    pub quiet: bool,
}

impl Context<'_> {
    /// Build collaborators or exit with the error reported.
    pub fn services(&self) -> Services {
        match Services::build(self.config, self.no_assistant) {
            Ok(services) => services,
            Err(e) => {
                report_error(&e, self.output, self.quiet);
                process::exit(1);
            }
        }
    }

    pub fn fail(&self, msg: &str) -> ! {
        report_error(msg, self.output, self.quiet);
        process::exit(1);
    }

    /// Progress line on stderr, suppressed by `--quiet` and JSON output.
    pub fn note(&self, msg: &str) {
        if !self.quiet && self.output == OutputFormat::Text && !msg.is_empty() {
            eprintln!("{}", msg);
        }
    }
}

/// Read a text file, or stdin when the path is `-`.
pub(crate) fn read_text(path: &Path) -> Result<String, String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("error reading stdin: {}", e))?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).map_err(|e| format!("error reading '{}': {}", path.display(), e))
}

pub(crate) fn runtime(ctx: &Context<'_>) -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => ctx.fail(&format!("failed to create tokio runtime: {}", e)),
    }
}
