// StupidlySimple CLI - render views and serve them over HTTP

mod exit_codes;
mod serve;
mod util;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use stupidly_config::{ConfigError, Settings};
use stupidly_debug::{timing, Debugger};
use stupidly_view::{App, RequestOptions, ViewRequest};

use exit_codes::{status_exit_code, EXIT_CONFIG, EXIT_ERROR, EXIT_SERVER, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "stupidly")]
#[command(about = "Resolve, render and serve Lua views with diagnostic error pages")]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one view and print the HTTP response
    #[command(after_help = "\
Exit codes: 0 = 200 OK, 3 = 404 Not Found, 4 = 500 (runtime fault).

Examples:
  stupidly render home
  stupidly render blog/post --var id=7 --var 'tags=[\"rust\",\"lua\"]'
  stupidly render home --data page.json --body-only
  stupidly render home --profile --exec-time
  DEBUG=1 stupidly render broken")]
    Render {
        /// View name (e.g. `home`, `blog/post`)
        name: String,

        /// Application root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Local variable, repeatable. VALUE is JSON when it parses, else a string.
        #[arg(long, value_name = "KEY=VALUE")]
        var: Vec<String>,

        /// JSON object file with local variables (--var entries win)
        #[arg(long, value_name = "FILE")]
        data: Option<PathBuf>,

        /// Print the profile report as JSON on stderr
        #[arg(long)]
        profile: bool,

        /// Append the request execution time to the body
        #[arg(long)]
        exec_time: bool,

        /// Print only the body, without the status line
        #[arg(long)]
        body_only: bool,

        /// Force the full error page (same as DEBUG=1)
        #[arg(long)]
        debug: bool,
    },

    /// Serve views over HTTP (one request per connection)
    #[command(after_help = "\
Examples:
  stupidly serve
  stupidly serve --root ./site --listen 0.0.0.0:8080
  curl 'http://127.0.0.1:8080/blog/post?id=7'")]
    Serve {
        /// Application root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Listen address (defaults to [http] listen)
        #[arg(long, env = "STUPIDLY_LISTEN")]
        listen: Option<String>,
    },

    /// Inspect or create the settings file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the settings file that would be loaded
    Path {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Print effective settings as TOML
    Show {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Write a commented default stupidly.toml into the application root
    Init {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    timing::mark_process_start();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    Debugger::start();

    let result = match cli.command {
        Commands::Render {
            name,
            root,
            var,
            data,
            profile,
            exec_time,
            body_only,
            debug,
        } => cmd_render(name, root, var, data, profile, exec_time, body_only, debug),
        Commands::Serve { root, listen } => cmd_serve(root, listen),
        Commands::Config { command } => match command {
            ConfigCommands::Path { root } => cmd_config_path(&root),
            ConfigCommands::Show { root } => cmd_config_show(&root),
            ConfigCommands::Init { root, force } => cmd_config_init(&root, force),
        },
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn server(msg: impl Into<String>) -> Self {
        Self { code: EXIT_SERVER, message: msg.into(), hint: None }
    }

    /// Exit with `code` and nothing on stderr.
    pub fn silent(code: u8) -> Self {
        Self { code, message: String::new(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let hint = matches!(err, ConfigError::Parse { .. })
            .then(|| "fix the file or regenerate it with `stupidly config init --force`".to_string());
        Self { code: EXIT_CONFIG, message: err.to_string(), hint }
    }
}

fn load_app(root: &Path) -> Result<App, CliError> {
    let settings = Settings::load(root)?;
    Ok(App::new(root, settings))
}

// ============================================================================
// render
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn cmd_render(
    name: String,
    root: PathBuf,
    vars: Vec<String>,
    data_file: Option<PathBuf>,
    profile: bool,
    exec_time: bool,
    body_only: bool,
    debug: bool,
) -> Result<(), CliError> {
    let origin = timing::process_start();

    let data = util::build_data(data_file.as_deref(), &vars)
        .map_err(|e| CliError::args(e).with_hint("--var takes KEY=VALUE; --data takes a JSON object file"))?;

    let mut app = load_app(&root)?;
    if debug {
        app.set_debug(true);
    }

    let request = ViewRequest::new(name).with_data(data);
    let handled = app.handle(&request, RequestOptions { profile, exec_time }, origin);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let write_err = |e: io::Error| CliError::io(e.to_string());
    if !body_only {
        writeln!(out, "{}", handled.response.status_line()).map_err(write_err)?;
        writeln!(out).map_err(write_err)?;
    }
    write!(out, "{}", handled.response.body()).map_err(write_err)?;
    out.flush().map_err(write_err)?;

    if let Some(report) = handled.profile {
        let json = serde_json::to_string_pretty(&report).map_err(|e| CliError::io(e.to_string()))?;
        eprintln!("{}", json);
    }

    match status_exit_code(handled.response.status()) {
        EXIT_SUCCESS => Ok(()),
        code => Err(CliError::silent(code)),
    }
}

// ============================================================================
// serve
// ============================================================================

fn cmd_serve(root: PathBuf, listen: Option<String>) -> Result<(), CliError> {
    let app = load_app(&root)?;
    let listen = listen.unwrap_or_else(|| app.settings().http.listen.clone());

    let listener = serve::bind(&listen)
        .map_err(|e| CliError::server(format!("cannot listen on {}: {}", listen, e)))?;
    let addr = listener
        .local_addr()
        .map_err(|e| CliError::server(e.to_string()))?;

    println!("Serving {} on http://{}", root.display(), addr);
    io::stdout().flush().map_err(|e| CliError::io(e.to_string()))?;

    serve::run(listener, Arc::new(app)).map_err(|e| CliError::server(format!("accept failed: {}", e)))
}

// ============================================================================
// config
// ============================================================================

fn cmd_config_path(root: &Path) -> Result<(), CliError> {
    match Settings::config_path(root) {
        Some(path) => println!("{}", path.display()),
        None => {
            println!("{}", Settings::app_config_path(root).display());
            eprintln!("note: file does not exist, defaults are in effect");
        }
    }
    Ok(())
}

fn cmd_config_show(root: &Path) -> Result<(), CliError> {
    let settings = Settings::load(root)?;
    let text = toml::to_string_pretty(&settings).map_err(|e| CliError::io(e.to_string()))?;
    print!("{}", text);
    Ok(())
}

fn cmd_config_init(root: &Path, force: bool) -> Result<(), CliError> {
    let path = Settings::app_config_path(root);
    if path.exists() && !force {
        return Err(CliError::args(format!("{} already exists", path.display()))
            .with_hint("pass --force to overwrite it"));
    }
    Settings::write_default_file(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
