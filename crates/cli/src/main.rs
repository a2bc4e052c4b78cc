mod cmd;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use output::{OutputFormat, print_error};

/// bootpack - Spring Boot CDS and AOT build-time optimization
#[derive(Parser)]
#[command(name = "bootpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build an application: layers, training run, process types
  Build {
    /// Application directory
    #[arg(long)]
    app: PathBuf,

    /// Directory the layers are written into
    #[arg(long)]
    layers: PathBuf,

    /// Spring Cloud Bindings jar to add to the application
    #[arg(long)]
    cloud_bindings: Option<PathBuf>,

    /// Build a native image instead of a JVM application
    #[arg(long)]
    native_image: bool,

    /// spring-generations.toml to check the Spring Boot version against
    #[arg(long)]
    generations: Option<PathBuf>,
  },

  /// Print the resolved classpath of an exploded application
  Classpath {
    /// Application directory
    #[arg(long)]
    app: PathBuf,
  },

  /// Write the runner manifest an application would get
  Manifest {
    /// Application directory
    #[arg(long)]
    app: PathBuf,

    /// File to write the manifest to
    #[arg(long)]
    out: PathBuf,
  },

  /// Print the JAVA_TOOL_OPTIONS computed by the launch helpers
  Helper {
    /// Directory the application launches from
    #[arg(long, default_value = ".")]
    dir: PathBuf,
  },

  /// Show the java command and application format
  Info {
    /// Application directory
    #[arg(long)]
    app: Option<PathBuf>,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build {
      app,
      layers,
      cloud_bindings,
      native_image,
      generations,
    } => cmd::cmd_build(&app, &layers, cloud_bindings, native_image, generations, cli.output),
    Commands::Classpath { app } => cmd::cmd_classpath(&app, cli.output),
    Commands::Manifest { app, out } => cmd::cmd_manifest(&app, &out),
    Commands::Helper { dir } => cmd::cmd_helper(&dir),
    Commands::Info { app } => cmd::cmd_info(app.as_deref(), cli.output),
  };

  if let Err(e) = result {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}
