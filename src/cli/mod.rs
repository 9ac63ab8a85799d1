//! Command-line interface for sqldump
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and validation
//! - Opening the row file and output sinks
//! - Running the dump for the configured table

pub mod rows;

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{Config, TableConfig};
use crate::error::{ConfigError, Result};
use crate::export::{
    write_meta, DumpCoordinator, DumpStats, FileWriter, InterceptWriter, LazyFileWriter,
    MemoryMeta, ProgressTracker,
};

pub use rows::JsonLinesTable;

/// sqldump - dump table rows as SQL INSERT statements
#[derive(Parser, Debug)]
#[command(
    name = "sqldump",
    version,
    about = "Dump table rows as SQL INSERT statements",
    long_about = "Reads rows from a JSON Lines file (one JSON array per row) and writes
them as batched INSERT statements for the table described in the config file."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Row file, one JSON array per line
    #[arg(short = 'i', long, value_name = "ROWS")]
    pub input: PathBuf,

    /// Output SQL file
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: PathBuf,

    /// Double quotes instead of backslash escapes (NO_BACKSLASH_ESCAPES servers)
    #[arg(long = "no-backslash-escapes")]
    pub no_backslash_escapes: bool,

    /// Rows per INSERT statement (0 = one statement)
    #[arg(long, value_name = "N")]
    pub rows_per_statement: Option<usize>,

    /// Bytes accumulated before each write
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<usize>,

    /// Create the output file only when there is something to write
    #[arg(long)]
    pub lazy: bool,

    /// Show a progress spinner
    #[arg(long)]
    pub progress: bool,

    /// Quiet mode (minimal output)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (debug logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface from the process arguments
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Create a CLI interface from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let mut config = Config::load(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, &args);
        config.validate()?;

        Ok(Self { args, config })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Apply CLI arguments to configuration
    ///
    /// Overrides configuration values with CLI arguments where provided
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        if let Some(chunk_size) = args.chunk_size {
            config.dump.chunk_size = chunk_size;
        }
        if let Some(rows) = args.rows_per_statement {
            config.dump.rows_per_statement = rows;
        }
        if args.no_backslash_escapes {
            config.dump.escape_backslash = false;
        }
        if args.lazy {
            config.dump.lazy_output = true;
        }
    }

    fn table(&self) -> Result<&TableConfig> {
        self.config
            .table
            .as_ref()
            .ok_or_else(|| ConfigError::MissingField("table".to_string()).into())
    }

    /// Write the schema file (if configured) and then the data file
    ///
    /// # Arguments
    /// * `cancel` - Token that aborts the dump when cancelled
    ///
    /// # Returns
    /// * `Result<DumpStats>` - Statistics of the data dump
    pub async fn run(&self, cancel: CancellationToken) -> Result<DumpStats> {
        let table = self.table()?;
        let output = self.args.output.to_string_lossy().into_owned();

        if let Some(ref create_sql) = table.create_sql {
            let schema_path = schema_path(&self.args.output);
            let meta = MemoryMeta {
                target: table.name.clone(),
                sql: create_sql.clone(),
                special_comments: table.special_comments.clone(),
            };
            let writer = FileWriter::create(&schema_path.to_string_lossy()).await?;
            write_meta(&meta, &writer).await?;
            writer.finalize().await?;
            info!("wrote schema to {}", schema_path.display());
        }

        let mut rows = JsonLinesTable::open(
            &self.args.input.to_string_lossy(),
            table,
            self.config.dump.escape_backslash,
            self.config.dump.rows_per_statement,
        )
        .await?;

        let tracker = ProgressTracker::new(self.args.progress && !self.args.quiet);

        if self.config.dump.lazy_output {
            let sink = Arc::new(InterceptWriter::new(LazyFileWriter::new(&output)));
            let stats = DumpCoordinator::new(sink.clone(), self.config.dump_options())
                .with_progress(tracker)
                .with_cancellation(cancel)
                .write_insert(&mut rows)
                .await?;
            sink.inner().finalize().await?;
            if !sink.something_written() {
                info!("table {} is empty, {} not created", table.name, output);
            }
            Ok(stats)
        } else {
            let sink = Arc::new(FileWriter::create(&output).await?);
            let stats = DumpCoordinator::new(sink.clone(), self.config.dump_options())
                .with_progress(tracker)
                .with_cancellation(cancel)
                .write_insert(&mut rows)
                .await?;
            sink.finalize().await?;
            Ok(stats)
        }
    }

    /// Print the end-of-run summary unless in quiet mode
    pub fn print_summary(&self, stats: &DumpStats) {
        if self.args.quiet {
            return;
        }
        println!(
            "Dumped {} rows in {} statements ({} bytes) to {} in {:.2}s",
            stats.rows,
            stats.statements,
            stats.bytes,
            self.args.output.display(),
            stats.elapsed.as_secs_f64()
        );
    }
}

/// `<dir>/<stem>-schema.sql` next to the data file
fn schema_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{}-schema.sql", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::assert_ok;

    const CONFIG: &str = r#"
[table]
name = "t"
create_sql = "CREATE TABLE `t` (`a` VARCHAR(8), `b` INT)"
special_comments = ["/*!40101 SET NAMES binary*/;"]

[[table.columns]]
name = "a"
type = "VARCHAR"

[[table.columns]]
name = "b"
type = "INT"
"#;

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new(rows: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::File::create(dir.path().join("config.toml"))
                .unwrap()
                .write_all(CONFIG.as_bytes())
                .unwrap();
            std::fs::File::create(dir.path().join("rows.jsonl"))
                .unwrap()
                .write_all(rows.as_bytes())
                .unwrap();
            Self { dir }
        }

        fn path(&self, name: &str) -> String {
            self.dir.path().join(name).to_string_lossy().into_owned()
        }

        fn cli(&self, extra: &[&str]) -> CliInterface {
            let mut argv = vec![
                "sqldump".to_string(),
                "--config".to_string(),
                self.path("config.toml"),
                "--input".to_string(),
                self.path("rows.jsonl"),
                "--output".to_string(),
                self.path("out.sql"),
            ];
            argv.extend(extra.iter().map(|s| s.to_string()));
            CliInterface::from_args(CliArgs::try_parse_from(argv).unwrap()).unwrap()
        }

        fn read(&self, name: &str) -> String {
            std::fs::read_to_string(self.path(name)).unwrap()
        }
    }

    #[test]
    fn test_args_override_config() {
        let fixture = Fixture::new("");
        let cli = fixture.cli(&[
            "--chunk-size",
            "64",
            "--rows-per-statement",
            "10",
            "--no-backslash-escapes",
            "--lazy",
        ]);
        assert_eq!(cli.config().dump.chunk_size, 64);
        assert_eq!(cli.config().dump.rows_per_statement, 10);
        assert!(!cli.config().dump.escape_backslash);
        assert!(cli.config().dump.lazy_output);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let fixture = Fixture::new("");
        let argv = [
            "sqldump".to_string(),
            "-c".to_string(),
            fixture.path("config.toml"),
            "-i".to_string(),
            fixture.path("rows.jsonl"),
            "-o".to_string(),
            fixture.path("out.sql"),
            "--chunk-size".to_string(),
            "0".to_string(),
        ];
        let args = CliArgs::try_parse_from(argv).unwrap();
        assert!(CliInterface::from_args(args).is_err());
    }

    #[tokio::test]
    async fn test_dump_with_schema() {
        let fixture = Fixture::new("[\"a\", 5]\n[\"it's\", null]\n[\"c\", 7]\n");
        let cli = fixture.cli(&["--rows-per-statement", "2"]);

        let stats = assert_ok!(cli.run(CancellationToken::new()).await);
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.statements, 2);

        assert_eq!(
            fixture.read("out-schema.sql"),
            "/*!40101 SET NAMES binary*/;\nCREATE TABLE `t` (`a` VARCHAR(8), `b` INT);\n"
        );
        assert_eq!(
            fixture.read("out.sql"),
            "/*!40101 SET NAMES binary*/;\n\
             INSERT INTO `t` VALUES\n('a',5),\n('it\\'s',NULL);\n\
             INSERT INTO `t` VALUES\n('c',7);\n"
        );
    }

    #[tokio::test]
    async fn test_lazy_output_skips_empty_table() {
        let fixture = Fixture::new("\n");
        let cli = fixture.cli(&["--lazy"]);

        let stats = assert_ok!(cli.run(CancellationToken::new()).await);
        assert_eq!(stats.rows, 0);
        assert!(!fixture.dir.path().join("out.sql").exists());
    }

    #[tokio::test]
    async fn test_eager_output_creates_empty_file() {
        let fixture = Fixture::new("");
        let cli = fixture.cli(&[]);

        assert_ok!(cli.run(CancellationToken::new()).await);
        assert_eq!(fixture.read("out.sql"), "");
    }

    #[test]
    fn test_schema_path() {
        assert_eq!(
            schema_path(Path::new("/tmp/dump/t.sql")),
            PathBuf::from("/tmp/dump/t-schema.sql")
        );
    }
}
