//! keysift - Find private keys, addresses and seed phrases in memory dumps
//!
//! This tool scans large binary dumps for cryptocurrency key material and
//! writes per-dump reports of every distinct finding with its occurrence
//! count.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use keysift_core::report::{write_report, ReportKind, SummaryOnly};
use keysift_core::scanner::DEFAULT_OVERLAP;
use keysift_core::{
    render, report_file_name, shape_only_note, KeyFormat, MnemonicConfig, MnemonicScanner,
    OccurrenceTable, PatternScanner, ProgressTracker, ScanConfig, Wordlist,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Find private keys, addresses and seed phrases in memory dumps
#[derive(Parser, Debug)]
#[command(name = "keysift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Output directory for reports and mnemonic scan progress
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Format to search for; repeat for several (default: every byte
    /// pattern, plus mnemonic when --wordlist is given)
    #[arg(long = "format", value_enum)]
    formats: Vec<FormatArg>,

    /// BIP-39 wordlist, one word per line
    #[arg(long, env = "KEYSIFT_WORDLIST")]
    wordlist: Option<PathBuf>,

    /// Bytes read per chunk (default: 512 KiB for patterns, 1 MiB for mnemonics)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Bytes re-scanned across chunk boundaries
    #[arg(long, default_value_t = DEFAULT_OVERLAP)]
    overlap: usize,

    /// Discard saved mnemonic scan progress and start over
    #[arg(long)]
    restart: bool,

    /// Dry run - don't write reports, just show what would be written
    #[arg(long)]
    dry_run: bool,

    /// Overwrite existing reports
    #[arg(long)]
    force: bool,

    /// Only print the distinct values found
    #[arg(long)]
    list_only: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single dump file to scan
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of dumps to scan
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Formats selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Private keys written as space-separated hex bytes
    Hex,
    /// bc1 SegWit addresses
    Bech32,
    /// zpub extended public keys
    Zpub,
    /// xprv extended private keys
    Xprv,
    /// WIF private keys (checksum verified)
    Wif,
    /// BIP-39 seed phrases (checksum verified, needs --wordlist)
    Mnemonic,
}

impl From<FormatArg> for KeyFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Hex => KeyFormat::HexKey,
            FormatArg::Bech32 => KeyFormat::Bech32Address,
            FormatArg::Zpub => KeyFormat::ExtendedPublicKey,
            FormatArg::Xprv => KeyFormat::ExtendedPrivateKey,
            FormatArg::Wif => KeyFormat::WifKey,
            FormatArg::Mnemonic => KeyFormat::MnemonicPhrase,
        }
    }
}

/// Everything a scan needs, resolved once from the command line
struct Plan {
    pattern_scanner: Option<PatternScanner>,
    wordlist: Option<Wordlist>,
    mnemonic_config: MnemonicConfig,
    formats: Vec<KeyFormat>,
    kinds: Vec<ReportKind>,
}

impl Plan {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let mut formats: Vec<KeyFormat> = cli.formats.iter().map(|&f| f.into()).collect();
        if formats.is_empty() {
            formats.extend(KeyFormat::BYTE_PATTERNS);
            if cli.wordlist.is_some() {
                formats.push(KeyFormat::MnemonicPhrase);
            }
        }
        formats.sort();
        formats.dedup();

        let byte_formats: Vec<KeyFormat> = formats
            .iter()
            .copied()
            .filter(|&f| f != KeyFormat::MnemonicPhrase)
            .collect();

        let pattern_scanner = if byte_formats.is_empty() {
            None
        } else {
            let mut config = ScanConfig::new().overlap(cli.overlap);
            if let Some(size) = cli.chunk_size {
                config = config.chunk_size(size);
            }
            Some(PatternScanner::for_formats(config, &byte_formats)?)
        };

        let wordlist = if formats.contains(&KeyFormat::MnemonicPhrase) {
            let Some(path) = cli.wordlist.as_ref() else {
                bail!("--format mnemonic requires --wordlist");
            };
            let wordlist = Wordlist::load(path)
                .with_context(|| format!("Failed to load wordlist: {}", path.display()))?;
            Some(wordlist)
        } else {
            None
        };

        let mut mnemonic_config = MnemonicConfig::new();
        if let Some(size) = cli.chunk_size {
            mnemonic_config = mnemonic_config.chunk_size(size);
        }
        if !cli.dry_run {
            mnemonic_config = mnemonic_config.progress_dir(&cli.output);
        }

        let mut kinds: Vec<ReportKind> = formats.iter().map(|&f| ReportKind::for_format(f)).collect();
        kinds.sort();
        kinds.dedup();

        debug!("Scanning for: {:?}", formats);
        Ok(Self {
            pattern_scanner,
            wordlist,
            mnemonic_config,
            formats,
            kinds,
        })
    }

    /// Runs every selected scanner over one dump
    fn scan(&self, path: &Path, restart: bool) -> keysift_core::Result<OccurrenceTable> {
        let mut table = match &self.pattern_scanner {
            Some(scanner) => scanner.scan_file(path)?,
            None => OccurrenceTable::new(),
        };

        if let Some(wordlist) = &self.wordlist {
            if restart {
                if let Some(dir) = &self.mnemonic_config.progress_dir {
                    ProgressTracker::reset(dir, path)?;
                }
            }
            let scanner = MnemonicScanner::new(wordlist, self.mnemonic_config.clone())?;
            table.merge(scanner.scan_file(path)?);
        }

        Ok(table)
    }
}

/// Counters for the end-of-run summary
#[derive(Debug, Default)]
struct RunStats {
    files_scanned: usize,
    files_failed: usize,
    findings: usize,
    rejected: u64,
    written: usize,
}

impl RunStats {
    fn print_summary(&self) {
        info!(
            "Summary: {} files scanned, {} failed, {} distinct findings, {} rejected, {} reports written",
            self.files_scanned, self.files_failed, self.findings, self.rejected, self.written
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let plan = Plan::from_cli(&cli)?;

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, &plan, file)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, &plan, directory)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

/// Process a single dump file
fn process_single_file(cli: &Cli, plan: &Plan, file: &Path) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let mut stats = RunStats::default();
    process_dump(cli, plan, file, &mut stats)?;

    if !cli.list_only && !cli.dry_run {
        stats.print_summary();
    }
    print_shape_only_note(cli, plan);

    Ok(())
}

/// Process a directory of dumps recursively
fn process_directory(cli: &Cli, plan: &Plan, directory: &Path) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut stats = RunStats::default();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if !is_candidate_dump(path) {
            trace!("Skipping: {}", path.display());
            continue;
        }

        debug!("Processing dump: {}", path.display());
        if let Err(e) = process_dump(cli, plan, path, &mut stats) {
            let recoverable = e
                .downcast_ref::<keysift_core::Error>()
                .map_or(true, keysift_core::Error::is_recoverable);
            if !recoverable {
                return Err(e);
            }
            // Log error but continue with other files
            warn!("Error processing {}: {:#}", path.display(), e);
            stats.files_failed += 1;
        }
    }

    info!("Processed {} dumps", stats.files_scanned);

    if !cli.list_only && !cli.dry_run {
        stats.print_summary();
    }
    print_shape_only_note(cli, plan);

    Ok(())
}

/// Formats matched on shape alone carry no checksum; say so once per run
fn print_shape_only_note(cli: &Cli, plan: &Plan) {
    if cli.list_only {
        return;
    }
    if let Some(note) = shape_only_note(&plan.formats) {
        eprintln!("note: {}", note);
    }
}

/// Hidden files and keysift's own output are never scanned
fn is_candidate_dump(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return true;
    };
    if name.starts_with('.') {
        return false;
    }
    if name.ends_with(".progress") || name.ends_with(".progress.tmp") || name.ends_with(".found") {
        return false;
    }
    !ReportKind::ALL
        .iter()
        .any(|kind| name.ends_with(&format!("_{}.txt", kind)))
}

/// Scan one dump and write its reports
fn process_dump(cli: &Cli, plan: &Plan, path: &Path, stats: &mut RunStats) -> Result<()> {
    let table = plan
        .scan(path, cli.restart)
        .with_context(|| format!("Failed to scan dump: {}", path.display()))?;

    stats.files_scanned += 1;
    stats.findings += table.len();
    stats.rejected += table.rejected();

    if cli.list_only {
        for entry in table.iter() {
            println!("{}", entry.value);
        }
        return Ok(());
    }

    for &kind in &plan.kinds {
        let output_path = cli.output.join(report_file_name(path, kind));
        let content = render(&table, kind);

        let mut summary = SummaryOnly::new();
        // Rendering into a String cannot fail
        let _ = write_report(&mut summary, &table, kind);
        print!("{}: {}", path.display(), summary.into_string());

        if cli.dry_run {
            println!("Would write: {}", output_path.display());
            if cli.verbose > 0 {
                println!("---");
                println!("{}", content);
                println!("---");
            }
            continue;
        }

        match write_report_file(&output_path, &content, cli.force) {
            Ok(()) => {
                println!("Wrote {}", output_path.display());
                stats.written += 1;
            }
            Err(e) => {
                error!("Failed to write {}: {:#}", output_path.display(), e);
            }
        }
    }

    Ok(())
}

/// Write a report file, refusing to replace an existing one unless forced
fn write_report_file(output_path: &Path, content: &str, force: bool) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    if output_path.exists() && !force {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            output_path.display()
        );
    }

    let mut file = fs::File::create(output_path)
        .with_context(|| format!("Failed to create file: {}", output_path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write file: {}", output_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("keysift").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_input_mode_is_exclusive() {
        assert!(Cli::try_parse_from(["keysift"]).is_err());
        assert!(Cli::try_parse_from(["keysift", "-f", "a", "-d", "b"]).is_err());
        assert!(Cli::try_parse_from(["keysift", "-f", "a"]).is_ok());
    }

    #[test]
    fn test_default_plan_covers_byte_patterns() {
        let plan = Plan::from_cli(&parse(&["-f", "dump.mem"])).unwrap();
        assert!(plan.wordlist.is_none());
        assert_eq!(
            plan.kinds,
            vec![ReportKind::UniqueKeyReport, ReportKind::UniqueAddressReport]
        );
    }

    #[test]
    fn test_mnemonic_requires_wordlist() {
        let cli = parse(&["-f", "dump.mem", "--format", "mnemonic"]);
        assert!(Plan::from_cli(&cli).is_err());
    }

    #[test]
    fn test_overlap_too_small_rejected() {
        let cli = parse(&["-f", "dump.mem", "--overlap", "40"]);
        assert!(Plan::from_cli(&cli).is_err());
    }

    #[test]
    fn test_is_candidate_dump() {
        assert!(is_candidate_dump(Path::new("/cases/host01.mem")));
        assert!(!is_candidate_dump(Path::new("/cases/.DS_Store")));
        assert!(!is_candidate_dump(Path::new("/cases/host01.1a2b3c4d.progress")));
        assert!(!is_candidate_dump(Path::new("/cases/host01.1a2b3c4d.found")));
        assert!(!is_candidate_dump(Path::new("/cases/host01_UniqueKeyReport.txt")));
        assert!(is_candidate_dump(Path::new("/cases/notes.txt")));
    }

    #[test]
    fn test_write_report_file_respects_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reports").join("dump_UniqueKeyReport.txt");

        write_report_file(&path, "first", false).unwrap();
        assert!(write_report_file(&path, "second", false).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");

        write_report_file(&path, "second", true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_process_dump_writes_reports() {
        let temp_dir = TempDir::new().unwrap();
        let dump = temp_dir.path().join("host.mem");
        fs::write(
            &dump,
            b"\x00\x01junk bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq junk\xff",
        )
        .unwrap();
        let out = temp_dir.path().join("out");

        let cli = parse(&[
            "-f",
            dump.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ]);
        let plan = Plan::from_cli(&cli).unwrap();
        let mut stats = RunStats::default();
        process_dump(&cli, &plan, &dump, &mut stats).unwrap();

        assert_eq!(stats.files_scanned, 1);
        assert_eq!(stats.findings, 1);
        assert_eq!(stats.written, 2);

        let report = fs::read_to_string(out.join("host_UniqueAddressReport.txt")).unwrap();
        assert!(report.starts_with("Total Unique Addresses Found: 1\n"));
        assert!(report.contains("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"));
    }

    #[test]
    fn test_restart_discards_saved_progress() {
        let temp_dir = TempDir::new().unwrap();
        let wordlist = temp_dir.path().join("words.txt");
        let words: String = (0..2048).map(|i| format!("w{:04}\n", i)).collect();
        fs::write(&wordlist, words).unwrap();

        let last = (0..2048u16)
            .find(|&i| {
                let mut indices = vec![0u16; 11];
                indices.push(i);
                keysift_core::validate::validate_indices(&indices).is_ok()
            })
            .unwrap();
        let phrase = format!("{} w{:04}", vec!["w0000"; 11].join(" "), last);

        let dump = temp_dir.path().join("host.mem");
        fs::write(&dump, format!("\x00\x01{}\x00\x7f", phrase)).unwrap();
        let out = temp_dir.path().join("out");

        let args = [
            "-f",
            dump.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--format",
            "mnemonic",
            "--wordlist",
            wordlist.to_str().unwrap(),
        ];
        let plan = Plan::from_cli(&parse(&args)).unwrap();

        let table = plan.scan(&dump, false).unwrap();
        assert_eq!(table.count(KeyFormat::MnemonicPhrase, &phrase), Some(1));

        let (progress, journal) = ProgressTracker::paths_for(&out, &dump);
        let dump_len = fs::metadata(&dump).unwrap().len();
        assert_eq!(fs::read_to_string(&progress).unwrap().trim(), dump_len.to_string());
        assert!(fs::read_to_string(&journal).unwrap().contains(&phrase));

        // Saved progress at the end with the journal lost: a resumed scan
        // has nothing left to read
        fs::write(&journal, "").unwrap();
        let table = plan.scan(&dump, false).unwrap();
        assert!(table.is_empty());

        let mut restart_args = args.to_vec();
        restart_args.push("--restart");
        let cli = parse(&restart_args);
        assert!(cli.restart);

        let table = plan.scan(&dump, cli.restart).unwrap();
        assert_eq!(table.count(KeyFormat::MnemonicPhrase, &phrase), Some(1));
        assert_eq!(fs::read_to_string(&progress).unwrap().trim(), dump_len.to_string());
        assert!(fs::read_to_string(&journal).unwrap().contains(&phrase));
    }
}
