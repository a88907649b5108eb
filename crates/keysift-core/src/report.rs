//! Report rendering.
//!
//! Reports are plain text. Rendering is pure; writing the file is left to
//! the caller. The [`ReportWriter`] trait lets other renderers plug in.

use crate::aggregate::{Entry, OccurrenceTable, Summary};
use crate::format::KeyFormat;
use std::fmt::{self, Write};
use std::path::Path;

/// The report files a scan can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportKind {
    /// Hex, WIF and extended keys
    UniqueKeyReport,
    /// Bech32 addresses
    UniqueAddressReport,
    /// Mnemonic phrases
    SeedPhraseReport,
}

impl ReportKind {
    /// Every report kind, in output order
    pub const ALL: [ReportKind; 3] = [
        ReportKind::UniqueKeyReport,
        ReportKind::UniqueAddressReport,
        ReportKind::SeedPhraseReport,
    ];

    /// The report a format's findings go to
    pub fn for_format(format: KeyFormat) -> Self {
        match format {
            KeyFormat::HexKey
            | KeyFormat::WifKey
            | KeyFormat::ExtendedPublicKey
            | KeyFormat::ExtendedPrivateKey => ReportKind::UniqueKeyReport,
            KeyFormat::Bech32Address => ReportKind::UniqueAddressReport,
            KeyFormat::MnemonicPhrase => ReportKind::SeedPhraseReport,
        }
    }

    /// Formats reported in this kind
    pub fn formats(&self) -> &'static [KeyFormat] {
        match self {
            ReportKind::UniqueKeyReport => &[
                KeyFormat::HexKey,
                KeyFormat::ExtendedPublicKey,
                KeyFormat::ExtendedPrivateKey,
                KeyFormat::WifKey,
            ],
            ReportKind::UniqueAddressReport => &[KeyFormat::Bech32Address],
            ReportKind::SeedPhraseReport => &[KeyFormat::MnemonicPhrase],
        }
    }

    /// File name suffix
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::UniqueKeyReport => "UniqueKeyReport",
            ReportKind::UniqueAddressReport => "UniqueAddressReport",
            ReportKind::SeedPhraseReport => "SeedPhraseReport",
        }
    }

    /// Plural noun for the reported items
    pub fn items(&self) -> &'static str {
        match self {
            ReportKind::UniqueKeyReport => "Keys",
            ReportKind::UniqueAddressReport => "Addresses",
            ReportKind::SeedPhraseReport => "Seed Phrases",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<input-stem>_<kind>.txt`
pub fn report_file_name(input: &Path, kind: ReportKind) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_else(|| "dump".into());
    format!("{}_{}.txt", stem, kind)
}

/// Warning for the shape-only formats among `formats`, or `None` if every
/// one of them is checksum verified
pub fn shape_only_note(formats: &[KeyFormat]) -> Option<String> {
    let names: Vec<&str> = formats
        .iter()
        .filter(|f| f.is_shape_only())
        .map(KeyFormat::as_str)
        .collect();
    let listed = match names.as_slice() {
        [] => return None,
        [one] => (*one).to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    };
    Some(format!(
        "{} matches carry no checksum and may include false positives.",
        listed
    ))
}

/// Receives a report piece by piece.
///
/// All methods default to doing nothing, so a writer only implements what it
/// needs.
pub trait ReportWriter {
    /// Called once before any entry
    fn begin(&mut self, kind: ReportKind, summary: &Summary) -> fmt::Result {
        let _ = (kind, summary);
        Ok(())
    }

    /// Called for each entry; `number` starts at 1
    fn entry(&mut self, number: usize, entry: &Entry) -> fmt::Result {
        let _ = (number, entry);
        Ok(())
    }

    /// Called once after the last entry
    fn finish(&mut self) -> fmt::Result {
        Ok(())
    }
}

/// Feeds the entries of one report kind to a writer
pub fn write_report<W: ReportWriter + ?Sized>(
    writer: &mut W,
    table: &OccurrenceTable,
    kind: ReportKind,
) -> fmt::Result {
    let formats = kind.formats();
    writer.begin(kind, &table.summary_for(formats))?;
    for (i, entry) in table.entries_for(formats).enumerate() {
        writer.entry(i + 1, entry)?;
    }
    writer.finish()
}

/// Renders the full text report for one kind
pub fn render(table: &OccurrenceTable, kind: ReportKind) -> String {
    let mut report = TextReport::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut report, table, kind);
    report.into_string()
}

/// Summary header followed by a grid of every entry
#[derive(Debug, Default)]
pub struct TextReport {
    output: String,
    rows: Vec<[String; 4]>,
    kind: Option<ReportKind>,
}

impl TextReport {
    /// Creates an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// The rendered text
    pub fn into_string(self) -> String {
        self.output
    }

    fn write_table(&mut self) -> fmt::Result {
        let header = ["#", "Value", "Format", "Count"].map(String::from);
        let mut widths = header.clone().map(|h| h.chars().count());
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let rule = widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+");
        let rule = format!("+{}+", rule);

        writeln!(self.output, "{}", rule)?;
        write_row(&mut self.output, &header, &widths)?;
        writeln!(self.output, "{}", rule)?;
        for row in &self.rows {
            write_row(&mut self.output, row, &widths)?;
        }
        writeln!(self.output, "{}", rule)
    }
}

fn write_row(out: &mut String, cells: &[String; 4], widths: &[usize; 4]) -> fmt::Result {
    out.push('|');
    for (cell, width) in cells.iter().zip(widths) {
        let pad = width - cell.chars().count();
        write!(out, " {}{} |", cell, " ".repeat(pad))?;
    }
    out.push('\n');
    Ok(())
}

fn write_summary(out: &mut String, kind: ReportKind, summary: &Summary) -> fmt::Result {
    let items = kind.items();
    writeln!(out, "Total Unique {} Found: {}", items, summary.total)?;
    writeln!(out, "{} with more than one occurrence: {}", items, summary.repeated)?;
    writeln!(out, "{} with only one occurrence: {}", items, summary.singletons)?;
    writeln!(out, "Rejected candidates: {}", summary.rejected)
}

impl ReportWriter for TextReport {
    fn begin(&mut self, kind: ReportKind, summary: &Summary) -> fmt::Result {
        self.kind = Some(kind);
        write_summary(&mut self.output, kind, summary)?;
        writeln!(self.output)
    }

    fn entry(&mut self, number: usize, entry: &Entry) -> fmt::Result {
        self.rows.push([
            number.to_string(),
            entry.value.clone(),
            entry.format.to_string(),
            entry.count.to_string(),
        ]);
        Ok(())
    }

    fn finish(&mut self) -> fmt::Result {
        if self.rows.is_empty() {
            writeln!(self.output, "No matches found.")?;
        } else {
            self.write_table()?;
        }
        if let Some(note) = self.kind.and_then(|k| shape_only_note(k.formats())) {
            writeln!(self.output, "\nNote: {}", note)?;
        }
        Ok(())
    }
}

/// Writes only the summary header
#[derive(Debug, Default)]
pub struct SummaryOnly {
    output: String,
}

impl SummaryOnly {
    /// Creates an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// The rendered text
    pub fn into_string(self) -> String {
        self.output
    }
}

impl ReportWriter for SummaryOnly {
    fn begin(&mut self, kind: ReportKind, summary: &Summary) -> fmt::Result {
        write_summary(&mut self.output, kind, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Candidate;
    use pretty_assertions::assert_eq;

    fn sample_table() -> OccurrenceTable {
        let mut table = OccurrenceTable::new();
        table.record(Candidate::new(KeyFormat::WifKey, "KwDiBf", 0));
        table.record(Candidate::new(KeyFormat::Bech32Address, "bc1qar0", 10));
        table.record(Candidate::new(KeyFormat::WifKey, "KwDiBf", 20));
        table.record(Candidate::new(KeyFormat::HexKey, "0a0b", 30));
        table.record_rejection(KeyFormat::WifKey);
        table
    }

    #[test]
    fn test_kind_for_format() {
        for format in KeyFormat::BYTE_PATTERNS {
            assert!(ReportKind::for_format(format).formats().contains(&format));
        }
        assert_eq!(
            ReportKind::for_format(KeyFormat::MnemonicPhrase),
            ReportKind::SeedPhraseReport
        );
        assert_eq!(shape_only_note(ReportKind::SeedPhraseReport.formats()), None);
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name(Path::new("/cases/host01.mem"), ReportKind::UniqueKeyReport),
            "host01_UniqueKeyReport.txt"
        );
        assert_eq!(
            report_file_name(Path::new("dump"), ReportKind::SeedPhraseReport),
            "dump_SeedPhraseReport.txt"
        );
    }

    #[test]
    fn test_render_key_report() {
        let expected = "\
Total Unique Keys Found: 2
Keys with more than one occurrence: 1
Keys with only one occurrence: 1
Rejected candidates: 1

+---+--------+--------+-------+
| # | Value  | Format | Count |
+---+--------+--------+-------+
| 1 | KwDiBf | wif    | 2     |
| 2 | 0a0b   | hex    | 1     |
+---+--------+--------+-------+

Note: hex, zpub and xprv matches carry no checksum and may include false positives.
";
        assert_eq!(render(&sample_table(), ReportKind::UniqueKeyReport), expected);
    }

    #[test]
    fn test_address_report_note_names_only_bech32() {
        let report = render(&sample_table(), ReportKind::UniqueAddressReport);
        assert!(report.ends_with(
            "\nNote: bech32 matches carry no checksum and may include false positives.\n"
        ));
    }

    #[test]
    fn test_shape_only_note() {
        assert_eq!(shape_only_note(&[KeyFormat::WifKey, KeyFormat::MnemonicPhrase]), None);
        assert_eq!(
            shape_only_note(&[KeyFormat::HexKey, KeyFormat::WifKey]).as_deref(),
            Some("hex matches carry no checksum and may include false positives.")
        );
        assert_eq!(
            shape_only_note(&KeyFormat::BYTE_PATTERNS).as_deref(),
            Some("hex, bech32, zpub and xprv matches carry no checksum and may include false positives.")
        );
    }

    #[test]
    fn test_render_empty_seed_report() {
        let expected = "\
Total Unique Seed Phrases Found: 0
Seed Phrases with more than one occurrence: 0
Seed Phrases with only one occurrence: 0
Rejected candidates: 0

No matches found.
";
        assert_eq!(render(&sample_table(), ReportKind::SeedPhraseReport), expected);
    }

    #[test]
    fn test_summary_only() {
        let mut writer = SummaryOnly::new();
        write_report(&mut writer, &sample_table(), ReportKind::UniqueAddressReport).unwrap();
        assert_eq!(
            writer.into_string(),
            "Total Unique Addresses Found: 1\n\
             Addresses with more than one occurrence: 0\n\
             Addresses with only one occurrence: 1\n\
             Rejected candidates: 0\n"
        );
    }

    #[test]
    fn test_custom_writer_counts_entries() {
        #[derive(Default)]
        struct Counter(usize);
        impl ReportWriter for Counter {
            fn entry(&mut self, _number: usize, _entry: &Entry) -> fmt::Result {
                self.0 += 1;
                Ok(())
            }
        }

        let mut counter = Counter::default();
        write_report(&mut counter, &sample_table(), ReportKind::UniqueKeyReport).unwrap();
        assert_eq!(counter.0, 2);
    }
}
