use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::album::Album;
use crate::controller::{self, ScanOutcome};
use crate::fingerprint::{Fingerprinter, FpcalcFingerprinter};
use crate::musicbrainz::{MetadataLookup, MusicBrainzClient};
use crate::track::TrackHandle;
use crate::types::{Field, FieldDiff, TagPatch};

#[derive(Parser)]
#[command(name = "recrate", version)]
enum Cli {
    /// Print the tags and stream info of each file
    Show(ShowArgs),
    /// Group a directory into albums by directory + album field
    Scan(ScanArgs),
    /// Print the fields every given file agrees on
    Shared(SharedArgs),
    /// Stage field edits and write them back
    Retag(RetagArgs),
    /// Print the acoustic fingerprint of each file (requires fpcalc)
    Fingerprint(FingerprintArgs),
    /// Search MusicBrainz for artists, releases or recordings
    Lookup(LookupArgs),
}

#[derive(clap::Args)]
struct ShowArgs {
    /// Audio files to inspect
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Directory to scan
    dir: PathBuf,
    /// Descend into subdirectories
    #[arg(long)]
    recursive: bool,
}

#[derive(clap::Args)]
struct SharedArgs {
    /// Audio files to compare
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(clap::Args)]
struct RetagArgs {
    /// Audio files to edit
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Field assignment, e.g. --set artist="Four Tet" (repeatable)
    #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
    assignments: Vec<String>,
    /// Show what would change without writing anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Args)]
struct FingerprintArgs {
    /// Audio files to fingerprint
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Path to the fpcalc binary (default: resolve on PATH)
    #[arg(long)]
    fpcalc: Option<PathBuf>,
}

#[derive(Copy, Clone, ValueEnum)]
enum LookupEntity {
    Artist,
    Release,
    Recording,
}

#[derive(clap::Args)]
struct LookupArgs {
    /// What to search for
    #[arg(value_enum)]
    entity: LookupEntity,
    /// Search query (Lucene syntax is passed through)
    query: String,
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse() {
        Cli::Show(args) => show(args),
        Cli::Scan(args) => scan(args),
        Cli::Shared(args) => shared(args),
        Cli::Retag(args) => retag(args),
        Cli::Fingerprint(args) => fingerprint(args),
        Cli::Lookup(args) => lookup(args),
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn format_track(track: &TrackHandle) -> String {
    let track = track.borrow();
    let mut out = format!("{}\n", track.path().display());
    out.push_str(&format!(
        "  [{} {}{}]\n",
        track.format().name(),
        format_duration(track.length()),
        track
            .bitrate()
            .map(|b| format!(" {b}kbps"))
            .unwrap_or_default(),
    ));
    for (field, value) in track.fields() {
        out.push_str(&format!("  {field}: {value}\n"));
    }
    out
}

fn format_diff(diff: &FieldDiff) -> String {
    let old = diff.old.as_deref().unwrap_or("(unset)");
    let new = diff.new.as_deref().unwrap_or("(unset)");
    format!("  {}: {old} -> {new}", diff.field)
}

fn format_album(album: &Album) -> String {
    let mut out = format!(
        "{} ({} track{})\n",
        album.name(),
        album.len(),
        if album.len() == 1 { "" } else { "s" }
    );
    for track in album {
        let track = track.borrow();
        out.push_str(&format!(
            "  {} - {}\n",
            track.get(Field::Artist),
            track.get(Field::Title)
        ));
    }
    out
}

fn show(args: ShowArgs) -> Result<(), Box<dyn std::error::Error>> {
    for path in &args.paths {
        let track = controller::build_track(path)?;
        print!("{}", format_track(&track));
    }
    Ok(())
}

fn scan(args: ScanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = controller::build_albums(&args.dir, args.recursive, &crate::scan::DirLister)?;
    print_scan_outcome(&outcome);
    Ok(())
}

fn print_scan_outcome(outcome: &ScanOutcome) {
    for album in &outcome.albums {
        print!("{}", format_album(album));
    }
    if !outcome.singles.is_empty() {
        print!("{}", format_album(&outcome.singles));
    }
    for skipped in &outcome.skipped {
        eprintln!("SKIP {}: {}", skipped.path.display(), skipped.error);
    }
    eprintln!(
        "{} albums, {} tracks, {} skipped",
        outcome.albums.len(),
        outcome.track_count(),
        outcome.skipped.len()
    );
}

/// Load every path that will load, reporting the rest. A bad file never
/// aborts a batch command.
fn load_tracks(paths: &[PathBuf]) -> (Vec<TrackHandle>, u32) {
    let mut tracks = Vec::new();
    let mut failed = 0u32;
    for path in paths {
        match controller::build_track(path) {
            Ok(track) => tracks.push(track),
            Err(e) => {
                eprintln!("SKIP {}: {e}", path.display());
                failed += 1;
            }
        }
    }
    (tracks, failed)
}

fn shared(args: SharedArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (tracks, failed) = load_tracks(&args.paths);

    let selection: Vec<_> = tracks.iter().map(Into::into).collect();
    let tags = controller::find_shared_tags(&selection);
    if tags.is_empty() {
        eprintln!("No shared fields.");
    }
    for (field, value) in &tags {
        println!("{field}: {value}");
    }
    if failed > 0 {
        return Err(format!("{failed} file(s) could not be read").into());
    }
    Ok(())
}

fn retag(args: RetagArgs) -> Result<(), Box<dyn std::error::Error>> {
    let patch = TagPatch::from_assignments(&args.assignments)?;
    let (tracks, mut failed) = load_tracks(&args.paths);

    for track in &tracks {
        controller::retag_track(track, &patch);
    }

    if args.dry_run {
        for track in &tracks {
            let track = track.borrow();
            let diffs = track.pending_changes();
            if diffs.is_empty() {
                continue;
            }
            println!("{}", track.path().display());
            for diff in &diffs {
                println!("{}", format_diff(diff));
            }
        }
    } else {
        let mut saved = 0u32;
        for track in &tracks {
            let mut track = track.borrow_mut();
            if !track.dirty() {
                continue;
            }
            match track.save() {
                Ok(()) => saved += 1,
                Err(e) => {
                    eprintln!("FAIL {}: {e}", track.path().display());
                    failed += 1;
                }
            }
        }
        eprintln!("{saved} saved, {failed} failed");
    }

    if failed > 0 {
        return Err(format!("{failed} file(s) could not be processed").into());
    }
    Ok(())
}

/// Fingerprint each path in turn, reporting per-file failures. Returns the
/// failure count.
fn run_fingerprints(paths: &[PathBuf], engine: &dyn Fingerprinter) -> u32 {
    let mut failed = 0u32;
    for path in paths {
        let track = match controller::build_track(path) {
            Ok(track) => track,
            Err(e) => {
                eprintln!("SKIP {}: {e}", path.display());
                failed += 1;
                continue;
            }
        };
        match track.borrow().fingerprint(engine) {
            Ok(fp) => println!("{}\t{fp}", path.display()),
            Err(e) => {
                eprintln!("FAIL {}: {e}", path.display());
                failed += 1;
            }
        }
    }
    failed
}

fn fingerprint(args: FingerprintArgs) -> Result<(), Box<dyn std::error::Error>> {
    let engine = match args.fpcalc {
        Some(binary) => FpcalcFingerprinter::with_binary(binary),
        None => FpcalcFingerprinter::new(),
    };
    let failed = run_fingerprints(&args.paths, &engine);
    if failed > 0 {
        return Err(format!("{failed} file(s) could not be fingerprinted").into());
    }
    Ok(())
}

fn lookup(args: LookupArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = MusicBrainzClient::new()?;
    match args.entity {
        LookupEntity::Artist => {
            for artist in client.find_artists(&args.query)? {
                println!("[{:>3}] {}  ({})", artist.score, artist.name, artist.id);
            }
        }
        LookupEntity::Release => {
            for release in client.find_releases(&args.query)? {
                println!(
                    "[{:>3}] {} - {} ({})  {}",
                    release.score, release.artist, release.title, release.date, release.id
                );
            }
        }
        LookupEntity::Recording => {
            for rec in client.find_recordings(&args.query)? {
                let length = rec
                    .length
                    .map(|d| format!(" [{}]", format_duration(d)))
                    .unwrap_or_default();
                println!(
                    "[{:>3}] {} - {}{length}  {}",
                    rec.score, rec.artist, rec.title, rec.id
                );
            }
        }
    }
    Ok(())
}
