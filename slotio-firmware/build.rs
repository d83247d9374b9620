//! Build script for slotio-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates board.toml and compiles it into `board_config.rs`

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use slotio_core::config::{BoardConfig, StorageConfig, TimingConfig};
use slotio_core::topology::Track;
use slotio_protocol::DeviceInfo;

fn main() {
    setup_linker();
    generate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BoardFile {
    identity: IdentitySection,
    timing: TimingSection,
    storage: StorageSection,
    #[serde(default)]
    tracks: TracksSection,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct IdentitySection {
    vendor: String,
    product: String,
    version: String,
    build: u32,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TimingSection {
    debounce_us: u32,
    pulse_high_us: u32,
    pulse_low_us: u32,
    ack_timeout_us: u32,
    eject_timeout_us: u32,
    watchdog_us: u32,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StorageSection {
    bank0: u16,
    bank1: u16,
    user_start: u16,
    capacity: u32,
    max_transfer: u8,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TracksSection {
    #[serde(default)]
    active_high: Vec<String>,
}

/// Validate board.toml and emit `board_config.rs` into OUT_DIR
fn generate_config() {
    // Re-run if board.toml changes
    println!("cargo:rerun-if-changed=board.toml");

    let config_path = Path::new("board.toml");

    // Check if config file exists
    if !config_path.exists() {
        fail(
            "board.toml not found!",
            &[
                "The firmware requires a board.toml configuration file.".to_string(),
                "Please create one in the slotio-firmware directory.".to_string(),
            ],
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read board.toml", &[e.to_string()]),
    };

    let file: BoardFile = match toml::from_str(&content) {
        Ok(file) => file,
        Err(e) => fail(
            "Invalid board.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let board = board_config(&file);
    if let Err(e) = board.validate() {
        fail(
            "Invalid board configuration",
            &[format!("{:?}", e), describe(e).to_string()],
        );
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("board_config.rs"), render(&board)).unwrap();
}

fn board_config(file: &BoardFile) -> BoardConfig {
    let mut errors = Vec::new();
    let mut track_levels = 0u8;
    for name in &file.tracks.active_high {
        match Track::ALL.iter().find(|t| track_name(**t) == name.as_str()) {
            Some(track) => track_levels |= 1 << track.index(),
            None => errors.push(format!("[tracks] unknown track '{}'", name)),
        }
    }
    if !errors.is_empty() {
        fail("Invalid track configuration", &errors);
    }

    let i = &file.identity;
    let t = &file.timing;
    let s = &file.storage;
    BoardConfig {
        identity: DeviceInfo {
            // DeviceInfo only holds 'static strings
            vendor: Box::leak(i.vendor.clone().into_boxed_str()),
            product: Box::leak(i.product.clone().into_boxed_str()),
            version: Box::leak(i.version.clone().into_boxed_str()),
            build: i.build,
        },
        timing: TimingConfig {
            debounce_us: t.debounce_us,
            pulse_high_us: t.pulse_high_us,
            pulse_low_us: t.pulse_low_us,
            ack_timeout_us: t.ack_timeout_us,
            eject_timeout_us: t.eject_timeout_us,
            watchdog_us: t.watchdog_us,
        },
        storage: StorageConfig {
            bank0: s.bank0,
            bank1: s.bank1,
            user_start: s.user_start,
            capacity: s.capacity,
            max_transfer: s.max_transfer,
        },
        track_levels,
    }
}

fn track_name(track: Track) -> &'static str {
    match track {
        Track::Hopper => "hopper",
        Track::Ticket => "ticket",
        Track::Insert1 => "insert1",
        Track::Insert2 => "insert2",
        Track::Insert3 => "insert3",
        Track::Banknote => "banknote",
    }
}

fn describe(e: slotio_core::config::ConfigError) -> &'static str {
    use slotio_core::config::ConfigError::*;
    match e {
        DebounceThreshold => "[timing] debounce_us must be 1..=1073741823",
        PulseWidth => "[timing] pulse widths must be non-zero",
        AckTimeout => "[timing] ack_timeout_us must be non-zero",
        WatchdogPeriod => "[timing] watchdog_us must be 1..=8388607",
        BankOverlap => "[storage] bank0 and bank1 overlap",
        UserRegion => "[storage] user_start must follow both banks",
        Capacity => "[storage] capacity must exceed user_start (max 65536)",
        MaxTransfer => "[storage] max_transfer must fit a single frame",
        IdentityTooLong => "[identity] strings do not fit a single frame",
        TrackLevels => "[tracks] active level for a track that does not exist",
    }
}

fn render(board: &BoardConfig) -> String {
    let i = &board.identity;
    let t = &board.timing;
    let s = &board.storage;
    format!(
        "// Generated by build.rs from board.toml\n\
         pub const BOARD: slotio_core::config::BoardConfig = slotio_core::config::BoardConfig {{\n\
         \x20   identity: slotio_protocol::DeviceInfo {{\n\
         \x20       vendor: {:?},\n\
         \x20       product: {:?},\n\
         \x20       version: {:?},\n\
         \x20       build: {},\n\
         \x20   }},\n\
         \x20   timing: slotio_core::config::TimingConfig {{\n\
         \x20       debounce_us: {},\n\
         \x20       pulse_high_us: {},\n\
         \x20       pulse_low_us: {},\n\
         \x20       ack_timeout_us: {},\n\
         \x20       eject_timeout_us: {},\n\
         \x20       watchdog_us: {},\n\
         \x20   }},\n\
         \x20   storage: slotio_core::config::StorageConfig {{\n\
         \x20       bank0: {:#06x},\n\
         \x20       bank1: {:#06x},\n\
         \x20       user_start: {:#06x},\n\
         \x20       capacity: {},\n\
         \x20       max_transfer: {},\n\
         \x20   }},\n\
         \x20   track_levels: {:#010b},\n\
         }};\n",
        i.vendor,
        i.product,
        i.version,
        i.build,
        t.debounce_us,
        t.pulse_high_us,
        t.pulse_low_us,
        t.ack_timeout_us,
        t.eject_timeout_us,
        t.watchdog_us,
        s.bank0,
        s.bank1,
        s.user_start,
        s.capacity,
        s.max_transfer,
        board.track_levels,
    )
}

/// Abort the build with a boxed error message
fn fail(title: &str, lines: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        lines
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}
