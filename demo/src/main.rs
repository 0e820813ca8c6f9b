//! TESSERA Clinic Audit Chain — Demo CLI
//!
//! Runs one or all of the clinic reference scenarios, or inspects an existing
//! JSON-lines audit log.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- tamper-detection
//!   cargo run -p demo -- verify /var/log/clinic/audit.jsonl
//!   cargo run -p demo -- --config analysis.toml analyze /var/log/clinic/audit.jsonl
//!
//! The signing key for `verify` and `analyze` comes from `--key-hex` or the
//! `TESSERA_SIGNING_KEY` environment variable (hex).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use tessera_audit::{load_records, ChainValidator};
use tessera_contracts::{
    entry::AuditEntry,
    error::{AuditError, AuditResult},
    validation::{ChainAnchor, ChainValidationResult, StoredRecord},
};
use tessera_core::{KeyRing, SigningKey};
use tessera_forensics::{AnalysisConfig, ForensicAnalyzer, ForensicReport, RetentionAnalyzer, RetentionReport};
use tessera_ref_clinic::{
    mock_data::{DEMO_KEY_ID, DEMO_SIGNING_KEY_HEX},
    scenarios::{
        access_anomaly, clinic_config, consent_lifecycle, restart_recovery, retention_review,
        tamper_detection,
    },
};

const KEY_ENV: &str = "TESSERA_SIGNING_KEY";

// ── CLI definition ────────────────────────────────────────────────────────────

/// TESSERA — tamper-evident clinical audit chain demo.
///
/// Scenario subcommands run against fresh in-memory or temporary chains.
/// `verify` and `analyze` inspect an existing JSON-lines log.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "TESSERA clinic audit chain demo",
    long_about = "Runs TESSERA clinic scenarios showing hash chaining, signatures,\n\
                  tamper detection, restart recovery, and forensic analysis."
)]
struct Cli {
    /// Analysis configuration (TOML). Defaults to the reference clinic config.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Active signing key as hex. Falls back to $TESSERA_SIGNING_KEY.
    #[arg(long, global = true, value_name = "HEX")]
    key_hex: Option<String>,

    /// Key id of the active signing key.
    #[arg(long, global = true, default_value = DEMO_KEY_ID)]
    key_id: String,

    /// Retired verification key as `ID:HEX`. May be repeated.
    #[arg(long = "retired-key", global = true, value_name = "ID:HEX")]
    retired_keys: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all five clinic scenarios in sequence.
    RunAll,
    /// Scenario 1: consent granted, used, and withdrawn.
    ConsentLifecycle,
    /// Scenario 2: edit, forge, delete, and reorder are all detected.
    TamperDetection,
    /// Scenario 3: file-backed chain continues across a restart.
    RestartRecovery,
    /// Scenario 4: forensic analysis flags an over-active account.
    AccessAnomaly,
    /// Scenario 5: retention windows at future review dates.
    RetentionReview,
    /// Validate a JSON-lines audit log. Exits with status 1 if the chain is broken.
    Verify {
        /// Path to the `.jsonl` log.
        log: PathBuf,
    },
    /// Validate a log and print forensic and retention reports as JSON.
    Analyze {
        /// Path to the `.jsonl` log.
        log: PathBuf,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging. Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Verify { log } => run_verify(&cli, log),
        Command::Analyze { log } => run_analyze(&cli, log).map(|()| true),
        scenario => {
            print_banner();
            run_scenarios(scenario).map(|()| {
                println!("All selected scenarios completed successfully.");
                true
            })
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn run_scenarios(command: &Command) -> AuditResult<()> {
    match command {
        Command::RunAll => {
            consent_lifecycle::run_scenario()?;
            tamper_detection::run_scenario()?;
            restart_recovery::run_scenario()?;
            access_anomaly::run_scenario()?;
            retention_review::run_scenario()
        }
        Command::ConsentLifecycle => consent_lifecycle::run_scenario(),
        Command::TamperDetection => tamper_detection::run_scenario(),
        Command::RestartRecovery => restart_recovery::run_scenario(),
        Command::AccessAnomaly => access_anomaly::run_scenario(),
        Command::RetentionReview => retention_review::run_scenario(),
        Command::Verify { .. } | Command::Analyze { .. } => Ok(()),
    }
}

// ── Log inspection ────────────────────────────────────────────────────────────

/// Returns whether the chain is intact.
fn run_verify(cli: &Cli, log: &Path) -> AuditResult<bool> {
    let records = load_records(log)?;
    let result = ChainValidator::new(key_ring(cli)?)
        .validate_records(&records, Some(&ChainAnchor::Genesis));

    println!("{}: {}", log.display(), result.summary());
    for v in &result.errors {
        println!(
            "  position {:<4} seq {:<6} {:<20} {}",
            v.position,
            v.sequence_number
                .map(|s| s.to_string())
                .unwrap_or_else(|| "?".to_string()),
            v.kind.to_string(),
            v.detail
        );
    }
    Ok(result.is_valid)
}

#[derive(Serialize)]
struct LogReport<'a> {
    log: &'a Path,
    validation: ChainValidationResult,
    forensics: ForensicReport,
    retention: RetentionReport,
}

fn run_analyze(cli: &Cli, log: &Path) -> AuditResult<()> {
    let config = match &cli.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => clinic_config()?,
    };

    let records = load_records(log)?;
    let validator = ChainValidator::new(key_ring(cli)?);
    let validation = validator.validate_records(&records, Some(&ChainAnchor::Genesis));

    let entries: Vec<AuditEntry> = records
        .into_iter()
        .filter_map(|r| match r {
            StoredRecord::Entry(e) => Some(e),
            StoredRecord::Malformed { .. } => None,
        })
        .collect();

    // Forensics needs a result over exactly the decoded entries.
    let entry_validation = if entries.len() == validation.total {
        validation.clone()
    } else {
        validator.validate_anchored(&entries, &ChainAnchor::Genesis)
    };

    let report = LogReport {
        log,
        forensics: ForensicAnalyzer::new(config.forensics).analyze(&entries, &entry_validation)?,
        retention: RetentionAnalyzer::new(config.retention).analyze(&entries),
        validation,
    };

    let json = serde_json::to_string_pretty(&report).map_err(|e| AuditError::Config {
        reason: format!("failed to render report: {}", e),
    })?;
    println!("{}", json);
    Ok(())
}

/// Build the key ring from the command line, the environment, or the demo key.
fn key_ring(cli: &Cli) -> AuditResult<Arc<KeyRing>> {
    let hex = match cli.key_hex.clone().or_else(|| std::env::var(KEY_ENV).ok()) {
        Some(hex) => hex,
        None => {
            warn!(
                env = KEY_ENV,
                "no signing key supplied; falling back to the built-in demo key"
            );
            DEMO_SIGNING_KEY_HEX.to_string()
        }
    };

    let mut ring = KeyRing::new(SigningKey::from_hex(cli.key_id.as_str(), hex.trim())?);
    for spec in &cli.retired_keys {
        let (id, hex) = spec.split_once(':').ok_or_else(|| AuditError::Config {
            reason: format!("retired key '{}' is not in ID:HEX form", spec),
        })?;
        ring = ring.with_retired(SigningKey::from_hex(id, hex)?);
    }
    Ok(Arc::new(ring))
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("TESSERA — Tamper-Evident Clinical Audit Chain");
    println!("Clinic Reference Demo");
    println!("=============================================");
    println!();
    println!("Append path per event:");
    println!("  [1] Sanitizer redacts sensitive fields (passwords, CPF, card numbers)");
    println!("  [2] Sequencer reserves (sequence_number, previous_hash) under one lock");
    println!("  [3] SHA-256 content hash over canonical fields + previous_hash");
    println!("  [4] HMAC-SHA256 signature under the active key (key_id recorded)");
    println!("  [5] Durable store write; the tip advances only on success");
    println!();
}
