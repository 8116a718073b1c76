//! qtrust: Command-line tool for validating certificates against EU trusted lists.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use qtrust_lib::cache::TslDataRecord;
use qtrust_lib::revocation::MemoryFetcher;
use qtrust_lib::{
    mapping, validator, Certificate, Crl, EngineConfig, ExtensionAnalyzer, MemoryStore,
    OcspResponse, ResultCode, RulesRegistry, TslCacheFacade, TslCountryRegion,
    TslCountryRegionMapping, TslObject, TslValidator, ValidationResult,
};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "qtrust",
    about = "Validate X.509 certificates against EU trusted lists (ETSI TS 119612)",
    long_about = "qtrust detects a certificate in a Trust Service Status List, derives its\n\
                  eIDAS mappings (qualified, classification, QSCD) and resolves its status.\n\n\
                  Trusted lists are read as JSON. Certificates may be PEM or DER and are\n\
                  read from stdin when no file is given. Logging goes to stderr and is\n\
                  controlled by RUST_LOG (default: info).",
    after_help = "EXAMPLES:\n\
                  \n  qtrust validate --tsl tsl-es.json cert.pem\
                  \n  qtrust validate --tsl tsl-es.json --revocation --crl ca.crl.pem cert.pem\
                  \n  qtrust revocation --tsl tsl-es.json --crl ca.crl.pem cert.pem\
                  \n  qtrust analyze --json cert.pem\
                  \n  qtrust mappings --tsl tsl-es.json --policy certClassification=1 cert.pem\
                  \n  qtrust batch --tsl tsl-es.json --recurse certs/"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and validate a certificate (exit 0 = valid/unknown, 2 = not valid)
    #[command(after_help = "CRL SOURCES:\n\
                      \n  --crl FILE       served for the certificate's distribution points\
                      \n                   and for every TSL CRL service supply point\
                      \n  --crl URL=FILE   served for URL only\
                      \n\nEXAMPLES:\n\
                      \n  qtrust validate --tsl tsl-es.json cert.pem\
                      \n  qtrust validate --tsl tsl-es.json --date 2025-01-01T00:00:00Z cert.pem\
                      \n  qtrust validate --tsl tsl-es.json --revocation --crl ca.crl.pem cert.pem")]
    Validate {
        /// Certificate file (PEM or DER). Reads from stdin if omitted.
        file: Option<PathBuf>,
        /// Trusted list as JSON
        #[arg(long, value_name = "FILE")]
        tsl: PathBuf,
        /// Engine configuration (TOML)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Validation date, RFC 3339 (default: now)
        #[arg(long, value_parser = parse_date)]
        date: Option<OffsetDateTime>,
        /// Treat the certificate as a time-stamping authority certificate
        #[arg(long)]
        tsa: bool,
        /// Resolve the revocation status after detection
        #[arg(long)]
        revocation: bool,
        /// CRL to serve to the revocation check, as FILE or URL=FILE
        #[arg(long, value_parser = parse_crl_arg)]
        crl: Vec<CrlArg>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Check a certificate against supplied CRLs and OCSP responses
    #[command(after_help = "EXAMPLES:\n\
                      \n  qtrust revocation --tsl tsl-es.json --crl ca.crl.pem cert.pem\
                      \n  qtrust revocation --tsl tsl-es.json --ocsp response.json cert.pem")]
    Revocation {
        /// Certificate file (PEM or DER). Reads from stdin if omitted.
        file: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        tsl: PathBuf,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// CRL file (PEM or DER)
        #[arg(long, value_name = "FILE")]
        crl: Vec<PathBuf>,
        /// Decoded OCSP response as JSON
        #[arg(long, value_name = "FILE")]
        ocsp: Vec<PathBuf>,
        #[arg(long, value_parser = parse_date)]
        date: Option<OffsetDateTime>,
        #[arg(long)]
        tsa: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show the qualified-certificate extensions and calculated mappings
    Analyze {
        /// Certificate file (PEM or DER). Reads from stdin if omitted.
        file: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Print the merged mapping table for a certificate
    #[command(after_help = "Configured mappings are read from a JSON array of\n\
                      {\"identificator\", \"value\", \"associationType\": \"free\"|\"simple\"}.\n\
                      \nEXAMPLES:\n\
                      \n  qtrust mappings --tsl tsl-es.json cert.pem\
                      \n  qtrust mappings --tsl tsl-es.json --mappings es.json --policy clasificacion=0 cert.pem")]
    Mappings {
        /// Certificate file (PEM or DER). Reads from stdin if omitted.
        file: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        tsl: PathBuf,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Country/region mappings as JSON
        #[arg(long, value_name = "FILE")]
        mappings: Option<PathBuf>,
        /// Policy mapping, as KEY=VALUE
        #[arg(long, value_parser = parse_key_value)]
        policy: Vec<(String, String)>,
        #[arg(long, value_parser = parse_date)]
        date: Option<OffsetDateTime>,
        #[arg(long)]
        tsa: bool,
        #[arg(long)]
        json: bool,
    },
    /// Validate every certificate in a directory (exit 2 if any is not valid)
    Batch {
        /// Directory of certificate files (.pem, .der, .crt, .cer)
        dir: PathBuf,
        #[arg(long, value_name = "FILE")]
        tsl: PathBuf,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        #[arg(long, value_parser = parse_date)]
        date: Option<OffsetDateTime>,
        /// Only print certificates that are not valid
        #[arg(long)]
        failures_only: bool,
        /// Recurse into subdirectories
        #[arg(short, long)]
        recurse: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct CrlArg {
    url: Option<String>,
    path: PathBuf,
}

/// Maximum file size for certificate, CRL and TSL inputs (10 MiB).
const MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;

fn read_input(file: Option<&PathBuf>) -> Result<Vec<u8>> {
    match file {
        Some(path) => read_file(path),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .take(MAX_INPUT_BYTES)
                .read_to_end(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat file: {}", path.display()))?;
    if meta.len() > MAX_INPUT_BYTES {
        bail!(
            "File too large ({} bytes, max {} bytes): {}",
            meta.len(),
            MAX_INPUT_BYTES,
            path.display()
        );
    }
    std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

fn load_tsl(path: &Path) -> Result<Arc<TslObject>> {
    let bytes = read_file(path)?;
    let text = std::str::from_utf8(&bytes)
        .with_context(|| format!("TSL is not UTF-8: {}", path.display()))?;
    let tsl = TslObject::from_json(text)
        .with_context(|| format!("Invalid TSL JSON: {}", path.display()))?;
    debug!(
        path = %path.display(),
        country = tsl.country_region_code(),
        sequence_number = tsl.sequence_number(),
        "TSL loaded"
    );
    Ok(Arc::new(tsl))
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Invalid configuration: {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_crl(path: &Path) -> Result<Crl> {
    Crl::load(&read_file(path)?).with_context(|| format!("Invalid CRL: {}", path.display()))
}

fn load_ocsp(path: &Path) -> Result<OcspResponse> {
    serde_json::from_slice(&read_file(path)?)
        .with_context(|| format!("Invalid OCSP response JSON: {}", path.display()))
}

fn parse_date(s: &str) -> std::result::Result<OffsetDateTime, String> {
    OffsetDateTime::parse(s, &Rfc3339).map_err(|e| format!("invalid RFC 3339 date '{s}': {e}"))
}

/// `FILE` or `URL=FILE`. The URL is everything before the last `=`.
fn parse_crl_arg(s: &str) -> std::result::Result<CrlArg, String> {
    if s.contains("://") {
        if let Some((url, path)) = s.rsplit_once('=') {
            if url.is_empty() || path.is_empty() {
                return Err(format!("expected URL=FILE, got '{s}'"));
            }
            return Ok(CrlArg {
                url: Some(url.to_string()),
                path: PathBuf::from(path),
            });
        }
    }
    if s.is_empty() {
        return Err("empty CRL argument".into());
    }
    Ok(CrlArg {
        url: None,
        path: PathBuf::from(s),
    })
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// CRL supply points of every service in the list.
fn tsl_supply_points(tsl: &TslObject) -> impl Iterator<Item = &str> {
    tsl.trust_service_providers
        .iter()
        .flat_map(|tsp| tsp.services.iter())
        .flat_map(|svc| svc.supply_points.iter().map(String::as_str))
}

fn build_fetcher(crls: &[CrlArg], cert: &Certificate, tsl: &TslObject) -> Result<MemoryFetcher> {
    let mut fetcher = MemoryFetcher::new();
    for arg in crls {
        let crl = load_crl(&arg.path)?;
        let urls: Vec<String> = match &arg.url {
            Some(url) => vec![url.clone()],
            None => cert
                .crl_distribution_points
                .iter()
                .map(String::as_str)
                .chain(tsl_supply_points(tsl))
                .map(str::to_string)
                .collect(),
        };
        for url in urls {
            fetcher = fetcher.with_crl(url, crl.clone());
        }
    }
    Ok(fetcher)
}

fn validation_date(date: Option<OffsetDateTime>) -> OffsetDateTime {
    date.unwrap_or_else(OffsetDateTime::now_utc)
}

/// 0 when the certificate may be trusted so far, 2 otherwise.
fn exit_code(code: ResultCode) -> i32 {
    match code {
        ResultCode::Valid | ResultCode::DetectedUnknown => 0,
        _ => 2,
    }
}

fn print_result(label: &str, result: &ValidationResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    println!("{}: {}", label, result.result);
    let optional = [
        ("tsp", result.tsp_name.as_deref()),
        ("detect service", result.tsp_service_name_for_detect.as_deref()),
        ("validate service", result.tsp_service_name_for_validate.as_deref()),
        ("revocation url", result.revocation_url.as_deref()),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            println!("  {}: {}", name, value);
        }
    }
    if result.has_been_detected() {
        println!("  certQualified: {}", result.mapping_type.as_mapping_value());
        println!(
            "  certClassification: {}",
            result.mapping_classification.as_mapping_value()
        );
        println!("  qscd: {}", result.mapping_qscd.as_mapping_value());
    }
    if let Some(date) = result.revocation_date {
        println!(
            "  revoked: {} (reason {})",
            date.format(&Rfc3339).unwrap_or_default(),
            result.revocation_reason
        );
    }
    Ok(())
}

/// Check if a path has a certificate file extension (.pem, .der, .crt, .cer).
fn is_cert_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("pem") || ext.eq_ignore_ascii_case("der")
            || ext.eq_ignore_ascii_case("crt") || ext.eq_ignore_ascii_case("cer")
    )
}

/// Find all certificate files in a directory, sorted.
fn find_cert_files(dir: &Path, recurse: bool) -> Vec<PathBuf> {
    let walker = if recurse {
        walkdir::WalkDir::new(dir)
    } else {
        walkdir::WalkDir::new(dir).max_depth(1)
    };
    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_cert_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// A single result from batch processing.
struct BatchResult {
    path: String,
    pass: bool,
    detail: String,
}

/// Validate certificate files in parallel, printing `path: RESULT`.
///
/// Returns the number of certificates that did not pass.
fn run_batch<F>(files: &[PathBuf], failures_only: bool, op: F) -> usize
where
    F: Fn(&Path) -> BatchResult + Sync,
{
    let results: Vec<BatchResult> = files.par_iter().map(|f| op(f)).collect();

    let mut failures = 0;
    for r in &results {
        if !r.pass {
            failures += 1;
        }
        if failures_only && r.pass {
            continue;
        }
        if r.pass {
            println!("{}: {}", r.path, r.detail);
        } else {
            eprintln!("{}: {}", r.path, r.detail);
        }
    }
    failures
}

fn validate_file(validator: &TslValidator, path: &Path, date: OffsetDateTime) -> BatchResult {
    let label = path.display().to_string();
    let outcome = read_file(path).and_then(|bytes| {
        validator
            .validate_certificate_with_tsl(&bytes, false, date, false)
            .map_err(anyhow::Error::from)
    });
    match outcome {
        Ok(result) => BatchResult {
            path: label,
            pass: exit_code(result.result) == 0,
            detail: result.result.to_string(),
        },
        Err(e) => BatchResult {
            path: label,
            pass: false,
            detail: format!("FAIL ({})", e),
        },
    }
}

fn analyze_json(cert: &Certificate) -> serde_json::Value {
    let analyzer = ExtensionAnalyzer::new(cert);
    let answer = |r: std::result::Result<bool, qtrust_lib::QtrustError>| match r {
        Ok(b) => serde_json::Value::Bool(b),
        Err(e) => serde_json::Value::String(format!("error: {}", e)),
    };
    serde_json::json!({
        "subject": cert.subject.to_oneline(),
        "issuer": cert.issuer.to_oneline(),
        "hasQcStatements": answer(analyzer.has_qc_statements()),
        "qcCompliance": answer(analyzer.has_qc_statement(qtrust_lib::oid::QCS_COMPLIANCE)),
        "qcSscd": answer(analyzer.has_qc_statement(qtrust_lib::oid::QCS_SSCD)),
        "hasQcType": answer(analyzer.has_qc_eu_type()),
        "policies": analyzer.policies(),
        "certQualified": mapping::mapping_type_qualified(&analyzer)
            .map_or("UNKNOWN", |t| t.as_mapping_value()),
        "certClassification": mapping::mapping_classification(&analyzer, true)
            .map_or("UNKNOWN", |c| c.as_mapping_value()),
        "qscd": mapping::mapping_qscd(&analyzer).map_or("UNKNOWN", |q| q.as_mapping_value()),
    })
}

/// Mappings of `cert` under `tsl`, going through the TSL cache the way a
/// long-running service would.
#[allow(clippy::too_many_arguments)]
fn merged_mappings(
    cert: &Certificate,
    tsl: Arc<TslObject>,
    tsl_path: &Path,
    configured: Vec<TslCountryRegionMapping>,
    policy: &BTreeMap<String, String>,
    config: &EngineConfig,
    date: OffsetDateTime,
    is_tsa: bool,
) -> Result<BTreeMap<String, String>> {
    let code = tsl.country_region_code().to_ascii_uppercase();
    let store = Arc::new(MemoryStore::new());
    let mut country = TslCountryRegion::new(1, &code, &code);
    for m in configured {
        country.add_update_mapping(m);
    }
    store.put_country_region(country);
    let info = &tsl.scheme_information;
    store.put_tsl(
        TslDataRecord {
            tsl_data_id: 1,
            spec_version_id: 1,
            country_region_code: code.clone(),
            location_uri: tsl_path.display().to_string(),
            issue_date: info.issue_date,
            next_update_date: info.next_update,
            sequence_number: info.sequence_number,
            new_tsl_available: None,
            last_new_tsl_available_check: None,
            legible_document_added: false,
        },
        Arc::clone(&tsl),
    );

    let facade = TslCacheFacade::new(store, &config.cache);
    facade.initialize(false)?;
    let data = facade
        .get_tsl_data_for_country_region(&code)?
        .with_context(|| format!("No TSL cached for {}", code))?;
    let validator =
        TslValidator::new(data.tsl, &RulesRegistry::default())?.with_config(config.clone());
    let result = validator.validate(cert, is_tsa, date, false)?;
    Ok(validator::certificate_mappings(
        cert,
        &result,
        &code,
        &facade,
        policy,
        &config.classification,
    )?)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Validate {
            file,
            tsl,
            config,
            date,
            tsa,
            revocation,
            crl,
            json,
        } => {
            let cert = qtrust_lib::parse_cert(&read_input(file.as_ref())?)?;
            let config = load_config(config.as_ref())?;
            let list = load_tsl(&tsl)?;
            let fetcher = build_fetcher(&crl, &cert, &list)?;
            let validator = TslValidator::new(list, &RulesRegistry::default())?
                .with_config(config)
                .with_fetcher(Arc::new(fetcher));
            let result = validator.validate(&cert, tsa, validation_date(date), revocation)?;
            let label = file.as_ref().map_or("stdin".into(), |p| p.display().to_string());
            print_result(&label, &result, json)?;
            let code = exit_code(result.result);
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Revocation {
            file,
            tsl,
            config,
            crl,
            ocsp,
            date,
            tsa,
            json,
        } => {
            if crl.is_empty() && ocsp.is_empty() {
                bail!("At least one --crl or --ocsp is required");
            }
            let cert = qtrust_lib::parse_cert(&read_input(file.as_ref())?)?;
            let crls = crl.iter().map(|p| load_crl(p)).collect::<Result<Vec<_>>>()?;
            let responses = ocsp.iter().map(|p| load_ocsp(p)).collect::<Result<Vec<_>>>()?;
            let validator = TslValidator::new(load_tsl(&tsl)?, &RulesRegistry::default())?
                .with_config(load_config(config.as_ref())?);
            let result = validator.verify_revocation_values(
                &cert,
                tsa,
                &crls,
                &responses,
                validation_date(date),
            )?;
            let label = file.as_ref().map_or("stdin".into(), |p| p.display().to_string());
            print_result(&label, &result, json)?;
            let code = exit_code(result.result);
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Analyze { file, json } => {
            let cert = qtrust_lib::parse_cert(&read_input(file.as_ref())?)?;
            let report = analyze_json(&cert);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if let Some(fields) = report.as_object() {
                for (key, value) in fields {
                    match value {
                        serde_json::Value::String(s) => println!("{}: {}", key, s),
                        other => println!("{}: {}", key, other),
                    }
                }
            }
        }
        Commands::Mappings {
            file,
            tsl,
            config,
            mappings,
            policy,
            date,
            tsa,
            json,
        } => {
            let cert = qtrust_lib::parse_cert(&read_input(file.as_ref())?)?;
            let config = load_config(config.as_ref())?;
            let configured: Vec<TslCountryRegionMapping> = match &mappings {
                Some(path) => serde_json::from_slice(&read_file(path)?)
                    .with_context(|| format!("Invalid mappings JSON: {}", path.display()))?,
                None => Vec::new(),
            };
            let policy: BTreeMap<String, String> = policy.into_iter().collect();
            let merged = merged_mappings(
                &cert,
                load_tsl(&tsl)?,
                &tsl,
                configured,
                &policy,
                &config,
                validation_date(date),
                tsa,
            )?;
            if json {
                println!("{}", serde_json::to_string_pretty(&merged)?);
            } else {
                for (key, value) in &merged {
                    println!("{} = {}", key, value);
                }
            }
        }
        Commands::Batch {
            dir,
            tsl,
            config,
            date,
            failures_only,
            recurse,
        } => {
            if !dir.is_dir() {
                bail!("Not a directory: {}", dir.display());
            }
            let validator = TslValidator::new(load_tsl(&tsl)?, &RulesRegistry::default())?
                .with_config(load_config(config.as_ref())?);
            let date = validation_date(date);
            let files = find_cert_files(&dir, recurse);
            if files.is_empty() {
                bail!("No certificate files found in {}", dir.display());
            }
            info!(files = files.len(), dir = %dir.display(), "validating batch");
            let failures = run_batch(&files, failures_only, |path| {
                validate_file(&validator, path, date)
            });
            if failures > 0 {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}
