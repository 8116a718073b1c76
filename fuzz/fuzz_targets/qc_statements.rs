#![no_main]

use libfuzzer_sys::fuzz_target;
use qtrust_lib::analyzer::parse_qc_statements;

fuzz_target!(|data: &[u8]| {
    // The QcStatements decoder sees attacker-controlled extension bytes.
    let _ = parse_qc_statements(data);
});
