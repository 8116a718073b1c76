#![no_main]

use libfuzzer_sys::fuzz_target;
use qtrust_lib::{mapping, parse_cert, CertField, ExtensionAnalyzer};

fuzz_target!(|data: &[u8]| {
    // Parsing and every derived view must never panic, whatever the input.
    if let Ok(cert) = parse_cert(data) {
        let _ = cert.subject.to_oneline();
        let _ = cert.issuer.to_oneline();
        let _ = cert.ocsp_urls();
        let _ = cert.subject_key_id();
        for id in 0..16 {
            if let Some(field) = CertField::from_id(id) {
                let _ = cert.field(field);
            }
        }

        let analyzer = ExtensionAnalyzer::new(&cert);
        let _ = analyzer.has_qc_statements();
        let _ = mapping::mapping_type_qualified(&analyzer);
        let _ = mapping::mapping_classification(&analyzer, true);
        let _ = mapping::mapping_qscd(&analyzer);
    }
});
