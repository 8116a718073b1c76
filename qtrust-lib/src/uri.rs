//! ETSI TS 119612 URIs for TSL types, service types, service statuses,
//! qualifiers and additional service information.

// ── TSL types ────────────────────────────────────────────────────────────

pub const TSL_TYPE_PREFIX: &str = "http://uri.etsi.org/TrstSvc/TrustedList/TSLType/";
pub const TSL_TYPE_EU_GENERIC: &str = "http://uri.etsi.org/TrstSvc/TrustedList/TSLType/EUgeneric";
pub const TSL_TYPE_EU_LIST_OF_LISTS: &str =
    "http://uri.etsi.org/TrstSvc/TrustedList/TSLType/EUlistofthelists";
/// Non-EU lists of lists are `<prefix><territory>listofthelists`.
pub const TSL_TYPE_LIST_OF_LISTS_SUFFIX: &str = "listofthelists";

// ── Service types ────────────────────────────────────────────────────────

pub const SVC_CA_QC: &str = "http://uri.etsi.org/TrstSvc/Svctype/CA/QC";
pub const SVC_CA_PKC: &str = "http://uri.etsi.org/TrstSvc/Svctype/CA/PKC";
pub const SVC_NATIONAL_ROOT_CA_QC: &str = "http://uri.etsi.org/TrstSvc/Svctype/NationalRootCA-QC";
pub const SVC_TSA_QTST: &str = "http://uri.etsi.org/TrstSvc/Svctype/TSA/QTST";
pub const SVC_TSA: &str = "http://uri.etsi.org/TrstSvc/Svctype/TSA";
pub const SVC_TSA_TSS_QC: &str = "http://uri.etsi.org/TrstSvc/Svctype/TSA/TSS-QC";
pub const SVC_TSA_TSS_ADES_QC_QES: &str =
    "http://uri.etsi.org/TrstSvc/Svctype/TSA/TSS-AdESQCandQES";
pub const SVC_CERTSTATUS_CRL_QC: &str = "http://uri.etsi.org/TrstSvc/Svctype/Certstatus/CRL/QC";
pub const SVC_CERTSTATUS_CRL: &str = "http://uri.etsi.org/TrstSvc/Svctype/Certstatus/CRL";
pub const SVC_CERTSTATUS_OCSP_QC: &str = "http://uri.etsi.org/TrstSvc/Svctype/Certstatus/OCSP/QC";
pub const SVC_CERTSTATUS_OCSP: &str = "http://uri.etsi.org/TrstSvc/Svctype/Certstatus/OCSP";

// ── Service statuses (TS 119612 v2) ──────────────────────────────────────

pub const STATUS_GRANTED: &str = "http://uri.etsi.org/TrstSvc/TrustedList/Svcstatus/granted";
pub const STATUS_RECOGNISED_AT_NATIONAL_LEVEL: &str =
    "http://uri.etsi.org/TrstSvc/TrustedList/Svcstatus/recognisedatnationallevel";
pub const STATUS_WITHDRAWN: &str = "http://uri.etsi.org/TrstSvc/TrustedList/Svcstatus/withdrawn";
pub const STATUS_DEPRECATED_AT_NATIONAL_LEVEL: &str =
    "http://uri.etsi.org/TrstSvc/TrustedList/Svcstatus/deprecatedatnationallevel";

// ── Legacy service statuses (Directive 1999/93/EC lists) ─────────────────

pub const STATUS_UNDER_SUPERVISION: &str =
    "http://uri.etsi.org/TrstSvc/eSigDir-1999-93-EC-TrustedList/Svcstatus/undersupervision";
pub const STATUS_SUPERVISION_IN_CESSATION: &str =
    "http://uri.etsi.org/TrstSvc/eSigDir-1999-93-EC-TrustedList/Svcstatus/supervisionincessation";
pub const STATUS_SUPERVISION_CEASED: &str =
    "http://uri.etsi.org/TrstSvc/eSigDir-1999-93-EC-TrustedList/Svcstatus/supervisionceased";
pub const STATUS_SUPERVISION_REVOKED: &str =
    "http://uri.etsi.org/TrstSvc/eSigDir-1999-93-EC-TrustedList/Svcstatus/supervisionrevoked";
pub const STATUS_ACCREDITED: &str =
    "http://uri.etsi.org/TrstSvc/eSigDir-1999-93-EC-TrustedList/Svcstatus/accredited";
pub const STATUS_ACCREDITATION_CEASED: &str =
    "http://uri.etsi.org/TrstSvc/eSigDir-1999-93-EC-TrustedList/Svcstatus/accreditationceased";
pub const STATUS_ACCREDITATION_REVOKED: &str =
    "http://uri.etsi.org/TrstSvc/eSigDir-1999-93-EC-TrustedList/Svcstatus/accreditationrevoked";
pub const STATUS_SET_BY_NATIONAL_LAW: &str =
    "http://uri.etsi.org/TrstSvc/eSigDir-1999-93-EC-TrustedList/Svcstatus/setbynationallaw";
pub const STATUS_DEPRECATED_BY_NATIONAL_LAW: &str =
    "http://uri.etsi.org/TrstSvc/eSigDir-1999-93-EC-TrustedList/Svcstatus/deprecatedbynationallaw";

// ── Qualifiers (Qualifications extension) ────────────────────────────────

pub const QUALIFIER_PREFIX: &str = "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/";
pub const Q_WITH_SSCD: &str = "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/QCWithSSCD";
pub const Q_NO_SSCD: &str = "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/QCNoSSCD";
pub const Q_SSCD_AS_IN_CERT: &str =
    "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/QCSSCDStatusAsInCert";
pub const Q_WITH_QSCD: &str = "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/QCWithQSCD";
pub const Q_NO_QSCD: &str = "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/QCNoQSCD";
pub const Q_QSCD_AS_IN_CERT: &str =
    "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/QCQSCDStatusAsInCert";
pub const Q_QSCD_MANAGED_ON_BEHALF: &str =
    "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/QCQSCDManagedOnBehalf";
pub const Q_FOR_LEGAL_PERSON: &str =
    "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/QCForLegalPerson";
pub const Q_FOR_ESIG: &str = "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/QCForESig";
pub const Q_FOR_ESEAL: &str = "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/QCForESeal";
pub const Q_FOR_WSA: &str = "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/QCForWSA";
pub const Q_NOT_QUALIFIED: &str = "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/NotQualified";
pub const Q_QC_STATEMENT: &str = "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/QCStatement";

// ── AdditionalServiceInformation ─────────────────────────────────────────

pub const ASI_ROOT_CA_QC: &str = "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/RootCA-QC";
pub const ASI_FOR_ESIGNATURES: &str =
    "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/ForeSignatures";
pub const ASI_FOR_ESEALS: &str = "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/ForeSeals";
pub const ASI_FOR_WEB_SITE_AUTHENTICATION: &str =
    "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/ForWebSiteAuthentication";

// ── TSL specifications ───────────────────────────────────────────────────

pub const SPECIFICATION_119612: &str = "119612";
pub const VERSION_020101: &str = "020101";

/// Case-insensitive URI comparison, ignoring surrounding whitespace.
pub fn uri_eq(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
