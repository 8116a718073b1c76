//! Revocation resolution for detected certificates.

use super::{RevocationServiceKind, TslValidator, DP_OR_AIA_SERVICE_NAME};
use crate::cert::Certificate;
use crate::identity::{spki_key_bits, IdentitySet};
use crate::mapping::MappingType;
use crate::result::{IssuerData, ResultCode, ValidationResult};
use crate::revocation::{
    format_crl_reason, Crl, OcspCertId, OcspCertStatus, OcspResponse, RevocationEvidence,
    REASON_REMOVE_FROM_CRL,
};
use crate::tsl::{DigitalIdentity, TrustServiceProvider, TspService};
use crate::QtrustError;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

/// Status decided from one piece of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Valid,
    Revoked {
        date: OffsetDateTime,
        reason: Option<u8>,
    },
}

/// What the checks need to know about the detection.
struct Context<'a> {
    cert: &'a Certificate,
    date: OffsetDateTime,
    tsp: &'a TrustServiceProvider,
    detect_identities: Vec<DigitalIdentity>,
    issuer: IssuerData,
    qualified: bool,
}

impl<'a> Context<'a> {
    fn new(
        cert: &'a Certificate,
        date: OffsetDateTime,
        tsp: &'a TrustServiceProvider,
        result: &ValidationResult,
    ) -> Self {
        Context {
            cert,
            date,
            tsp,
            detect_identities: result
                .tsp_service_for_detect
                .as_ref()
                .map(|s| s.digital_identities.clone())
                .unwrap_or_default(),
            issuer: result.issuer.clone(),
            qualified: result.mapping_type == MappingType::Qualified,
        }
    }

    fn issuer_key_bits(&self) -> Option<Vec<u8>> {
        self.issuer.public_key_spki.as_deref().and_then(spki_key_bits)
    }

    fn cert_id(&self) -> OcspCertId {
        OcspCertId::new(self.cert, &self.issuer_key_bits().unwrap_or_default())
    }
}

fn record(
    result: &mut ValidationResult,
    decision: Decision,
    evidence: RevocationEvidence,
    url: Option<&str>,
) {
    match decision {
        Decision::Valid => result.result = ResultCode::Valid,
        Decision::Revoked { date, reason } => result.set_revoked(date, reason),
    }
    result.revocation_evidence = Some(evidence);
    result.revocation_url = url.map(str::to_string);
}

fn set_validate_service(result: &mut ValidationResult, service: &TspService) {
    result.tsp_service_name_for_validate = service.name().map(str::to_string);
    result.tsp_service_for_validate = Some(service.clone());
}

impl TslValidator {
    /// Resolve a `DETECTED_UNKNOWN` result through the fetcher.
    ///
    /// The certificate's own OCSP responders and CRL distribution points
    /// are tried first, then the provider's CRL and OCSP services in the
    /// order the list declares them.
    pub(super) fn resolve_revocation(
        &self,
        cert: &Certificate,
        is_tsa: bool,
        date: OffsetDateTime,
        tsp: &TrustServiceProvider,
        result: &mut ValidationResult,
    ) -> Result<(), QtrustError> {
        let Some(fetcher) = self.fetcher.as_deref() else {
            debug!("no revocation fetcher configured; status stays unknown");
            return Ok(());
        };
        let ctx = Context::new(cert, date, tsp, result);
        let cert_id = ctx.cert_id();

        // Certificate distribution points and AIA.
        for url in cert.ocsp_urls() {
            let Some(response) = fetcher.fetch_ocsp(url, &cert_id)? else {
                continue;
            };
            if let Some(decision) = self.check_ocsp(&ctx, &response, None) {
                info!(url, source = "AIA", "revocation resolved by OCSP");
                record(result, decision, RevocationEvidence::Ocsp(response), Some(url));
                self.mark_dp_or_aia(result);
                return Ok(());
            }
        }
        for url in &cert.crl_distribution_points {
            let Some(crl) = fetcher.fetch_crl(url)? else {
                continue;
            };
            if let Some(decision) = self.check_crl(&ctx, &crl, None, is_tsa) {
                info!(url = %url, source = "CRL distribution point", "revocation resolved by CRL");
                record(result, decision, RevocationEvidence::Crl(crl), Some(url.as_str()));
                self.mark_dp_or_aia(result);
                return Ok(());
            }
        }

        if is_tsa {
            return Ok(());
        }

        // Provider revocation services, in list order.
        for (service, kind) in self.revocation_services(&ctx) {
            for url in &service.supply_points {
                let found = match kind {
                    RevocationServiceKind::Crl => fetcher.fetch_crl(url)?.and_then(|crl| {
                        self.check_crl(&ctx, &crl, Some(service), false)
                            .map(|d| (d, RevocationEvidence::Crl(crl)))
                    }),
                    RevocationServiceKind::Ocsp => {
                        fetcher.fetch_ocsp(url, &cert_id)?.and_then(|response| {
                            self.check_ocsp(&ctx, &response, Some(service))
                                .map(|d| (d, RevocationEvidence::Ocsp(response)))
                        })
                    }
                };
                if let Some((decision, evidence)) = found {
                    info!(
                        url = %url,
                        service = service.name().unwrap_or("-"),
                        ?kind,
                        "revocation resolved by TSL service"
                    );
                    record(result, decision, evidence, Some(url.as_str()));
                    set_validate_service(result, service);
                    return Ok(());
                }
            }
        }

        debug!("no revocation evidence resolved the certificate status");
        Ok(())
    }

    fn mark_dp_or_aia(&self, result: &mut ValidationResult) {
        result.from_dp_or_aia = true;
        result.tsp_service_name_for_validate = Some(DP_OR_AIA_SERVICE_NAME.to_string());
        result.tsp_service_for_validate = result.tsp_service_for_detect.clone();
    }

    /// Decide a `DETECTED_UNKNOWN` result from caller-supplied evidence.
    pub(super) fn resolve_with_supplied_evidence(
        &self,
        cert: &Certificate,
        date: OffsetDateTime,
        tsp: &TrustServiceProvider,
        crl: Option<&Crl>,
        ocsp: Option<&OcspResponse>,
        result: &mut ValidationResult,
    ) {
        let ctx = Context::new(cert, date, tsp, result);

        if let Some(detect_service) = result.tsp_service_for_detect.clone() {
            let found = ocsp
                .and_then(|r| {
                    self.check_ocsp(&ctx, r, Some(&detect_service))
                        .map(|d| (d, RevocationEvidence::Ocsp(r.clone())))
                })
                .or_else(|| {
                    crl.and_then(|c| {
                        self.check_crl(&ctx, c, Some(&detect_service), false)
                            .map(|d| (d, RevocationEvidence::Crl(c.clone())))
                    })
                });
            if let Some((decision, evidence)) = found {
                record(result, decision, evidence, None);
                set_validate_service(result, &detect_service);
                return;
            }
        }

        for service in &tsp.services {
            if !self.service_in_force(service, date) {
                continue;
            }
            let found = match self
                .rules
                .revocation_service_kind(&service.service_type, ctx.qualified)
            {
                Some(RevocationServiceKind::Crl) => crl.and_then(|c| {
                    self.check_crl(&ctx, c, Some(service), false)
                        .map(|d| (d, RevocationEvidence::Crl(c.clone())))
                }),
                Some(RevocationServiceKind::Ocsp) => ocsp.and_then(|r| {
                    self.check_ocsp(&ctx, r, Some(service))
                        .map(|d| (d, RevocationEvidence::Ocsp(r.clone())))
                }),
                None => None,
            };
            if let Some((decision, evidence)) = found {
                info!(service = service.name().unwrap_or("-"), "revocation resolved by supplied evidence");
                record(result, decision, evidence, None);
                set_validate_service(result, service);
                return;
            }
        }
        debug!("supplied evidence did not resolve the certificate status");
    }

    /// In-force CRL and OCSP services of the provider, in list order.
    fn revocation_services<'t>(
        &self,
        ctx: &Context<'t>,
    ) -> Vec<(&'t TspService, RevocationServiceKind)> {
        let tsp: &'t TrustServiceProvider = ctx.tsp;
        tsp.services
            .iter()
            .filter(|service| self.service_in_force(service, ctx.date))
            .filter_map(|service| {
                self.rules
                    .revocation_service_kind(&service.service_type, ctx.qualified)
                    .map(|kind| (service, kind))
            })
            .collect()
    }

    // ── CRL ──────────────────────────────────────────────────────────────

    /// Decide from a CRL, or `None` when the CRL cannot be used.
    ///
    /// TSA certificates resolved through their own distribution points
    /// skip the CRL issuer check.
    fn check_crl(
        &self,
        ctx: &Context<'_>,
        crl: &Crl,
        current: Option<&TspService>,
        is_tsa_distribution_point: bool,
    ) -> Option<Decision> {
        if !crl.is_issuer_of(ctx.cert) {
            debug!(issuer = %crl.issuer, "CRL not issued by the certificate issuer");
            return None;
        }
        if !crl.is_current_at(ctx.date) {
            debug!(issuer = %crl.issuer, "CRL not valid at validation date");
            return None;
        }
        if self.config.revocation.check_crl_issuer
            && !is_tsa_distribution_point
            && !self.crl_issuer_trusted(ctx, crl, current)
        {
            warn!(issuer = %crl.issuer, "CRL not signed by any TSL digital identity");
            return None;
        }

        match crl.entry_for(ctx.cert) {
            Some(entry) if entry.revocation_date < ctx.date => {
                if entry.reason == Some(REASON_REMOVE_FROM_CRL) {
                    Some(Decision::Valid)
                } else {
                    debug!(
                        reason = entry.reason.map_or("none", format_crl_reason),
                        "certificate listed in CRL"
                    );
                    Some(Decision::Revoked {
                        date: entry.revocation_date,
                        reason: entry.reason,
                    })
                }
            }
            _ => Some(Decision::Valid),
        }
    }

    /// The detect service, then in-force CRL services of the provider, then
    /// the service the CRL came from.
    fn crl_issuer_trusted(&self, ctx: &Context<'_>, crl: &Crl, current: Option<&TspService>) -> bool {
        if IdentitySet::new(&ctx.detect_identities).verifies_crl(crl) {
            return true;
        }
        if self
            .revocation_services(ctx)
            .into_iter()
            .any(|(s, kind)| {
                kind == RevocationServiceKind::Crl
                    && IdentitySet::new(&s.digital_identities).verifies_crl(crl)
            })
        {
            return true;
        }
        current.is_some_and(|s| IdentitySet::new(&s.digital_identities).verifies_crl(crl))
    }

    // ── OCSP ─────────────────────────────────────────────────────────────

    /// Decide from an OCSP response, or `None` when it cannot be used or
    /// answers `unknown`.
    fn check_ocsp(
        &self,
        ctx: &Context<'_>,
        response: &OcspResponse,
        current: Option<&TspService>,
    ) -> Option<Decision> {
        if let Err(e) = response.check_well_formed() {
            warn!(error = %e, "discarding OCSP response");
            return None;
        }
        let key_bits = ctx.issuer_key_bits();
        let single = response.single_response_for(ctx.cert, key_bits.as_deref())?;

        let tolerance = Duration::seconds(
            i64::try_from(self.config.revocation.ocsp_time_interval_allowed_secs).unwrap_or(i64::MAX),
        );
        if !single.is_current_at(ctx.date, tolerance) {
            debug!("OCSP response not current at validation date");
            return None;
        }

        let Some(signer) = response.signer() else {
            warn!("OCSP response carries no signer certificate");
            return None;
        };
        let trusted = IdentitySet::new(&ctx.detect_identities).matches_ocsp_signer(&signer, &ctx.issuer)
            || current.is_some_and(|s| {
                IdentitySet::new(&s.digital_identities).matches_ocsp_signer(&signer, &ctx.issuer)
            });
        if !trusted {
            warn!(signer = %signer.subject, "OCSP signer not trusted by the TSL");
            return None;
        }

        match single.cert_status {
            OcspCertStatus::Good => Some(Decision::Valid),
            OcspCertStatus::Revoked {
                revocation_time,
                reason,
            } => {
                if revocation_time > ctx.date || reason == Some(REASON_REMOVE_FROM_CRL) {
                    Some(Decision::Valid)
                } else {
                    Some(Decision::Revoked {
                        date: revocation_time,
                        reason,
                    })
                }
            }
            OcspCertStatus::Unknown => {
                debug!("OCSP responder does not know the certificate");
                None
            }
        }
    }
}
