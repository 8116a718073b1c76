//! Matching certificates, CRLs and OCSP signers against the digital
//! identities of a trust service.

use crate::cert::{self, Certificate, DistinguishedName};
use crate::result::IssuerData;
use crate::revocation::Crl;
use crate::tsl::DigitalIdentity;
use x509_parser::prelude::*;

/// The digital identities of one service (or history instance).
#[derive(Debug, Clone, Copy)]
pub(crate) struct IdentitySet<'a> {
    identities: &'a [DigitalIdentity],
}

impl<'a> IdentitySet<'a> {
    pub(crate) fn new(identities: &'a [DigitalIdentity]) -> Self {
        IdentitySet { identities }
    }

    fn certificates(&self) -> impl Iterator<Item = &'a [u8]> {
        self.identities.iter().filter_map(|id| match id {
            DigitalIdentity::X509Certificate { der } => Some(der.as_slice()),
            _ => None,
        })
    }

    fn public_keys(&self) -> impl Iterator<Item = &'a [u8]> {
        self.identities.iter().filter_map(|id| match id {
            DigitalIdentity::PublicKey { spki } => Some(spki.as_slice()),
            _ => None,
        })
    }

    fn subject_names(&self) -> impl Iterator<Item = DistinguishedName> + 'a {
        self.identities.iter().filter_map(|id| match id {
            DigitalIdentity::SubjectName { name } => DistinguishedName::parse(name),
            _ => None,
        })
    }

    fn key_ids(&self) -> impl Iterator<Item = &'a [u8]> {
        self.identities.iter().filter_map(|id| match id {
            DigitalIdentity::SubjectKeyId { ski } => Some(ski.as_slice()),
            _ => None,
        })
    }

    /// Whether one of the identities issued `cert`.
    ///
    /// Certificate identities are tried first. Public keys, subject names
    /// and key identifiers fill in whatever issuer data is still missing.
    /// A subject name only counts together with a key identifier equal to
    /// the certificate's authority key identifier.
    pub(crate) fn issued_by(&self, cert: &Certificate) -> Option<IssuerData> {
        let x509 = cert.x509().ok()?;
        let mut data = IssuerData::default();
        let mut detected = false;

        for der in self.certificates() {
            let Ok((_, parent)) = X509Certificate::from_der(der) else {
                continue;
            };
            if x509.verify_signature(Some(parent.public_key())).is_err() {
                continue;
            }
            detected = true;
            data.certificate = cert::parse_der(der).ok();
            data.public_key_spki = Some(parent.public_key().raw.to_vec());
            data.subject_name = Some(cert::build_dn(parent.subject()));
            if !cert.is_self_issued() {
                data.ski = data
                    .certificate
                    .as_ref()
                    .and_then(|c| c.subject_key_id().map(<[u8]>::to_vec));
            }
            break;
        }

        if detected && data.subject_name.is_some() && data.ski.is_some() {
            return Some(data);
        }

        if data.public_key_spki.is_none() {
            for spki_der in self.public_keys() {
                let Ok((_, spki)) = SubjectPublicKeyInfo::from_der(spki_der) else {
                    continue;
                };
                if x509.verify_signature(Some(&spki)).is_ok() {
                    detected = true;
                    data.public_key_spki = Some(spki_der.to_vec());
                    break;
                }
            }
        }

        if data.subject_name.is_none() {
            let issuer = cert.issuer.canonical();
            data.subject_name = self.subject_names().find(|name| name.canonical() == issuer);
        }

        if data.subject_name.is_some() && data.ski.is_none() && !cert.is_self_issued() {
            if let Some(aki) = cert.authority_key_id() {
                if let Some(ski) = self.key_ids().find(|ski| *ski == aki) {
                    detected = true;
                    data.ski = Some(ski.to_vec());
                }
            }
        }

        detected.then_some(data)
    }

    /// Whether `cert` is itself one of the certificate identities.
    pub(crate) fn contains_certificate(&self, cert: &Certificate) -> bool {
        self.certificates().any(|der| der == cert.der())
    }

    /// Whether the CRL is signed by one of the identities.
    pub(crate) fn verifies_crl(&self, crl: &Crl) -> bool {
        let from_certs = self.certificates().any(|der| {
            X509Certificate::from_der(der)
                .map(|(_, c)| crl.verify_with_spki(c.public_key().raw))
                .unwrap_or(false)
        });
        from_certs || self.public_keys().any(|spki| crl.verify_with_spki(spki))
    }

    /// Whether `signer` may sign OCSP responses for certificates issued by
    /// `issuer`.
    pub(crate) fn matches_ocsp_signer(&self, signer: &Certificate, issuer: &IssuerData) -> bool {
        if self.contains_certificate(signer) {
            return true;
        }

        let Ok(signer_x509) = signer.x509() else {
            return false;
        };
        let signer_spki = signer_x509.public_key().raw;
        if self.public_keys().any(|spki| spki == signer_spki) {
            let subject = signer.subject.canonical();
            if self.subject_names().any(|name| name.canonical() == subject) {
                return true;
            }
        }

        let Some(issuer_cert) = issuer.certificate.as_ref() else {
            return false;
        };
        if issuer_cert.der() == signer.der() {
            return true;
        }

        // Delegated responder: issued by the CA and marked for OCSP signing.
        let Ok(issuer_x509) = issuer_cert.x509() else {
            return false;
        };
        if signer_x509
            .verify_signature(Some(issuer_x509.public_key()))
            .is_err()
        {
            return false;
        }
        matches!(
            signer_x509.extended_key_usage(),
            Ok(Some(eku)) if eku.value.ocsp_signing
        )
    }
}

/// The BIT STRING contents of a DER SubjectPublicKeyInfo.
pub(crate) fn spki_key_bits(spki_der: &[u8]) -> Option<Vec<u8>> {
    SubjectPublicKeyInfo::from_der(spki_der)
        .ok()
        .map(|(_, spki)| spki.subject_public_key.data.to_vec())
}
