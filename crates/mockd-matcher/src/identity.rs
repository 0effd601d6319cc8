//! Client identity extraction from peer certificates.
//!
//! The TLS listener hands us the peer's DER certificate at handshake time;
//! we decode it once into a [`ClientIdentity`] and attach it to the request
//! extensions, where handlers and the mTLS matcher read it without ever
//! touching the certificate again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockd_core::{ClientIdentity, IssuerIdentity, SubjectAltNames};
use sha2::{Digest, Sha256};
use thiserror::Error;
use x509_parser::prelude::{FromDer, GeneralName, X509Certificate};

/// Errors from peer-certificate decoding.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("failed to parse peer certificate: {0}")]
    Parse(String),
}

/// Build a [`ClientIdentity`] from a DER-encoded peer certificate.
///
/// `verified` records whether the chain verified against the configured
/// roots; matching on `require_client_auth` keys off it.
pub fn identity_from_der(der: &[u8], verified: bool) -> Result<ClientIdentity, IdentityError> {
    let (_, cert) =
        X509Certificate::from_der(der).map_err(|e| IdentityError::Parse(e.to_string()))?;

    let subject = cert.subject();
    let issuer = cert.issuer();

    let mut sans = SubjectAltNames::default();
    if let Ok(Some(ext)) = cert.subject_alternative_name() {
        for name in &ext.value.general_names {
            match name {
                GeneralName::DNSName(dns) => sans.dns.push((*dns).to_string()),
                GeneralName::RFC822Name(email) => sans.email.push((*email).to_string()),
                GeneralName::IPAddress(bytes) => {
                    if let Some(ip) = format_ip(bytes) {
                        sans.ip.push(ip);
                    }
                }
                GeneralName::URI(uri) => sans.uri.push((*uri).to_string()),
                _ => {}
            }
        }
    }

    Ok(ClientIdentity {
        common_name: first_attr(subject.iter_common_name()),
        organization: all_attrs(subject.iter_organization()),
        organizational_unit: all_attrs(subject.iter_organizational_unit()),
        country: all_attrs(subject.iter_country()),
        serial_number: cert.raw_serial_as_string(),
        issuer: IssuerIdentity {
            common_name: first_attr(issuer.iter_common_name()),
            organization: all_attrs(issuer.iter_organization()),
        },
        not_before: timestamp(cert.validity().not_before.timestamp()),
        not_after: timestamp(cert.validity().not_after.timestamp()),
        sans,
        fingerprint: hex::encode(Sha256::digest(der)),
        verified,
    })
}

/// Attach an identity to request extensions. Read-only from then on.
pub fn attach_identity(extensions: &mut http::Extensions, identity: ClientIdentity) {
    extensions.insert(PeerIdentity(Arc::new(identity)));
}

/// Retrieve the identity attached at handshake time, if any.
pub fn identity_from_extensions(extensions: &http::Extensions) -> Option<Arc<ClientIdentity>> {
    extensions.get::<PeerIdentity>().map(|p| Arc::clone(&p.0))
}

#[derive(Debug, Clone)]
struct PeerIdentity(Arc<ClientIdentity>);

fn first_attr<'a>(
    mut iter: impl Iterator<Item = &'a x509_parser::x509::AttributeTypeAndValue<'a>>,
) -> String {
    iter.next()
        .and_then(|attr| attr.as_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn all_attrs<'a>(
    iter: impl Iterator<Item = &'a x509_parser::x509::AttributeTypeAndValue<'a>>,
) -> Vec<String> {
    iter.filter_map(|attr| attr.as_str().ok().map(str::to_string))
        .collect()
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

fn format_ip(bytes: &[u8]) -> Option<String> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(std::net::Ipv4Addr::from(octets).to_string())
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(std::net::Ipv6Addr::from(octets).to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_der_is_a_parse_error() {
        let err = identity_from_der(b"not a certificate", true).unwrap_err();
        assert!(matches!(err, IdentityError::Parse(_)));
    }

    #[test]
    fn identity_round_trips_through_extensions() {
        let mut extensions = http::Extensions::new();
        assert!(identity_from_extensions(&extensions).is_none());

        let identity = ClientIdentity {
            common_name: "client".into(),
            verified: true,
            ..Default::default()
        };
        attach_identity(&mut extensions, identity.clone());

        let retrieved = identity_from_extensions(&extensions).unwrap();
        assert_eq!(*retrieved, identity);
    }

    #[test]
    fn ip_formatting() {
        assert_eq!(format_ip(&[10, 0, 0, 8]).unwrap(), "10.0.0.8");
        assert_eq!(format_ip(&[0; 16]).unwrap(), "::");
        assert!(format_ip(&[1, 2, 3]).is_none());
    }
}
