use super::{CertificateGenerator, GeneratorError, TlsMaterial};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use time::{Duration, OffsetDateTime};

/// Names every generated certificate covers in addition to the requested ones.
const LOCAL_NAMES: [&str; 2] = ["localhost", "127.0.0.1"];

/// Issues short-lived self-signed certificates with rcgen.
#[derive(Debug, Clone)]
pub struct SelfSignedGenerator {
    validity: Duration,
}

impl Default for SelfSignedGenerator {
    fn default() -> Self {
        Self {
            validity: Duration::days(1),
        }
    }
}

impl SelfSignedGenerator {
    pub fn with_validity(validity: Duration) -> Self {
        Self { validity }
    }
}

impl CertificateGenerator for SelfSignedGenerator {
    fn generate(&self, subject_names: &[String]) -> Result<TlsMaterial, GeneratorError> {
        let mut names: Vec<String> = Vec::with_capacity(subject_names.len() + LOCAL_NAMES.len());
        for name in subject_names
            .iter()
            .map(String::as_str)
            .chain(LOCAL_NAMES)
        {
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }

        let common_name = names.first().cloned().unwrap_or_else(|| "localhost".to_string());
        let mut params = CertificateParams::new(names)?;

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        dn.push(DnType::OrganizationName, "HAR Replay");
        params.distinguished_name = dn;

        // Backdate by 1 hour to allow for clock skew.
        let now = OffsetDateTime::now_utc();
        params.not_before = now.checked_sub(Duration::hours(1)).unwrap_or(now);
        params.not_after = now.checked_add(self.validity).unwrap_or(now);

        let key_pair = KeyPair::generate()?;
        let cert = params.self_signed(&key_pair)?;

        Ok(TlsMaterial::new(
            key_pair.serialize_pem().into_bytes(),
            cert.pem().into_bytes(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_usable_pem_pair() {
        let material = SelfSignedGenerator::default()
            .generate(&["api.test".to_string(), "localhost".to_string()])
            .unwrap();

        let cert = String::from_utf8(material.cert_pem().to_vec()).unwrap();
        let key = String::from_utf8(material.key_pem().to_vec()).unwrap();
        assert!(cert.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(key.contains("PRIVATE KEY-----"));
        assert!(material.acceptor().is_ok());
    }

    #[test]
    fn generates_without_subject_names() {
        let material = SelfSignedGenerator::with_validity(Duration::hours(2))
            .generate(&[])
            .unwrap();
        assert!(material.acceptor().is_ok());
    }
}
