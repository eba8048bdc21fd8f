//! Algorithm descriptors and naming.

use crate::config::GlueConfig;
use crate::error::{GlueError, Result};
use crate::tfm::{Aead, Skcipher};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Creates a transform handle with a fresh cipher context.
pub type SkcipherInit = fn(&AlgorithmDescriptor) -> Result<Box<dyn Skcipher>>;
pub type AeadInit = fn(&AlgorithmDescriptor) -> Result<Box<dyn Aead>>;

/// Verifies a descriptor before it is published.
pub type SelfTest = fn(&AlgorithmDescriptor) -> Result<()>;

#[derive(Clone, Copy)]
pub enum TransformKind {
    Skcipher(SkcipherInit),
    Aead(AeadInit),
}

/// Everything the registry knows about one algorithm implementation.
#[derive(Clone)]
pub struct AlgorithmDescriptor {
    /// Logical name, `"<mode>(<cipher>)"`
    pub name: String,
    /// Implementation name, unique per registry
    pub driver_name: String,
    pub priority: u32,
    pub block_size: usize,
    pub min_keysize: usize,
    pub max_keysize: usize,
    pub ivsize: usize,
    /// Zero for unauthenticated ciphers
    pub maxauthsize: usize,
    pub min_authsize: usize,
    /// Certification rules apply (e.g. distinct XTS key halves)
    pub fips: bool,
    pub kind: TransformKind,
    pub self_test: SelfTest,
}

impl AlgorithmDescriptor {
    pub fn is_aead(&self) -> bool {
        matches!(self.kind, TransformKind::Aead(_))
    }

    pub fn instantiate_skcipher(&self) -> Result<Box<dyn Skcipher>> {
        match self.kind {
            TransformKind::Skcipher(init) => init(self),
            TransformKind::Aead(_) => Err(GlueError::NotAvailable(format!(
                "{} is an AEAD, not a skcipher",
                self.driver_name
            ))),
        }
    }

    pub fn instantiate_aead(&self) -> Result<Box<dyn Aead>> {
        match self.kind {
            TransformKind::Aead(init) => init(self),
            TransformKind::Skcipher(_) => Err(GlueError::NotAvailable(format!(
                "{} is a skcipher, not an AEAD",
                self.driver_name
            ))),
        }
    }

    pub fn run_self_test(&self) -> Result<()> {
        (self.self_test)(self)
    }

    pub fn summary(&self) -> AlgorithmSummary {
        AlgorithmSummary {
            name: self.name.clone(),
            driver_name: self.driver_name.clone(),
            priority: self.priority,
            kind: if self.is_aead() { "aead" } else { "skcipher" }.to_string(),
            block_size: self.block_size,
            min_keysize: self.min_keysize,
            max_keysize: self.max_keysize,
            ivsize: self.ivsize,
            maxauthsize: self.is_aead().then_some(self.maxauthsize),
        }
    }
}

impl fmt::Debug for AlgorithmDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmDescriptor")
            .field("name", &self.name)
            .field("driver_name", &self.driver_name)
            .field("priority", &self.priority)
            .field("kind", &if self.is_aead() { "aead" } else { "skcipher" })
            .field("keysize", &(self.min_keysize..=self.max_keysize))
            .field("ivsize", &self.ivsize)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a descriptor for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmSummary {
    pub name: String,
    pub driver_name: String,
    pub priority: u32,
    pub kind: String,
    pub block_size: usize,
    pub min_keysize: usize,
    pub max_keysize: usize,
    pub ivsize: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxauthsize: Option<usize>,
}

/// `"<mode>(<cipher>)"`
pub fn algorithm_name(mode: &str, cipher: &str) -> String {
    format!("{mode}({cipher})")
}

/// `"<mode>-<cipher>"` plus the ISA and certification suffixes.
pub fn driver_name(mode: &str, cipher: &str, config: &GlueConfig) -> String {
    format!("{mode}-{cipher}{}{}", isa_suffix(), config.fips.suffix())
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
cpufeatures::new!(aesni_cpuid, "aes");

/// `"-aesni"` when the `aes` crate will run on AES-NI.
pub fn isa_suffix() -> &'static str {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if aesni_cpuid::get() {
            return "-aesni";
        }
    }
    ""
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FipsMode;

    #[test]
    fn test_names() {
        assert_eq!(algorithm_name("gcm", "aes"), "gcm(aes)");

        let config = GlueConfig {
            fips: FipsMode::Fips140_3,
            ..GlueConfig::default()
        };
        let name = driver_name("xts", "aes", &config);
        assert!(name.starts_with("xts-aes"));
        assert!(name.ends_with("-fips-140-3"));
        assert_eq!(
            name,
            format!("xts-aes{}-fips-140-3", isa_suffix())
        );
    }

    #[test]
    fn test_isa_suffix_is_known() {
        assert!(["", "-aesni"].contains(&isa_suffix()));
    }

    #[test]
    fn test_wrong_kind_is_not_available() {
        let descriptor = crate::modes::gcm::descriptor(&GlueConfig::default());
        assert!(descriptor.is_aead());
        assert!(matches!(
            descriptor.instantiate_skcipher(),
            Err(GlueError::NotAvailable(_))
        ));
        assert!(descriptor.instantiate_aead().is_ok());

        let summary = descriptor.summary();
        assert_eq!(summary.kind, "aead");
        assert_eq!(summary.maxauthsize, Some(16));
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("gcm(aes)"));
    }
}
