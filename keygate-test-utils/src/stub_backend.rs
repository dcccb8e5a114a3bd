use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use keygate_types::{
    KeyAlias, SignatureScheme,
    backend::{BackendError, ContentSigner, KeyCustodyBackend, SigningHandle},
    crypto::{PublicKey, Signature},
};
use parking_lot::Mutex;

/// Every signature of the stub is this many zero bytes.
pub const STUB_SIGNATURE_LEN: usize = 64;

/// The primitives of [`StubKeyCustody`] that can be configured and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StubPrimitive {
    GenerateKeyPair,
    ContainsKey,
    GetPublicKey,
    Sign,
    GetSigner,
    SignerSign,
    DefaultSchemes,
}

/// What a primitive does before it returns.
#[derive(Debug, Clone, Copy)]
pub enum StubBehavior {
    /// Sleeps asynchronously.
    Sleep(Duration),
    /// Blocks the executing thread, like a synchronous HSM driver would.
    BlockThread(Duration),
    /// Never returns.
    Hang,
}

impl StubBehavior {
    async fn apply(self) {
        match self {
            StubBehavior::Sleep(duration) => tokio::time::sleep(duration).await,
            StubBehavior::BlockThread(duration) => std::thread::sleep(duration),
            StubBehavior::Hang => std::future::pending::<()>().await,
        }
    }
}

#[derive(Default)]
struct Counters(Mutex<HashMap<StubPrimitive, usize>>);

impl Counters {
    fn record(&self, primitive: StubPrimitive) {
        *self.0.lock().entry(primitive).or_default() += 1;
    }

    fn get(&self, primitive: StubPrimitive) -> usize {
        self.0.lock().get(&primitive).copied().unwrap_or_default()
    }
}

/// A key-custody backend without real cryptography.
///
/// Supports only `EDDSA_ED25519_SHA512`. Public keys are 32 bytes derived from the alias, signatures are
/// [`STUB_SIGNATURE_LEN`] zero bytes. Each primitive can be slowed down or made to hang with
/// [`StubKeyCustody::with`], and counts how often it ran to completion.
#[derive(Default)]
pub struct StubKeyCustody {
    behaviors: HashMap<StubPrimitive, StubBehavior>,
    keys: Mutex<HashMap<KeyAlias, PublicKey>>,
    completed: Arc<Counters>,
}

impl StubKeyCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures `primitive` to show `behavior` before returning.
    pub fn with(mut self, primitive: StubPrimitive, behavior: StubBehavior) -> Self {
        self.behaviors.insert(primitive, behavior);
        self
    }

    /// How often `primitive` ran to completion (successful or not).
    pub fn completed(&self, primitive: StubPrimitive) -> usize {
        self.completed.get(primitive)
    }

    /// Stores a key for `alias` without going through [`KeyCustodyBackend::generate_key_pair`].
    pub fn insert_key(&self, alias: &KeyAlias) -> PublicKey {
        let public_key = stub_public_key(alias);
        self.keys.lock().insert(alias.clone(), public_key.clone());
        public_key
    }

    async fn run(&self, primitive: StubPrimitive) {
        if let Some(behavior) = self.behaviors.get(&primitive) {
            behavior.apply().await;
        }
    }

    fn lookup(&self, alias: &KeyAlias) -> Result<PublicKey, BackendError> {
        self.keys
            .lock()
            .get(alias)
            .cloned()
            .ok_or_else(|| BackendError::KeyNotFound(alias.clone()))
    }
}

fn stub_public_key(alias: &KeyAlias) -> PublicKey {
    let mut bytes = vec![0u8; 32];
    for (byte, alias_byte) in bytes.iter_mut().zip(alias.as_str().bytes()) {
        *byte = alias_byte;
    }
    PublicKey::new(SignatureScheme::EddsaEd25519Sha512, bytes)
}

#[async_trait]
impl KeyCustodyBackend for StubKeyCustody {
    async fn generate_key_pair(
        &self,
        alias: &KeyAlias,
        scheme: SignatureScheme,
    ) -> Result<PublicKey, BackendError> {
        self.run(StubPrimitive::GenerateKeyPair).await;
        self.completed.record(StubPrimitive::GenerateKeyPair);
        if scheme != SignatureScheme::EddsaEd25519Sha512 {
            return Err(BackendError::UnsupportedScheme(scheme));
        }
        let mut keys = self.keys.lock();
        if keys.contains_key(alias) {
            return Err(BackendError::AliasExists(alias.clone()));
        }
        let public_key = stub_public_key(alias);
        keys.insert(alias.clone(), public_key.clone());
        Ok(public_key)
    }

    async fn contains_key(&self, alias: &KeyAlias) -> Result<bool, BackendError> {
        self.run(StubPrimitive::ContainsKey).await;
        self.completed.record(StubPrimitive::ContainsKey);
        Ok(self.keys.lock().contains_key(alias))
    }

    async fn get_public_key(&self, alias: &KeyAlias) -> Result<PublicKey, BackendError> {
        self.run(StubPrimitive::GetPublicKey).await;
        self.completed.record(StubPrimitive::GetPublicKey);
        self.lookup(alias)
    }

    async fn sign(&self, alias: &KeyAlias, _data: &[u8]) -> Result<Signature, BackendError> {
        self.run(StubPrimitive::Sign).await;
        self.completed.record(StubPrimitive::Sign);
        self.lookup(alias)?;
        Ok(Signature::new(vec![0; STUB_SIGNATURE_LEN]))
    }

    async fn get_signer(&self, alias: &KeyAlias) -> Result<SigningHandle, BackendError> {
        self.run(StubPrimitive::GetSigner).await;
        self.completed.record(StubPrimitive::GetSigner);
        let public_key = self.lookup(alias)?;
        Ok(Arc::new(StubSigner {
            alias: alias.clone(),
            public_key,
            behavior: self.behaviors.get(&StubPrimitive::SignerSign).copied(),
            completed: Arc::clone(&self.completed),
        }))
    }

    async fn default_identity_signature_scheme(&self) -> Result<SignatureScheme, BackendError> {
        self.run(StubPrimitive::DefaultSchemes).await;
        self.completed.record(StubPrimitive::DefaultSchemes);
        Ok(SignatureScheme::EddsaEd25519Sha512)
    }

    async fn default_tls_signature_scheme(&self) -> Result<SignatureScheme, BackendError> {
        self.run(StubPrimitive::DefaultSchemes).await;
        self.completed.record(StubPrimitive::DefaultSchemes);
        Ok(SignatureScheme::EddsaEd25519Sha512)
    }
}

struct StubSigner {
    alias: KeyAlias,
    public_key: PublicKey,
    behavior: Option<StubBehavior>,
    completed: Arc<Counters>,
}

#[async_trait]
impl ContentSigner for StubSigner {
    fn alias(&self) -> &KeyAlias {
        &self.alias
    }

    fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    async fn sign(&self, _data: &[u8]) -> Result<Signature, BackendError> {
        if let Some(behavior) = self.behavior {
            behavior.apply().await;
        }
        self.completed.record(StubPrimitive::SignerSign);
        Ok(Signature::new(vec![0; STUB_SIGNATURE_LEN]))
    }
}
