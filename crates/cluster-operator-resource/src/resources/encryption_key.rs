//! etcd encryption key Secret in the host cluster
//!
//! Secret `<clusterID>-encryption` holds a base64 encoded 32 byte AES key
//! under `encryption`. A key is generated once and never rotated: replacing
//! it would make existing etcd data unreadable.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use rand::RngCore;
use tracing::info;

use cluster_operator_common::key::{
    cluster_guest_config, cluster_labels, encryption_key_secret_name, ClusterObject,
};
use cluster_operator_common::Result;

use crate::clients::HostClient;
use crate::diff::{single_delete_patch, single_update_patch};
use crate::resource::{CrudResource, Patch, ReconcileContext};
use crate::resources::{created, deleted, found, missing};

/// Resource name
pub const NAME: &str = "encryptionkey";

/// Data key holding the encryption key
pub const ENCRYPTION_KEY_DATA: &str = "encryption";

/// Length of generated keys in bytes
pub const KEY_LEN: usize = 32;

/// Source of new encryption keys
pub trait KeyGenerator: Send + Sync {
    /// Generate raw key material
    fn generate(&self) -> Vec<u8>;
}

/// Generates keys from the thread local CSPRNG
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomKeyGenerator;

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self) -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        key
    }
}

/// Manages the encryption key Secret of a tenant cluster
pub struct EncryptionKeyResource {
    host: Arc<dyn HostClient>,
    namespace: String,
    keys: Arc<dyn KeyGenerator>,
}

impl EncryptionKeyResource {
    /// Start building the resource
    pub fn builder() -> EncryptionKeyResourceBuilder {
        EncryptionKeyResourceBuilder::default()
    }
}

/// Builder for [`EncryptionKeyResource`]
#[derive(Default)]
pub struct EncryptionKeyResourceBuilder {
    host: Option<Arc<dyn HostClient>>,
    namespace: Option<String>,
    keys: Option<Arc<dyn KeyGenerator>>,
}

impl EncryptionKeyResourceBuilder {
    /// Host cluster client
    pub fn host_client(mut self, host: Arc<dyn HostClient>) -> Self {
        self.host = Some(host);
        self
    }

    /// Namespace of the Secret
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Key generator
    pub fn key_generator(mut self, keys: Arc<dyn KeyGenerator>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Build the resource; every collaborator is required
    pub fn build(self) -> Result<EncryptionKeyResource> {
        let host = self.host.ok_or_else(|| missing(NAME, "a host client"))?;
        let namespace = self
            .namespace
            .filter(|ns| !ns.is_empty())
            .ok_or_else(|| missing(NAME, "a namespace"))?;
        let keys = self.keys.ok_or_else(|| missing(NAME, "a key generator"))?;
        Ok(EncryptionKeyResource {
            host,
            namespace,
            keys,
        })
    }
}

#[async_trait]
impl CrudResource for EncryptionKeyResource {
    type State = Option<Secret>;

    fn name(&self) -> &str {
        NAME
    }

    async fn get_current_state(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<Option<Secret>> {
        let guest = cluster_guest_config(obj)?;
        let name = encryption_key_secret_name(&guest);
        found(self.host.get_secret(&self.namespace, &name).await)
    }

    async fn get_desired_state(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<Option<Secret>> {
        let guest = cluster_guest_config(obj)?;
        let key = STANDARD.encode(self.keys.generate());
        Ok(Some(Secret {
            metadata: ObjectMeta {
                name: Some(encryption_key_secret_name(&guest)),
                namespace: Some(self.namespace.clone()),
                labels: Some(cluster_labels(&guest)),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                ENCRYPTION_KEY_DATA.to_string(),
                ByteString(key.into_bytes()),
            )])),
            ..Default::default()
        }))
    }

    fn new_update_patch(
        &self,
        _obj: &ClusterObject,
        current: &Option<Secret>,
        desired: &Option<Secret>,
    ) -> Result<Patch<Option<Secret>>> {
        Ok(single_update_patch(current, desired, |_, _| false))
    }

    fn new_delete_patch(
        &self,
        _obj: &ClusterObject,
        current: &Option<Secret>,
        desired: &Option<Secret>,
    ) -> Result<Patch<Option<Secret>>> {
        Ok(single_delete_patch(current, desired))
    }

    async fn apply_create_change(
        &self,
        _ctx: &ReconcileContext,
        _obj: &ClusterObject,
        create: &Option<Secret>,
    ) -> Result<()> {
        let Some(secret) = create else {
            return Ok(());
        };
        let name = secret.name_any();
        info!(secret = %name, "creating encryption key secret");
        created(
            self.host.create_secret(&self.namespace, secret).await,
            "Secret",
            &name,
        )
    }

    async fn apply_update_change(
        &self,
        _ctx: &ReconcileContext,
        _obj: &ClusterObject,
        update: &Option<Secret>,
    ) -> Result<()> {
        match update {
            Some(secret) => self.host.update_secret(&self.namespace, secret).await,
            None => Ok(()),
        }
    }

    async fn apply_delete_change(
        &self,
        _ctx: &ReconcileContext,
        _obj: &ClusterObject,
        delete: &Option<Secret>,
    ) -> Result<()> {
        let Some(secret) = delete else {
            return Ok(());
        };
        let name = secret.name_any();
        info!(secret = %name, "deleting encryption key secret");
        deleted(
            self.host.delete_secret(&self.namespace, &name).await,
            "Secret",
            &name,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MockHostClient;
    use crate::resources::testing::{aws_object, context};
    use crate::wrapper::CrudResourceWrapper;
    use crate::{Resource, ResourceOutcome};
    use cluster_operator_common::error::api_error;
    use cluster_operator_common::Error;

    struct FixedKey;

    impl KeyGenerator for FixedKey {
        fn generate(&self) -> Vec<u8> {
            vec![7u8; KEY_LEN]
        }
    }

    fn resource(host: MockHostClient) -> EncryptionKeyResource {
        EncryptionKeyResource::builder()
            .host_client(Arc::new(host))
            .namespace("default")
            .key_generator(Arc::new(FixedKey))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_every_collaborator() {
        let no_host = EncryptionKeyResource::builder()
            .namespace("default")
            .key_generator(Arc::new(FixedKey))
            .build();
        assert!(matches!(no_host, Err(Error::InvalidConfig { .. })));

        let empty_namespace = EncryptionKeyResource::builder()
            .host_client(Arc::new(MockHostClient::new()))
            .namespace("")
            .key_generator(Arc::new(FixedKey))
            .build();
        assert!(matches!(empty_namespace, Err(Error::InvalidConfig { .. })));

        let no_keys = EncryptionKeyResource::builder()
            .host_client(Arc::new(MockHostClient::new()))
            .namespace("default")
            .build();
        assert!(matches!(no_keys, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn random_keys_have_the_right_length_and_differ() {
        let a = RandomKeyGenerator.generate();
        let b = RandomKeyGenerator.generate();
        assert_eq!(a.len(), KEY_LEN);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn missing_secret_is_empty_current_state() {
        let mut host = MockHostClient::new();
        host.expect_get_secret()
            .withf(|ns, name| ns == "default" && name == "al9qy-encryption")
            .returning(|_, _| Err(api_error(404, "NotFound", "secrets not found")));

        let state = resource(host)
            .get_current_state(&context(), &aws_object("al9qy"))
            .await
            .unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn host_errors_are_not_masked() {
        let mut host = MockHostClient::new();
        host.expect_get_secret()
            .returning(|_, _| Err(api_error(500, "InternalError", "etcd timeout")));

        let err = resource(host)
            .get_current_state(&context(), &aws_object("al9qy"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Kube { .. }));
    }

    #[tokio::test]
    async fn desired_secret_carries_encoded_key_and_labels() {
        let secret = resource(MockHostClient::new())
            .get_desired_state(&context(), &aws_object("al9qy"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(secret.name_any(), "al9qy-encryption");
        let data = secret.data.unwrap();
        let encoded = String::from_utf8(data[ENCRYPTION_KEY_DATA].0.clone()).unwrap();
        assert_eq!(STANDARD.decode(encoded).unwrap(), vec![7u8; KEY_LEN]);
        assert_eq!(
            secret.metadata.labels.unwrap()["giantswarm.io/cluster"],
            "al9qy"
        );
    }

    /// Story: an existing key is never rotated, whatever the desired key is
    #[tokio::test]
    async fn story_existing_key_is_never_replaced() {
        let r = resource(MockHostClient::new());
        let obj = aws_object("al9qy");
        let desired = r.get_desired_state(&context(), &obj).await.unwrap();
        let mut existing = desired.clone();
        if let Some(secret) = existing.as_mut() {
            secret.data = Some(BTreeMap::from([(
                ENCRYPTION_KEY_DATA.to_string(),
                ByteString(b"b2xkLWtleQ==".to_vec()),
            )]));
        }

        assert!(r.new_update_patch(&obj, &existing, &desired).unwrap().is_empty());
        assert!(r.new_update_patch(&obj, &desired, &desired).unwrap().is_empty());
        assert!(r.new_delete_patch(&obj, &None, &desired).unwrap().is_empty());
        assert_eq!(
            r.new_delete_patch(&obj, &existing, &desired).unwrap().delete,
            Some(existing)
        );
    }

    /// Story: creating twice against an existing secret succeeds
    #[tokio::test]
    async fn story_create_is_idempotent() {
        let mut host = MockHostClient::new();
        let mut seq = mockall::Sequence::new();
        host.expect_create_secret()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        host.expect_create_secret()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(api_error(409, "AlreadyExists", "secrets already exists")));

        let r = resource(host);
        let obj = aws_object("al9qy");
        let desired = r.get_desired_state(&context(), &obj).await.unwrap();
        r.apply_create_change(&context(), &obj, &desired).await.unwrap();
        r.apply_create_change(&context(), &obj, &desired).await.unwrap();
    }

    #[tokio::test]
    async fn wrapped_resource_creates_missing_secret_once() {
        let mut host = MockHostClient::new();
        host.expect_get_secret()
            .returning(|_, _| Err(api_error(404, "NotFound", "secrets not found")));
        host.expect_create_secret()
            .withf(|ns, secret| ns == "default" && secret.name_any() == "al9qy-encryption")
            .times(1)
            .returning(|_, _| Ok(()));
        host.expect_update_secret().never();

        let outcome = CrudResourceWrapper::new(resource(host))
            .ensure_created(&context(), &aws_object("al9qy"))
            .await
            .unwrap();
        assert_eq!(outcome, ResourceOutcome::Reconciled);
    }

    #[tokio::test]
    async fn delete_of_vanished_secret_succeeds() {
        let mut host = MockHostClient::new();
        host.expect_delete_secret()
            .returning(|_, _| Err(api_error(404, "NotFound", "secrets not found")));

        let r = resource(host);
        let obj = aws_object("al9qy");
        let desired = r.get_desired_state(&context(), &obj).await.unwrap();
        r.apply_delete_change(&context(), &obj, &desired).await.unwrap();
    }
}
