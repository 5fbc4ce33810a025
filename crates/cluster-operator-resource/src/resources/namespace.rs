//! Managed namespace inside the tenant cluster
//!
//! Only ever created. Deleting the tenant cluster deletes the namespace with
//! it, so the delete path is an explicit no-op.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use tracing::info;

use cluster_operator_common::key::{cluster_guest_config, cluster_labels, ClusterObject};
use cluster_operator_common::Result;

use crate::diff::single_update_patch;
use crate::resource::{CrudResource, Patch, ReconcileContext};
use crate::resources::{created, found, missing};
use crate::tenant::TenantClusterFactory;
use crate::TENANT_NAMESPACE;

/// Resource name
pub const NAME: &str = "namespace";

/// Manages the operator namespace of a tenant cluster
pub struct NamespaceResource {
    tenants: Arc<dyn TenantClusterFactory>,
}

impl NamespaceResource {
    /// Start building the resource
    pub fn builder() -> NamespaceResourceBuilder {
        NamespaceResourceBuilder::default()
    }
}

/// Builder for [`NamespaceResource`]
#[derive(Default)]
pub struct NamespaceResourceBuilder {
    tenants: Option<Arc<dyn TenantClusterFactory>>,
}

impl NamespaceResourceBuilder {
    /// Tenant client factory
    pub fn tenant_factory(mut self, tenants: Arc<dyn TenantClusterFactory>) -> Self {
        self.tenants = Some(tenants);
        self
    }

    /// Build the resource
    pub fn build(self) -> Result<NamespaceResource> {
        let tenants = self
            .tenants
            .ok_or_else(|| missing(NAME, "a tenant cluster factory"))?;
        Ok(NamespaceResource { tenants })
    }
}

#[async_trait]
impl CrudResource for NamespaceResource {
    type State = Option<Namespace>;

    fn name(&self) -> &str {
        NAME
    }

    async fn get_current_state(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<Option<Namespace>> {
        if obj.is_deleting() {
            return Ok(None);
        }
        let guest = cluster_guest_config(obj)?;
        let tenant = self.tenants.tenant_client(&guest).await?;
        found(tenant.get_namespace(TENANT_NAMESPACE).await)
    }

    async fn get_desired_state(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
    ) -> Result<Option<Namespace>> {
        let guest = cluster_guest_config(obj)?;
        Ok(Some(Namespace {
            metadata: ObjectMeta {
                name: Some(TENANT_NAMESPACE.to_string()),
                labels: Some(cluster_labels(&guest)),
                ..Default::default()
            },
            ..Default::default()
        }))
    }

    fn new_update_patch(
        &self,
        _obj: &ClusterObject,
        current: &Option<Namespace>,
        desired: &Option<Namespace>,
    ) -> Result<Patch<Option<Namespace>>> {
        Ok(single_update_patch(current, desired, |_, _| false))
    }

    fn new_delete_patch(
        &self,
        _obj: &ClusterObject,
        _current: &Option<Namespace>,
        _desired: &Option<Namespace>,
    ) -> Result<Patch<Option<Namespace>>> {
        Ok(Patch::empty())
    }

    async fn apply_create_change(
        &self,
        _ctx: &ReconcileContext,
        obj: &ClusterObject,
        create: &Option<Namespace>,
    ) -> Result<()> {
        let Some(namespace) = create else {
            return Ok(());
        };
        let guest = cluster_guest_config(obj)?;
        let tenant = self.tenants.tenant_client(&guest).await?;
        let name = namespace.name_any();
        info!(cluster = %guest.id, namespace = %name, "creating tenant namespace");
        created(tenant.create_namespace(namespace).await, "Namespace", &name)
    }

    async fn apply_update_change(
        &self,
        _ctx: &ReconcileContext,
        _obj: &ClusterObject,
        _update: &Option<Namespace>,
    ) -> Result<()> {
        Ok(())
    }

    async fn apply_delete_change(
        &self,
        _ctx: &ReconcileContext,
        _obj: &ClusterObject,
        _delete: &Option<Namespace>,
    ) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MockTenantClient, TenantClient};
    use crate::resources::testing::{aws_object, context, deleting};
    use crate::tenant::MockTenantClusterFactory;
    use crate::wrapper::CrudResourceWrapper;
    use crate::{Resource, ResourceOutcome};
    use cluster_operator_common::error::api_error;
    use cluster_operator_common::Error;

    fn factory(tenant: MockTenantClient) -> Arc<dyn TenantClusterFactory> {
        let tenant: Arc<dyn TenantClient> = Arc::new(tenant);
        let mut factory = MockTenantClusterFactory::new();
        factory
            .expect_tenant_client()
            .returning(move |_| Ok(tenant.clone()));
        Arc::new(factory)
    }

    fn resource(factory: Arc<dyn TenantClusterFactory>) -> NamespaceResource {
        NamespaceResource::builder()
            .tenant_factory(factory)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_tenant_factory() {
        assert!(matches!(
            NamespaceResource::builder().build(),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn creates_missing_namespace_and_tolerates_races() {
        let mut tenant = MockTenantClient::new();
        tenant
            .expect_get_namespace()
            .returning(|_| Err(api_error(404, "NotFound", "namespaces not found")));
        tenant
            .expect_create_namespace()
            .withf(|ns| ns.name_any() == TENANT_NAMESPACE)
            .times(2)
            .returning(|_| Err(api_error(409, "AlreadyExists", "namespaces already exists")));

        let wrapper = CrudResourceWrapper::new(resource(factory(tenant)));
        for _ in 0..2 {
            let outcome = wrapper
                .ensure_created(&context(), &aws_object("al9qy"))
                .await
                .unwrap();
            assert_eq!(outcome, ResourceOutcome::Reconciled);
        }
    }

    #[tokio::test]
    async fn existing_namespace_is_left_alone() {
        let mut tenant = MockTenantClient::new();
        tenant.expect_get_namespace().returning(|name| {
            Ok(Namespace {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    ..Default::default()
                },
                ..Default::default()
            })
        });
        tenant.expect_create_namespace().never();

        let outcome = CrudResourceWrapper::new(resource(factory(tenant)))
            .ensure_created(&context(), &aws_object("al9qy"))
            .await
            .unwrap();
        assert_eq!(outcome, ResourceOutcome::Reconciled);
    }

    #[tokio::test]
    async fn unreachable_tenant_cancels_the_resource() {
        let mut factory = MockTenantClusterFactory::new();
        factory
            .expect_tenant_client()
            .returning(|guest| Err(Error::tenant_unavailable(&guest.id, "connection refused")));

        let outcome = CrudResourceWrapper::new(resource(Arc::new(factory)))
            .ensure_created(&context(), &aws_object("al9qy"))
            .await
            .unwrap();
        assert!(matches!(outcome, ResourceOutcome::Canceled { .. }));
    }

    #[tokio::test]
    async fn deletion_is_a_no_op_without_tenant_access() {
        let mut factory = MockTenantClusterFactory::new();
        factory.expect_tenant_client().never();

        let outcome = CrudResourceWrapper::new(resource(Arc::new(factory)))
            .ensure_deleted(&context(), &deleting(&aws_object("al9qy")))
            .await
            .unwrap();
        assert_eq!(outcome, ResourceOutcome::Reconciled);
    }
}
