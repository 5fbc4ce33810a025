//! Kubeconfig rendering for tenant cluster access

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use cluster_operator_common::{Error, Result};

use crate::certs::CertificateBundle;

/// User name the operator authenticates as in tenant clusters
pub const KUBECONFIG_USER: &str = "cluster-operator";

/// Kubeconfig document
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Kubeconfig {
    /// API version
    pub api_version: String,
    /// Kind (always "Config")
    pub kind: String,
    /// Clusters
    pub clusters: Vec<NamedCluster>,
    /// Users
    pub users: Vec<NamedUser>,
    /// Contexts
    pub contexts: Vec<NamedContext>,
    /// Current context
    pub current_context: String,
}

/// Cluster entry
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct NamedCluster {
    /// Cluster name
    pub name: String,
    /// Cluster config
    pub cluster: ClusterConfig,
}

/// Cluster endpoint and trust
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterConfig {
    /// API server URL
    pub server: String,
    /// CA certificate (base64 encoded PEM)
    pub certificate_authority_data: String,
}

/// User entry
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct NamedUser {
    /// User name
    pub name: String,
    /// User credentials
    pub user: UserConfig,
}

/// Client certificate credentials
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct UserConfig {
    /// Client certificate (base64 encoded PEM)
    pub client_certificate_data: String,
    /// Client key (base64 encoded PEM)
    pub client_key_data: String,
}

/// Context entry
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct NamedContext {
    /// Context name
    pub name: String,
    /// Context config
    pub context: ContextConfig,
}

/// Context configuration
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ContextConfig {
    /// Cluster name (reference)
    pub cluster: String,
    /// User name (reference)
    pub user: String,
}

/// Build a single-context kubeconfig for `cluster_id` served at `api_domain`
pub fn build_kubeconfig(cluster_id: &str, api_domain: &str, certs: &CertificateBundle) -> Kubeconfig {
    let context = format!("giantswarm-{}", cluster_id);
    Kubeconfig {
        api_version: "v1".into(),
        kind: "Config".into(),
        clusters: vec![NamedCluster {
            name: cluster_id.to_string(),
            cluster: ClusterConfig {
                server: format!("https://{}", api_domain),
                certificate_authority_data: STANDARD.encode(certs.ca.as_bytes()),
            },
        }],
        users: vec![NamedUser {
            name: KUBECONFIG_USER.to_string(),
            user: UserConfig {
                client_certificate_data: STANDARD.encode(certs.crt.as_bytes()),
                client_key_data: STANDARD.encode(certs.key.as_bytes()),
            },
        }],
        contexts: vec![NamedContext {
            name: context.clone(),
            context: ContextConfig {
                cluster: cluster_id.to_string(),
                user: KUBECONFIG_USER.to_string(),
            },
        }],
        current_context: context,
    }
}

/// Render the kubeconfig of [`build_kubeconfig`] as YAML
pub fn render_kubeconfig(
    cluster_id: &str,
    api_domain: &str,
    certs: &CertificateBundle,
) -> Result<String> {
    serde_yaml::to_string(&build_kubeconfig(cluster_id, api_domain, certs))
        .map_err(|e| Error::serialization_for_kind("Kubeconfig", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn certs() -> CertificateBundle {
        CertificateBundle {
            ca: "CA".into(),
            crt: "CRT".into(),
            key: "KEY".into(),
        }
    }

    #[test]
    fn kubeconfig_points_at_tenant_api() {
        let config = build_kubeconfig("al9qy", "api.al9qy.k8s.example.com", &certs());
        assert_eq!(config.current_context, "giantswarm-al9qy");
        assert_eq!(
            config.clusters[0].cluster.server,
            "https://api.al9qy.k8s.example.com"
        );
        assert_eq!(config.clusters[0].cluster.certificate_authority_data, "Q0E=");
        assert_eq!(config.users[0].user.client_key_data, "S0VZ");
        assert_eq!(config.contexts[0].context.user, KUBECONFIG_USER);
    }

    #[test]
    fn rendered_yaml_parses_back_and_is_stable() {
        let a = render_kubeconfig("al9qy", "api.al9qy.k8s.example.com", &certs()).unwrap();
        let b = render_kubeconfig("al9qy", "api.al9qy.k8s.example.com", &certs()).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("current-context: giantswarm-al9qy"));
        assert!(a.contains("client-certificate-data: Q1JU"));

        let parsed = kube::config::Kubeconfig::from_yaml(&a).unwrap();
        assert_eq!(parsed.current_context.as_deref(), Some("giantswarm-al9qy"));
    }
}
