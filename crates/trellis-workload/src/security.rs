//! Pod-level security context

use crate::k8s::{self, Sysctl};

/// How fsGroup ownership is applied to mounted volumes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FsGroupChangePolicy {
    /// Change ownership on every mount
    #[default]
    Always,
    /// Change ownership only when the volume root doesn't match
    OnRootMismatch,
}

impl FsGroupChangePolicy {
    /// Wire value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "Always",
            Self::OnRootMismatch => "OnRootMismatch",
        }
    }
}

/// Security settings shared by every container in the pod
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PodSecurityContext {
    /// Require containers to run as a non-root user
    pub run_as_non_root: bool,
    /// Supplementary group applied to volumes
    pub fs_group: Option<i64>,
    /// fsGroup change policy
    pub fs_group_change_policy: FsGroupChangePolicy,
    /// UID for container processes
    pub run_as_user: Option<i64>,
    /// GID for container processes
    pub run_as_group: Option<i64>,
    /// Namespaced kernel parameters
    pub sysctls: Vec<(String, String)>,
}

impl PodSecurityContext {
    /// Require a non-root user
    pub fn with_run_as_non_root(mut self, enabled: bool) -> Self {
        self.run_as_non_root = enabled;
        self
    }

    /// Run as `uid`
    pub fn with_user(mut self, uid: i64) -> Self {
        self.run_as_user = Some(uid);
        self
    }

    /// Run with primary group `gid`
    pub fn with_group(mut self, gid: i64) -> Self {
        self.run_as_group = Some(gid);
        self
    }

    /// Volume group ownership
    pub fn with_fs_group(mut self, gid: i64, policy: FsGroupChangePolicy) -> Self {
        self.fs_group = Some(gid);
        self.fs_group_change_policy = policy;
        self
    }

    /// Add a sysctl
    pub fn add_sysctl(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.sysctls.push((name.into(), value.into()));
    }

    pub(crate) fn to_spec(&self) -> k8s::PodSecurityContext {
        k8s::PodSecurityContext {
            run_as_non_root: self.run_as_non_root,
            fs_group: self.fs_group,
            fs_group_change_policy: self.fs_group_change_policy.as_str().to_string(),
            run_as_user: self.run_as_user,
            run_as_group: self.run_as_group,
            sysctls: self
                .sysctls
                .iter()
                .map(|(name, value)| Sysctl {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_emitted_explicitly() {
        let json = serde_json::to_value(PodSecurityContext::default().to_spec()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "runAsNonRoot": false,
                "fsGroupChangePolicy": "Always",
                "sysctls": []
            })
        );
    }

    #[test]
    fn configured_context() {
        let mut ctx = PodSecurityContext::default()
            .with_run_as_non_root(true)
            .with_user(1000)
            .with_group(3000)
            .with_fs_group(2000, FsGroupChangePolicy::OnRootMismatch);
        ctx.add_sysctl("net.core.somaxconn", "1024");

        let spec = ctx.to_spec();
        assert!(spec.run_as_non_root);
        assert_eq!(spec.run_as_user, Some(1000));
        assert_eq!(spec.run_as_group, Some(3000));
        assert_eq!(spec.fs_group, Some(2000));
        assert_eq!(spec.fs_group_change_policy, "OnRootMismatch");
        assert_eq!(spec.sysctls[0].name, "net.core.somaxconn");
    }
}
