//! Mount binding between a container and a volume

use crate::k8s::VolumeMount;
use crate::volume::Volume;

/// Optional mount attributes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MountOptions {
    /// Path within the volume to mount instead of its root
    pub sub_path: Option<String>,
    /// Mount read-only
    pub read_only: Option<bool>,
}

impl MountOptions {
    /// Read-only mount of the volume root
    pub fn read_only() -> Self {
        Self {
            sub_path: None,
            read_only: Some(true),
        }
    }

    /// Mount a path within the volume
    pub fn with_sub_path(mut self, sub_path: impl Into<String>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }
}

/// A volume mounted into a container at a path
#[derive(Clone, Debug)]
pub struct Mount {
    path: String,
    volume: Volume,
    options: MountOptions,
}

impl Mount {
    /// Bind `volume` at `path`
    pub fn new(path: impl Into<String>, volume: &Volume, options: MountOptions) -> Self {
        Self {
            path: path.into(),
            volume: volume.clone(),
            options,
        }
    }

    /// Mount path inside the container
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Mounted volume
    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Mount attributes
    pub fn options(&self) -> &MountOptions {
        &self.options
    }

    pub(crate) fn to_spec(&self) -> VolumeMount {
        VolumeMount {
            name: self.volume.name().to_string(),
            mount_path: self.path.clone(),
            sub_path: self.options.sub_path.clone(),
            read_only: self.options.read_only,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_references_volume_by_name() {
        let vol = Volume::from_config_map("settings");
        let mount = Mount::new(
            "/etc/app",
            &vol,
            MountOptions::read_only().with_sub_path("app.yaml"),
        );

        let spec = mount.to_spec();
        assert_eq!(spec.name, "configmap-settings");
        assert_eq!(spec.mount_path, "/etc/app");
        assert_eq!(spec.sub_path.as_deref(), Some("app.yaml"));
        assert_eq!(spec.read_only, Some(true));
        assert!(mount.volume().same_as(&vol));
    }

    #[test]
    fn default_options_omit_optional_fields() {
        let mount = Mount::new("/data", &Volume::from_empty_dir("scratch"), MountOptions::default());
        let json = serde_json::to_value(mount.to_spec()).unwrap();
        assert_eq!(json, serde_json::json!({"name": "scratch", "mountPath": "/data"}));
    }
}
