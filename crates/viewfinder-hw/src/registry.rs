//! OS imaging-device registry.
//!
//! The registry answers one question: which devices does the OS classify as
//! cameras, in which order? On Linux that is a sysfs scan. The capability
//! trait keeps the resolver's matching logic portable; platforms without the
//! service plug in [`NullRegistry`].

use serde::Serialize;
use std::path::{Path, PathBuf};

/// One OS-reported camera, a snapshot rebuilt on every enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagingDevice {
    pub name: String,
    pub device_id: String,
    /// Position in the OS enumeration.
    pub ordinal: usize,
}

/// Capability seam for the OS device query.
///
/// Implementations fail softly: when the underlying service is unreachable
/// they return an empty list, never an error.
pub trait DeviceRegistry {
    fn list_imaging_devices(&self) -> Vec<ImagingDevice>;
}

/// Registry for platforms without an imaging-device service.
pub struct NullRegistry;

impl DeviceRegistry for NullRegistry {
    fn list_imaging_devices(&self) -> Vec<ImagingDevice> {
        Vec::new()
    }
}

/// Linux registry backed by `/sys/class/video4linux`.
pub struct SysfsRegistry {
    root: PathBuf,
}

impl SysfsRegistry {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/sys/class/video4linux"),
        }
    }

    /// Scan an alternate tree (tests point this at a fixture directory).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for SysfsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry for SysfsRegistry {
    fn list_imaging_devices(&self) -> Vec<ImagingDevice> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(root = %self.root.display(), error = %err, "device registry unavailable");
                return Vec::new();
            }
        };

        let mut nodes: Vec<(u32, PathBuf)> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let node = e.file_name().to_string_lossy().into_owned();
                let num: u32 = node.strip_prefix("video")?.parse().ok()?;
                Some((num, e.path()))
            })
            .collect();
        nodes.sort_by_key(|(num, _)| *num);

        let mut devices = Vec::new();
        for (num, path) in nodes {
            let Some(name) = read_trimmed(&path.join("name")) else {
                continue;
            };
            let device_id = usb_device_id(&path).unwrap_or_else(|| format!("video{num}"));
            devices.push(ImagingDevice {
                name,
                device_id,
                ordinal: devices.len(),
            });
        }

        tracing::debug!(count = devices.len(), "sysfs registry scan");
        devices
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Resolve a video4linux node to its USB `vendor:product` pair.
///
/// The node's `device` entry links to the USB interface directory; the
/// parent of that holds `idVendor`/`idProduct`. Returns `None` for non-USB
/// devices or when sysfs does not cooperate.
fn usb_device_id(node: &Path) -> Option<String> {
    let interface_dir = std::fs::canonicalize(node.join("device")).ok()?;
    let usb_device_dir = interface_dir.parent()?;
    let vid = read_trimmed(&usb_device_dir.join("idVendor"))?;
    let pid = read_trimmed(&usb_device_dir.join("idProduct"))?;
    Some(format!("{vid}:{pid}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_node(root: &Path, node: &str, name: &str) {
        let dir = root.join(node);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("name"), format!("{name}\n")).unwrap();
    }

    #[test]
    fn test_missing_root_yields_empty() {
        let registry = SysfsRegistry::with_root("/nonexistent/viewfinder-test");
        assert!(registry.list_imaging_devices().is_empty());
    }

    #[test]
    fn test_null_registry_is_empty() {
        assert!(NullRegistry.list_imaging_devices().is_empty());
    }

    #[test]
    fn test_scan_orders_by_node_number() {
        let tmp = tempfile::tempdir().unwrap();
        write_node(tmp.path(), "video10", "Rear Camera");
        write_node(tmp.path(), "video2", "Front Camera");
        write_node(tmp.path(), "video0", "Integrated Webcam");

        let devices = SysfsRegistry::with_root(tmp.path()).list_imaging_devices();
        let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Integrated Webcam", "Front Camera", "Rear Camera"]);
        let ordinals: Vec<usize> = devices.iter().map(|d| d.ordinal).collect();
        assert_eq!(ordinals, [0, 1, 2]);
    }

    #[test]
    fn test_non_video_entries_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        write_node(tmp.path(), "video0", "Webcam");
        write_node(tmp.path(), "v4l-subdev0", "Sensor");
        std::fs::create_dir_all(tmp.path().join("videoX")).unwrap();

        let devices = SysfsRegistry::with_root(tmp.path()).list_imaging_devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "Webcam");
    }

    #[test]
    fn test_nameless_node_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("video0")).unwrap();
        write_node(tmp.path(), "video1", "Webcam");

        let devices = SysfsRegistry::with_root(tmp.path()).list_imaging_devices();
        assert_eq!(devices.len(), 1);
        // Ordinal tracks position among listed devices, not node numbers.
        assert_eq!(devices[0].ordinal, 0);
    }

    #[test]
    fn test_device_id_falls_back_to_node_name() {
        let tmp = tempfile::tempdir().unwrap();
        write_node(tmp.path(), "video3", "Webcam");

        let devices = SysfsRegistry::with_root(tmp.path()).list_imaging_devices();
        assert_eq!(devices[0].device_id, "video3");
    }

    #[test]
    fn test_usb_id_read_from_parent_dir() {
        let tmp = tempfile::tempdir().unwrap();
        // Fake USB topology: usb/iface under the device dir, node/device
        // symlinked to the interface directory.
        let usb = tmp.path().join("usb-dev");
        let iface = usb.join("1-2:1.0");
        std::fs::create_dir_all(&iface).unwrap();
        std::fs::write(usb.join("idVendor"), "04f2\n").unwrap();
        std::fs::write(usb.join("idProduct"), "b6d9\n").unwrap();

        write_node(tmp.path(), "video0", "IR Camera");
        #[cfg(unix)]
        std::os::unix::fs::symlink(&iface, tmp.path().join("video0/device")).unwrap();

        let devices = SysfsRegistry::with_root(tmp.path()).list_imaging_devices();
        #[cfg(unix)]
        assert_eq!(devices[0].device_id, "04f2:b6d9");
    }
}
