//! Port naming and interface publication
//!
//! Straightforward glue: a process-wide serial-port counter for default
//! `COM{n}` names, and the publisher seam through which the core announces
//! its device interface and COM-port symbolic link. The COM symlink exists
//! exactly while the device is started and naming was not suppressed by
//! configuration.

use common::{Error, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

/// Process-wide count of attached serial ports, used for COM numbering
static ACTIVE_PORTS: AtomicU32 = AtomicU32::new(0);

/// Claim the next port number (1-based)
pub fn allocate_port_number() -> u32 {
    ACTIVE_PORTS.fetch_add(1, Ordering::SeqCst) + 1
}

/// Give a port number back at teardown
pub fn release_port_number() {
    ACTIVE_PORTS.fetch_sub(1, Ordering::SeqCst);
}

/// Current number of attached ports
pub fn active_port_count() -> u32 {
    ACTIVE_PORTS.load(Ordering::SeqCst)
}

/// Device-interface and symbolic-link publication sink
pub trait LinkPublisher: Send + Sync {
    /// Register a device interface; returns the interface link name
    fn register_interface(&self, device_name: &str) -> Result<String>;

    /// Enable or disable a registered interface
    fn set_interface_state(&self, link: &str, enabled: bool) -> Result<()>;

    /// Publish the COM-port symbolic link
    fn create_symbolic_link(&self, link: &str, target: &str) -> Result<()>;

    /// Remove the COM-port symbolic link
    fn delete_symbolic_link(&self, link: &str) -> Result<()>;
}

/// Filesystem-backed publisher: interfaces are marker files, COM links are
/// symlinks under one base directory
#[derive(Debug)]
pub struct FsLinkPublisher {
    base: PathBuf,
}

impl FsLinkPublisher {
    pub fn new(base: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base)?;
        Ok(FsLinkPublisher { base })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.base.join(name)
    }
}

impl LinkPublisher for FsLinkPublisher {
    fn register_interface(&self, device_name: &str) -> Result<String> {
        let link = format!("{device_name}.iface");
        debug!("Registered interface {}", link);
        Ok(link)
    }

    fn set_interface_state(&self, link: &str, enabled: bool) -> Result<()> {
        let path = self.path_for(link);
        if enabled {
            fs::write(&path, b"enabled")?;
        } else if path.exists() {
            fs::remove_file(&path)?;
        }
        debug!("Interface {} -> {}", link, if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    fn create_symbolic_link(&self, link: &str, target: &str) -> Result<()> {
        let path = self.path_for(link);
        if path.exists() {
            return Err(Error::Config(format!("link {link} already exists")));
        }
        #[cfg(unix)]
        std::os::unix::fs::symlink(target, &path)?;
        #[cfg(not(unix))]
        fs::write(&path, target)?;
        debug!("Created symbolic link {} -> {}", link, target);
        Ok(())
    }

    fn delete_symbolic_link(&self, link: &str) -> Result<()> {
        let path = self.path_for(link);
        if path.exists() || path.symlink_metadata().is_ok() {
            fs::remove_file(&path)?;
        }
        debug!("Deleted symbolic link {}", link);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_numbers_allocate_and_release() {
        let before = active_port_count();
        let n = allocate_port_number();
        assert!(n >= 1);
        assert_eq!(active_port_count(), before + 1);
        release_port_number();
        assert_eq!(active_port_count(), before);
    }

    #[test]
    fn test_fs_publisher_symlink_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = FsLinkPublisher::new(dir.path().to_path_buf()).unwrap();

        publisher.create_symbolic_link("COM9", "/dev/null").unwrap();
        assert!(dir.path().join("COM9").symlink_metadata().is_ok());

        publisher.delete_symbolic_link("COM9").unwrap();
        assert!(dir.path().join("COM9").symlink_metadata().is_err());
        // Deleting an absent link is fine.
        publisher.delete_symbolic_link("COM9").unwrap();
    }

    #[test]
    fn test_fs_publisher_interface_state() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = FsLinkPublisher::new(dir.path().to_path_buf()).unwrap();

        let link = publisher.register_interface("pl2303-1").unwrap();
        publisher.set_interface_state(&link, true).unwrap();
        assert!(dir.path().join(&link).exists());
        publisher.set_interface_state(&link, false).unwrap();
        assert!(!dir.path().join(&link).exists());
    }
}
