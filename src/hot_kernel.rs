use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::PixelateResult;
use crate::kernel::ComputeKernel;

/// A compute kernel loaded from a file and reloaded when the file changes.
///
/// A reload that fails to parse is logged and ignored; the last good kernel
/// stays current.
pub struct HotKernel {
    path: PathBuf,
    last_modified: SystemTime,
    kernel: ComputeKernel,
}

impl HotKernel {
    /// Load and parse the kernel at `path`.
    pub fn new(path: impl AsRef<Path>) -> PixelateResult<Self> {
        let path = path.as_ref().to_path_buf();
        let last_modified = fs::metadata(&path)?.modified()?;
        let kernel = ComputeKernel::from_file(&path)?;

        Ok(Self {
            path,
            last_modified,
            kernel,
        })
    }

    /// The current kernel.
    pub fn kernel(&self) -> &ComputeKernel {
        &self.kernel
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check the file and return the new kernel if it changed and parses.
    /// Call this once per frame.
    pub fn poll(&mut self) -> Option<ComputeKernel> {
        let modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok()?;
        if modified <= self.last_modified {
            return None;
        }
        self.last_modified = modified;

        log::info!("reloading kernel {}", self.path.display());
        match ComputeKernel::from_file(&self.path) {
            Ok(kernel) => {
                self.kernel = kernel.clone();
                Some(kernel)
            }
            Err(err) => {
                log::warn!("kernel reload failed, keeping previous version: {}", err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn temp_kernel(name: &str, source: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("pixelate-{}-{}.wgsl", name, std::process::id()));
        fs::write(&path, source).unwrap();
        path
    }

    fn touch_later(path: &Path, source: &str) {
        fs::write(path, source).unwrap();
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(10)).unwrap();
    }

    const RENAMED: &str = r#"
        @compute @workgroup_size(4, 4)
        fn Blocky(@builtin(global_invocation_id) id: vec3<u32>) {}
    "#;

    #[test]
    fn unchanged_file_yields_nothing() {
        let path = temp_kernel("unchanged", crate::kernel::PIXELATE_WGSL);
        let mut hot = HotKernel::new(&path).unwrap();
        assert!(hot.poll().is_none());
        assert!(hot.kernel().find_kernel("Pixelate").is_ok());
        fs::remove_file(path).ok();
    }

    #[test]
    fn modified_file_is_reparsed() {
        let path = temp_kernel("modified", crate::kernel::PIXELATE_WGSL);
        let mut hot = HotKernel::new(&path).unwrap();

        touch_later(&path, RENAMED);
        let reloaded = hot.poll().unwrap();
        assert_eq!(reloaded.find_kernel("Blocky").unwrap().workgroup_size(), [4, 4, 1]);
        assert!(hot.kernel().find_kernel("Pixelate").is_err());
        fs::remove_file(path).ok();
    }

    #[test]
    fn broken_edit_keeps_previous_kernel() {
        let path = temp_kernel("broken", crate::kernel::PIXELATE_WGSL);
        let mut hot = HotKernel::new(&path).unwrap();

        touch_later(&path, "fn oops( {");
        assert!(hot.poll().is_none());
        assert!(hot.kernel().find_kernel("Pixelate").is_ok());
        fs::remove_file(path).ok();
    }
}
